//! Article metadata lookup against the content API.
//!
//! # Responsibilities
//! - Query `<content-api>/articles?filter[slug]=<slug>` under a deadline
//! - Normalise the record into `ArticleMetadata`
//! - Treat every failure as "no metadata" for the caller
//!
//! # Design Decisions
//! - This client always verifies certificates; it shares nothing with the
//!   stream proxy's upstream client
//! - Lookups are logged at warn level when they fail; the page still renders

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::config::EdgeRendererConfig;
use crate::observability::metrics;
use crate::render::cache::MetadataCache;
use crate::render::escape::{strip_markup, truncate_chars};
use crate::resilience::{with_deadline, Elapsed};

/// Longest description emitted in meta tags, in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 160;

/// Per-article values used to build head tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleMetadata {
    pub slug: String,
    pub title: String,
    /// Plain-text excerpt, already stripped and truncated.
    pub excerpt: Option<String>,
    /// Site-relative path, e.g. `/noticias/<slug>`.
    pub canonical_path: String,
    pub published_at: Option<String>,
    pub modified_at: Option<String>,
    /// Absolute image URL.
    pub image_url: Option<String>,
    pub author_name: Option<String>,
    pub section_name: Option<String>,
}

/// Errors from a single metadata lookup.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("content API request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("content API did not answer within {0:?}")]
    Timeout(Duration),

    #[error("content API returned {0}")]
    Status(StatusCode),

    #[error("content API returned malformed JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<Elapsed> for MetadataError {
    fn from(e: Elapsed) -> Self {
        MetadataError::Timeout(e.0)
    }
}

#[derive(Debug, Deserialize)]
struct ArticlesEnvelope {
    #[serde(default)]
    data: Option<Vec<ArticleRecord>>,
}

#[derive(Debug, Deserialize)]
struct ArticleRecord {
    title: Option<String>,
    excerpt: Option<String>,
    /// Usually a date string; other shapes are ignored.
    published: Option<serde_json::Value>,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
    updated_at: Option<String>,
    #[serde(rename = "updatedAt")]
    updated_at_camel: Option<String>,
    featured_image: Option<Media>,
    categoria: Option<Named>,
    author: Option<Named>,
}

#[derive(Debug, Deserialize)]
struct Media {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Named {
    name: Option<String>,
}

/// Client for the content API's article collection.
#[derive(Clone)]
pub struct MetadataClient {
    http: reqwest::Client,
    articles_url: Url,
    api_origin: Url,
    article_prefix: String,
    timeout: Duration,
    cache: MetadataCache,
}

impl MetadataClient {
    pub fn new(config: &EdgeRendererConfig) -> Result<Self, MetadataSetupError> {
        let base = config.content_api_url.trim_end_matches('/');
        let articles_url = Url::parse(&format!("{}/articles", base)).map_err(|source| {
            MetadataSetupError::InvalidUrl {
                url: config.content_api_url.clone(),
                source,
            }
        })?;
        let mut api_origin = articles_url.clone();
        api_origin.set_path("/");
        api_origin.set_query(None);

        let http = reqwest::Client::builder()
            .user_agent(concat!("radio-edge-renderer/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            articles_url,
            api_origin,
            article_prefix: config.article_prefix.trim_end_matches('/').to_string(),
            timeout: Duration::from_millis(config.metadata_timeout_ms),
            cache: MetadataCache::new(config.metadata_cache_ttl_secs),
        })
    }

    /// Metadata for `slug`, or `None` when it is unknown or unavailable.
    pub async fn lookup(&self, slug: &str) -> Option<Arc<ArticleMetadata>> {
        if let Some(cached) = self.cache.get(slug) {
            metrics::record_metadata_lookup("cached");
            return Some(cached);
        }

        match self.fetch(slug).await {
            Ok(Some(metadata)) => {
                metrics::record_metadata_lookup("found");
                let metadata = Arc::new(metadata);
                self.cache.insert(slug, metadata.clone());
                Some(metadata)
            }
            Ok(None) => {
                metrics::record_metadata_lookup("not_found");
                tracing::warn!(slug = %slug, "No article for slug; serving default document");
                None
            }
            Err(e) => {
                metrics::record_metadata_lookup("error");
                tracing::warn!(slug = %slug, error = %e, "Metadata lookup failed; serving default document");
                None
            }
        }
    }

    /// One request to the content API, bounded by the metadata timeout.
    pub async fn fetch(&self, slug: &str) -> Result<Option<ArticleMetadata>, MetadataError> {
        let request = self
            .http
            .get(self.articles_url.clone())
            .query(&[("filter[slug]", slug)]);

        let body = with_deadline(self.timeout, async {
            let response = request.send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(MetadataError::Status(status));
            }
            Ok(response.bytes().await?)
        })
        .await?;

        let envelope: ArticlesEnvelope = serde_json::from_slice(&body)?;
        let record = envelope.data.and_then(|records| records.into_iter().next());
        Ok(record.and_then(|record| self.normalise(slug, record)))
    }

    fn normalise(&self, slug: &str, record: ArticleRecord) -> Option<ArticleMetadata> {
        let title = record.title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())?;

        let excerpt = record
            .excerpt
            .map(|e| strip_markup(&e))
            .filter(|e| !e.is_empty())
            .map(|e| truncate_chars(&e, MAX_DESCRIPTION_CHARS).into_owned());

        let published_at = match record.published {
            Some(serde_json::Value::String(s)) => Some(s),
            _ => record.published_at,
        };

        Some(ArticleMetadata {
            slug: slug.to_string(),
            title,
            excerpt,
            canonical_path: format!("{}/{}", self.article_prefix, slug),
            published_at,
            modified_at: record.updated_at.or(record.updated_at_camel),
            image_url: record
                .featured_image
                .and_then(|m| m.url)
                .and_then(|url| self.resolve_image(&url)),
            author_name: record.author.and_then(|a| a.name),
            section_name: record.categoria.and_then(|c| c.name),
        })
    }

    /// Absolute URLs pass through; relative ones resolve against the API origin.
    fn resolve_image(&self, url: &str) -> Option<String> {
        let url = url.trim();
        if url.is_empty() {
            return None;
        }
        match Url::parse(url) {
            Ok(absolute) => Some(absolute.to_string()),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                self.api_origin.join(url).ok().map(|u| u.to_string())
            }
            Err(_) => None,
        }
    }
}

/// Errors raised while building the metadata client.
#[derive(Debug, Error)]
pub enum MetadataSetupError {
    #[error("invalid content API URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to build content API client: {0}")]
    Client(#[from] reqwest::Error),
}
