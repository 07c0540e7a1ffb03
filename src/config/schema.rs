//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for both
//! services. All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration shared by the stream proxy and the edge renderer.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Stream proxy settings.
    pub stream_proxy: StreamProxyConfig,

    /// Edge renderer settings.
    pub edge_renderer: EdgeRendererConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Lifecycle settings.
    pub lifecycle: LifecycleConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Host to bind (e.g., "0.0.0.0").
    pub host: String,

    /// Port to bind.
    pub port: u16,
}

impl ListenerConfig {
    /// `host:port` string suitable for `TcpListener::bind`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
        }
    }
}

/// Stream proxy configuration. Becomes an immutable `ProxyTarget` at startup.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StreamProxyConfig {
    /// Upstream broadcast origin (scheme + host + optional port).
    pub upstream_url: String,

    /// Inbound path prefix handled by the proxy.
    pub inbound_prefix: String,

    /// Upstream path segment substituted for the inbound prefix.
    pub upstream_prefix: String,

    /// User-Agent sent to the upstream instead of the client's.
    pub user_agent: String,

    /// Origins allowed to read the stream cross-origin.
    pub allowed_origins: Vec<String>,

    /// Connection establishment timeout in milliseconds.
    pub connect_timeout_ms: u64,

    /// Deadline for response headers and the first body chunk, in milliseconds.
    pub response_timeout_ms: u64,

    /// Accept invalid certificates from the upstream host (and only that host).
    pub accept_invalid_upstream_certs: bool,

    /// Maximum concurrent relayed streams.
    pub max_streams: usize,

    /// Retry configuration for upstream dialing.
    pub retries: RetryConfig,
}

impl Default for StreamProxyConfig {
    fn default() -> Self {
        Self {
            upstream_url: "https://stream.tocastereo.com".to_string(),
            inbound_prefix: "/stream".to_string(),
            upstream_prefix: "/proxy/tocaestereo/stream".to_string(),
            user_agent: format!("radio-edge-stream-proxy/{}", env!("CARGO_PKG_VERSION")),
            allowed_origins: vec![
                "https://tocastereo.com".to_string(),
                "https://www.tocastereo.com".to_string(),
                "http://localhost:3000".to_string(),
            ],
            connect_timeout_ms: 10_000,
            response_timeout_ms: 10_000,
            accept_invalid_upstream_certs: true,
            max_streams: 1000,
            retries: RetryConfig::default(),
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first failed attempt.
    pub max_retries: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 250,
            max_delay_ms: 1000,
        }
    }
}

/// Edge renderer configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EdgeRendererConfig {
    /// Directory holding the compiled single-page application.
    pub static_dir: String,

    /// Template file name inside `static_dir`.
    pub template_file: String,

    /// Keep the template in memory instead of reading it per request.
    pub cache_template: bool,

    /// Reload the cached template when the file changes on disk.
    pub watch_template: bool,

    /// Base URL of the content API (e.g. "https://cms.example.com/api").
    pub content_api_url: String,

    /// Upper bound for a metadata lookup in milliseconds.
    pub metadata_timeout_ms: u64,

    /// TTL for cached article metadata; 0 disables the cache.
    pub metadata_cache_ttl_secs: u64,

    /// Path prefix of article detail pages.
    pub article_prefix: String,

    /// Whole-request timeout for document requests in seconds.
    pub request_timeout_secs: u64,

    /// Site-level values used when composing tags.
    pub site: SiteConfig,
}

impl Default for EdgeRendererConfig {
    fn default() -> Self {
        Self {
            static_dir: "build".to_string(),
            template_file: "index.html".to_string(),
            cache_template: true,
            watch_template: true,
            content_api_url: "http://localhost:1337/api".to_string(),
            metadata_timeout_ms: 3000,
            metadata_cache_ttl_secs: 0,
            article_prefix: "/noticias".to_string(),
            request_timeout_secs: 15,
            site: SiteConfig::default(),
        }
    }
}

/// Site-wide values for SEO and social tags.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Human readable site name.
    pub name: String,

    /// Public base URL used for canonical and OG URLs.
    pub base_url: String,

    /// Fallback description when an article has no excerpt.
    pub default_description: String,

    /// Fallback share image.
    pub default_image: String,

    /// Twitter handle including the `@`.
    pub twitter_handle: Option<String>,

    /// Open Graph locale.
    pub locale: String,

    /// Publisher logo for structured data.
    pub publisher_logo: Option<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: "Toca Stereo".to_string(),
            base_url: "https://tocastereo.com".to_string(),
            default_description: "Noticias, música y radio en vivo.".to_string(),
            default_image: "https://tocastereo.com/logo512.png".to_string(),
            twitter_handle: None,
            locale: "es_ES".to_string(),
            publisher_logo: Some("https://tocastereo.com/logo192.png".to_string()),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "radio_edge=info,tower_http=info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Lifecycle configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Seconds to wait for in-flight requests after a shutdown signal.
    /// Live streams never finish on their own, so this is a hard deadline.
    pub shutdown_grace_secs: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            shutdown_grace_secs: 10,
        }
    }
}
