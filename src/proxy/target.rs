//! Immutable description of the upstream the proxy relays from.
//!
//! Built once at startup from `StreamProxyConfig` and shared via `Arc`.

use std::time::Duration;

use axum::http::{
    header::{ACCEPT, CONNECTION, USER_AGENT},
    HeaderMap, HeaderValue,
};
use thiserror::Error;
use url::Url;

use crate::config::StreamProxyConfig;
use crate::resilience::RetryPolicy;
use crate::routing::PathRewrite;

/// Certificate trust for the upstream connection.
///
/// Relaxed trust is bound to a single host; it never applies to other
/// outbound calls made by the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrustPolicy {
    /// Standard certificate verification.
    Verified,
    /// Accept invalid or self-signed certificates from `host` only.
    AcceptInvalidCerts { host: String },
}

/// Errors raised while building the proxy target.
#[derive(Debug, Error)]
pub enum TargetError {
    #[error("invalid upstream URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("upstream URL '{0}' has no host")]
    MissingHost(String),

    #[error("invalid outbound header value: {0}")]
    InvalidHeader(String),

    #[error("failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),
}

/// The upstream origin, path rewrite, outbound headers and dial limits.
#[derive(Debug, Clone)]
pub struct ProxyTarget {
    upstream: Url,
    host: String,
    rewrite: PathRewrite,
    outbound_headers: HeaderMap,
    connect_timeout: Duration,
    response_timeout: Duration,
    retry: RetryPolicy,
    trust: TrustPolicy,
}

impl ProxyTarget {
    pub fn from_config(config: &StreamProxyConfig) -> Result<Self, TargetError> {
        let upstream = Url::parse(&config.upstream_url).map_err(|source| TargetError::InvalidUrl {
            url: config.upstream_url.clone(),
            source,
        })?;
        let host = upstream
            .host_str()
            .ok_or_else(|| TargetError::MissingHost(config.upstream_url.clone()))?
            .to_string();

        let mut outbound_headers = HeaderMap::new();
        let user_agent = HeaderValue::from_str(&config.user_agent)
            .map_err(|_| TargetError::InvalidHeader(config.user_agent.clone()))?;
        outbound_headers.insert(USER_AGENT, user_agent);
        outbound_headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        outbound_headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));

        let trust = if config.accept_invalid_upstream_certs {
            TrustPolicy::AcceptInvalidCerts { host: host.clone() }
        } else {
            TrustPolicy::Verified
        };

        Ok(Self {
            upstream,
            host,
            rewrite: PathRewrite::new(&config.inbound_prefix, &config.upstream_prefix),
            outbound_headers,
            connect_timeout: Duration::from_millis(config.connect_timeout_ms),
            response_timeout: Duration::from_millis(config.response_timeout_ms),
            retry: RetryPolicy::from(&config.retries),
            trust,
        })
    }

    /// Full upstream URL for an inbound path, `None` outside the prefix.
    ///
    /// A rewritten path that would resolve to another origin (e.g. `//host`)
    /// or outside the upstream segment is rejected as well.
    pub fn upstream_url(&self, path: &str, query: Option<&str>) -> Option<Url> {
        let rewritten = self.rewrite.apply(path, query)?;
        let prefix = self.rewrite.upstream_prefix();
        self.upstream.join(&rewritten).ok().filter(|url| {
            url.origin() == self.upstream.origin()
                && (prefix.is_empty()
                    || url
                        .path()
                        .strip_prefix(prefix)
                        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/')))
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn rewrite(&self) -> &PathRewrite {
        &self.rewrite
    }

    pub fn outbound_headers(&self) -> &HeaderMap {
        &self.outbound_headers
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Deadline for response headers plus the first body chunk.
    pub fn response_timeout(&self) -> Duration {
        self.response_timeout
    }

    pub fn retry(&self) -> RetryPolicy {
        self.retry
    }

    pub fn trust(&self) -> &TrustPolicy {
        &self.trust
    }
}
