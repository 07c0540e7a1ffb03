//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate URLs, path prefixes and value ranges
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::AppConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid URL '{value}': {reason}")]
    InvalidUrl {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("{field}: path prefix '{value}' must start with '/' and must not end with '/'")]
    InvalidPrefix { field: &'static str, value: String },

    #[error("{field}: must be greater than zero")]
    Zero { field: &'static str },

    #[error("stream_proxy.allowed_origins: '{0}' is not a scheme://host[:port] origin")]
    InvalidOrigin(String),

    #[error("listener: '{0}' is not a valid bind address")]
    InvalidBindAddress(String),
}

/// Validate the whole configuration, collecting every error.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let bind = config.listener.bind_address();
    if bind.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(bind));
    }

    let proxy = &config.stream_proxy;
    check_http_url("stream_proxy.upstream_url", &proxy.upstream_url, &mut errors);
    check_prefix("stream_proxy.inbound_prefix", &proxy.inbound_prefix, &mut errors);
    check_prefix("stream_proxy.upstream_prefix", &proxy.upstream_prefix, &mut errors);
    check_positive("stream_proxy.connect_timeout_ms", proxy.connect_timeout_ms, &mut errors);
    check_positive("stream_proxy.response_timeout_ms", proxy.response_timeout_ms, &mut errors);
    check_positive("stream_proxy.max_streams", proxy.max_streams as u64, &mut errors);
    for origin in &proxy.allowed_origins {
        if !is_origin(origin) {
            errors.push(ValidationError::InvalidOrigin(origin.clone()));
        }
    }

    let edge = &config.edge_renderer;
    check_http_url("edge_renderer.content_api_url", &edge.content_api_url, &mut errors);
    check_http_url("edge_renderer.site.base_url", &edge.site.base_url, &mut errors);
    check_prefix("edge_renderer.article_prefix", &edge.article_prefix, &mut errors);
    check_positive("edge_renderer.metadata_timeout_ms", edge.metadata_timeout_ms, &mut errors);
    check_positive("edge_renderer.request_timeout_secs", edge.request_timeout_secs, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_http_url(field: &'static str, value: &str, errors: &mut Vec<ValidationError>) {
    let reason = match Url::parse(value) {
        Ok(url) if !matches!(url.scheme(), "http" | "https") => "scheme must be http or https".to_string(),
        Ok(url) if url.host_str().is_none() => "missing host".to_string(),
        Ok(_) => return,
        Err(e) => e.to_string(),
    };
    errors.push(ValidationError::InvalidUrl {
        field,
        value: value.to_string(),
        reason,
    });
}

fn check_prefix(field: &'static str, value: &str, errors: &mut Vec<ValidationError>) {
    if !value.starts_with('/') || (value.len() > 1 && value.ends_with('/')) {
        errors.push(ValidationError::InvalidPrefix {
            field,
            value: value.to_string(),
        });
    }
}

fn check_positive(field: &'static str, value: u64, errors: &mut Vec<ValidationError>) {
    if value == 0 {
        errors.push(ValidationError::Zero { field });
    }
}

/// An origin is exactly what a browser sends in the `Origin` header.
fn is_origin(value: &str) -> bool {
    match Url::parse(value) {
        Ok(url) => {
            matches!(url.scheme(), "http" | "https")
                && url.host_str().is_some()
                && url.path() == "/"
                && !value.ends_with('/')
                && url.query().is_none()
        }
        Err(_) => false,
    }
}
