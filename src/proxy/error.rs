//! Stream proxy error taxonomy and its client-facing rendering.

use std::error::Error as StdError;
use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::resilience::Elapsed;

/// Fixed `error` field of the JSON body sent when no stream can be served.
pub const STREAM_UNAVAILABLE: &str = "Stream temporarily unavailable";

/// Failures that happen before any byte is relayed to the client.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// DNS, refused connection, reset during dial.
    #[error("upstream connection failed: {0}")]
    Connect(String),

    /// No headers or first chunk within the deadline.
    #[error("upstream did not respond within {} ms", .0.as_millis())]
    Timeout(Duration),

    /// Handshake or certificate failure.
    #[error("upstream TLS handshake failed: {0}")]
    Tls(String),

    /// Upstream answered with a non-2xx status before streaming.
    #[error("upstream returned status {0}")]
    UpstreamStatus(StatusCode),

    /// Body failed before its first chunk.
    #[error("upstream body failed before the first byte: {0}")]
    UpstreamBody(String),

    /// Any other client-side request failure.
    #[error("upstream request failed: {0}")]
    Request(String),

    /// The relay semaphore is exhausted.
    #[error("listener capacity reached")]
    CapacityReached,

    /// The dedicated upstream client only dials the configured host.
    #[error("refusing to dial '{0}': not the configured upstream host")]
    ForeignHost(String),
}

impl ProxyError {
    /// Classify a `reqwest` failure that happened while sending the request.
    pub fn from_send(err: reqwest::Error, connect_timeout: Duration) -> Self {
        let detail = error_chain(&err);
        if err.is_timeout() {
            ProxyError::Timeout(connect_timeout)
        } else if looks_like_tls(&detail) {
            ProxyError::Tls(detail)
        } else if err.is_connect() {
            ProxyError::Connect(detail)
        } else {
            ProxyError::Request(detail)
        }
    }

    /// Whether redialing the same URL could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProxyError::Connect(_)
            | ProxyError::Timeout(_)
            | ProxyError::Tls(_)
            | ProxyError::UpstreamBody(_)
            | ProxyError::Request(_) => true,
            ProxyError::UpstreamStatus(status) => status.is_server_error(),
            ProxyError::CapacityReached | ProxyError::ForeignHost(_) => false,
        }
    }

    /// HTTP status returned to the client.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::CapacityReached => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::BAD_GATEWAY,
        }
    }

    /// Label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::Connect(_) => "connect",
            ProxyError::Timeout(_) => "timeout",
            ProxyError::Tls(_) => "tls",
            ProxyError::UpstreamStatus(_) => "status",
            ProxyError::UpstreamBody(_) => "body",
            ProxyError::Request(_) => "request",
            ProxyError::CapacityReached => "capacity",
            ProxyError::ForeignHost(_) => "foreign_host",
        }
    }
}

impl From<Elapsed> for ProxyError {
    fn from(elapsed: Elapsed) -> Self {
        ProxyError::Timeout(elapsed.0)
    }
}

/// JSON body of a stream failure response.
#[derive(Debug, Serialize)]
pub struct StreamErrorBody {
    pub error: &'static str,
    pub message: String,
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let body = StreamErrorBody {
            error: STREAM_UNAVAILABLE,
            message: self.to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

/// Flatten an error and its sources into one line.
fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !out.contains(&text) {
            out.push_str(": ");
            out.push_str(&text);
        }
        source = cause.source();
    }
    out
}

fn looks_like_tls(detail: &str) -> bool {
    let lower = detail.to_ascii_lowercase();
    ["certificate", "tls", "ssl", "handshake"]
        .iter()
        .any(|needle| lower.contains(needle))
}
