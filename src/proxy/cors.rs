//! CORS allow-list enforcement for the stream endpoint.
//!
//! # Responsibilities
//! - Answer preflight requests without touching the upstream
//! - Reject requests from origins outside the allow-list (403, empty body)
//! - Echo allowed origins on relayed responses
//!
//! # Design Decisions
//! - Requests without `Origin` are not CORS requests and pass through
//! - Denied responses never carry `Access-Control-Allow-Origin`
//! - Denials are expected traffic and logged at debug level only

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{
        header::{
            ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
            ACCESS_CONTROL_ALLOW_ORIGIN, ORIGIN, VARY,
        },
        HeaderMap, HeaderValue, Method, Request, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Outcome of checking a request's `Origin`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsDecision {
    /// No `Origin` header.
    NotCors,
    /// Origin is on the allow-list; carries the value to echo back.
    Allowed(HeaderValue),
    /// Origin is not on the allow-list.
    Denied,
}

/// Allow-list and advertised methods/headers.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allowed_origins: Vec<String>,
    allow_methods: HeaderValue,
    allow_headers: HeaderValue,
}

impl CorsPolicy {
    pub fn new(allowed_origins: &[String]) -> Self {
        Self {
            allowed_origins: allowed_origins
                .iter()
                .map(|o| o.trim_end_matches('/').to_ascii_lowercase())
                .collect(),
            allow_methods: HeaderValue::from_static("GET, OPTIONS"),
            allow_headers: HeaderValue::from_static("Content-Type"),
        }
    }

    pub fn evaluate(&self, origin: Option<&HeaderValue>) -> CorsDecision {
        let Some(origin) = origin else {
            return CorsDecision::NotCors;
        };
        let allowed = origin
            .to_str()
            .map(|o| self.allowed_origins.iter().any(|a| a.eq_ignore_ascii_case(o)))
            .unwrap_or(false);
        if allowed {
            CorsDecision::Allowed(origin.clone())
        } else {
            CorsDecision::Denied
        }
    }

    /// Response to an `OPTIONS` request. Never dials upstream.
    pub fn preflight(&self, headers: &HeaderMap) -> Response {
        match self.evaluate(headers.get(ORIGIN)) {
            CorsDecision::Denied => denied(),
            decision => {
                let mut response = StatusCode::NO_CONTENT.into_response();
                let out = response.headers_mut();
                out.insert(ACCESS_CONTROL_ALLOW_METHODS, self.allow_methods.clone());
                out.insert(ACCESS_CONTROL_ALLOW_HEADERS, self.allow_headers.clone());
                if let CorsDecision::Allowed(origin) = decision {
                    allow_origin(out, origin);
                }
                response
            }
        }
    }
}

fn denied() -> Response {
    (StatusCode::FORBIDDEN, Body::empty()).into_response()
}

fn allow_origin(headers: &mut HeaderMap, origin: HeaderValue) {
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    headers.append(VARY, HeaderValue::from_static("Origin"));
}

/// Middleware applied to the stream routes. Preflights are left to
/// `CorsPolicy::preflight`.
pub async fn cors_middleware(
    State(policy): State<Arc<CorsPolicy>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if req.method() == Method::OPTIONS {
        return next.run(req).await;
    }

    match policy.evaluate(req.headers().get(ORIGIN)) {
        CorsDecision::Denied => {
            tracing::debug!(
                origin = ?req.headers().get(ORIGIN),
                path = %req.uri().path(),
                "Origin not allowed"
            );
            denied()
        }
        CorsDecision::NotCors => next.run(req).await,
        CorsDecision::Allowed(origin) => {
            let mut response = next.run(req).await;
            allow_origin(response.headers_mut(), origin);
            response
        }
    }
}
