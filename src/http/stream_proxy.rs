//! Stream proxy HTTP server.
//!
//! # Responsibilities
//! - Create the Axum router for `/stream` and `/stream/*`
//! - Wire up middleware (tracing, request ID, CORS)
//! - Bound concurrent relays
//! - Dial upstream and relay, or answer with the 502 JSON error
//!
//! # Design Decisions
//! - No request timeout layer: relayed streams have no natural end
//! - The upstream deadline lives in `proxy::upstream`, not in tower

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Semaphore};
use tower_http::trace::TraceLayer;

use crate::config::StreamProxyConfig;
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::observability::metrics;
use crate::proxy::cors::{cors_middleware, CorsPolicy};
use crate::proxy::relay::relay_response;
use crate::proxy::{ProxyError, ProxyTarget, StreamPhase, StreamSession, TargetError, UpstreamClient};

const SERVICE: &str = "stream_proxy";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct ProxyState {
    pub target: Arc<ProxyTarget>,
    pub upstream: UpstreamClient,
    pub cors: Arc<CorsPolicy>,
    pub listeners: Arc<Semaphore>,
}

/// HTTP server for the stream proxy.
pub struct StreamProxyServer {
    router: Router,
    config: StreamProxyConfig,
}

impl StreamProxyServer {
    /// Create a new server with the given configuration.
    pub fn new(config: StreamProxyConfig) -> Result<Self, TargetError> {
        let target = Arc::new(ProxyTarget::from_config(&config)?);
        let upstream = UpstreamClient::new(target.clone())?;

        let state = ProxyState {
            target,
            upstream,
            cors: Arc::new(CorsPolicy::new(&config.allowed_origins)),
            listeners: Arc::new(Semaphore::new(config.max_streams)),
        };

        let router = Self::build_router(state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: ProxyState) -> Router {
        let prefix = state.target.rewrite().inbound_prefix().to_string();
        let nested = format!("{}/{{*rest}}", prefix.trim_end_matches('/'));

        let stream_routes = Router::new()
            .route(&prefix, get(stream_handler).options(preflight_handler))
            .route(&nested, get(stream_handler).options(preflight_handler))
            .route_layer(middleware::from_fn_with_state(state.cors.clone(), cors_middleware))
            .with_state(state);

        Router::new()
            .route("/healthz", get(healthz))
            .merge(stream_routes)
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// Router for in-process use (tests, embedding).
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream_url,
            prefix = %self.config.inbound_prefix,
            max_streams = self.config.max_streams,
            "Stream proxy starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Stream proxy received shutdown signal");
            })
            .await?;

        tracing::info!("Stream proxy stopped");
        Ok(())
    }
}

async fn healthz() -> &'static str {
    "ok"
}

/// `OPTIONS` on the stream path. Never dials upstream.
async fn preflight_handler(State(state): State<ProxyState>, headers: HeaderMap) -> Response {
    state.cors.preflight(&headers)
}

/// Dial the upstream for this path and relay it.
async fn stream_handler(State(state): State<ProxyState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let request_id = request_id(request.headers());
    let path = request.uri().path().to_string();

    let Some(url) = state.target.upstream_url(&path, request.uri().query()) else {
        tracing::warn!(request_id = %request_id, path = %path, "Path outside stream prefix");
        metrics::record_request(SERVICE, 404, start);
        return StatusCode::NOT_FOUND.into_response();
    };

    let permit = match state.listeners.clone().try_acquire_owned() {
        Ok(permit) => permit,
        Err(_) => {
            tracing::warn!(request_id = %request_id, "Listener capacity reached");
            metrics::record_request(SERVICE, 503, start);
            return ProxyError::CapacityReached.into_response();
        }
    };

    tracing::debug!(
        request_id = %request_id,
        path = %path,
        upstream = %url,
        "Proxying stream request"
    );

    let mut session = StreamSession::new(request_id);
    match state.upstream.open(&url, &mut session).await {
        Ok(opened) => {
            metrics::record_request(SERVICE, opened.status.as_u16(), start);
            relay_response(opened, session, permit)
        }
        Err(e) => {
            tracing::error!(
                request_id = %session.request_id(),
                upstream = %url,
                attempts = session.attempts(),
                error = %e,
                "Stream unavailable"
            );
            metrics::record_request(SERVICE, e.status_code().as_u16(), start);
            if session.can_send_error() {
                session.advance(StreamPhase::ErrorSent);
            }
            e.into_response()
        }
    }
}
