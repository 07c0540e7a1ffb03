//! Edge renderer HTTP server.
//!
//! # Responsibilities
//! - Serve built static assets from `static_dir`
//! - Serve the SPA document for every other path, with article head tags
//!   injected on `/<article_prefix>/<slug>`
//! - Compress responses for clients that accept gzip or deflate
//! - Turn template failures and handler panics into a plain 500
//!
//! # Design Decisions
//! - Unknown paths fall back to the document so client-side routes work
//! - The document is never cached by clients; hashed assets are immutable

use std::any::Any;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{
        header::{CACHE_CONTROL, CONTENT_TYPE},
        HeaderMap, HeaderValue, Request, StatusCode, Uri,
    },
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    catch_panic::CatchPanicLayer,
    compression::CompressionLayer,
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::EdgeRendererConfig;
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::observability::metrics;
use crate::render::{
    DocumentRenderer, MetadataClient, MetadataSetupError, RenderError, TemplateStore,
    TemplateWatcher,
};
use crate::routing::ArticleRoute;

const SERVICE: &str = "edge_renderer";
const INTERNAL_ERROR: &str = "Internal Server Error";
const IMMUTABLE_ASSET: &str = "public, max-age=31536000, immutable";
const PUBLIC_ASSET: &str = "public, max-age=3600";

/// Errors raised while starting the edge renderer.
#[derive(Debug, Error)]
pub enum EdgeStartupError {
    #[error(transparent)]
    Template(#[from] RenderError),

    #[error(transparent)]
    Metadata(#[from] MetadataSetupError),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct EdgeState {
    pub templates: Arc<TemplateStore>,
    pub renderer: DocumentRenderer,
}

/// HTTP server for the edge renderer.
pub struct EdgeRendererServer {
    router: Router,
    templates: Arc<TemplateStore>,
    config: EdgeRendererConfig,
}

impl EdgeRendererServer {
    pub fn new(config: EdgeRendererConfig) -> Result<Self, EdgeStartupError> {
        let template_path = PathBuf::from(&config.static_dir).join(&config.template_file);
        let templates = Arc::new(TemplateStore::open(template_path, config.cache_template)?);
        let renderer = DocumentRenderer::new(
            ArticleRoute::new(config.article_prefix.clone()),
            MetadataClient::new(&config)?,
            config.site.clone(),
        );

        let state = EdgeState {
            templates: templates.clone(),
            renderer,
        };
        let router = Self::build_router(&config, state);
        Ok(Self {
            router,
            templates,
            config,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &EdgeRendererConfig, state: EdgeState) -> Router {
        let prefix = config.article_prefix.trim_end_matches('/');
        let document = get(serve_document).with_state(state.clone());
        let assets = ServeDir::new(&config.static_dir)
            .append_index_html_on_directories(false)
            .fallback(document);

        Router::new()
            .route("/healthz", get(healthz))
            .route("/", get(serve_document))
            .route(&format!("{}/{{slug}}", prefix), get(serve_document))
            .route(&format!("{}/{{slug}}/", prefix), get(serve_document))
            .with_state(state)
            .fallback_service(assets)
            .layer(middleware::from_fn(asset_cache_headers))
            .layer(CompressionLayer::new())
            .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
            .layer(CatchPanicLayer::custom(handle_panic))
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

        let _watcher = if self.templates.is_cached() && self.config.watch_template {
            match TemplateWatcher::new(self.templates.clone()).run() {
                Ok(watcher) => Some(watcher),
                Err(e) => {
                    tracing::warn!(error = %e, "Template watcher unavailable; hot reload disabled");
                    None
                }
            }
        } else {
            None
        };

        tracing::info!(
            address = %addr,
            static_dir = %self.config.static_dir,
            content_api = %self.config.content_api_url,
            cache_template = self.config.cache_template,
            "Edge renderer starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Edge renderer received shutdown signal");
            })
            .await?;

        tracing::info!("Edge renderer stopped");
        Ok(())
    }
}

async fn healthz() -> impl IntoResponse {
    ([(CACHE_CONTROL, "no-store")], "ok")
}

/// The SPA document, with article tags when the path names an article.
async fn serve_document(State(state): State<EdgeState>, headers: HeaderMap, uri: Uri) -> Response {
    let start = Instant::now();
    let request_id = request_id(&headers);

    let template = match state.templates.current().await {
        Ok(template) => template,
        Err(e) => {
            tracing::error!(request_id = %request_id, path = %uri.path(), error = %e, "Template unavailable");
            metrics::record_request(SERVICE, 500, start);
            return internal_error();
        }
    };

    let html = state.renderer.render(&template, uri.path()).await.into_owned();
    metrics::record_request(SERVICE, 200, start);

    (
        [
            (CONTENT_TYPE, "text/html; charset=utf-8"),
            (CACHE_CONTROL, "no-cache"),
        ],
        html,
    )
        .into_response()
}

/// Cache headers for files served from `static_dir`.
async fn asset_cache_headers(request: Request<Body>, next: Next) -> Response {
    let immutable = request.uri().path().starts_with("/static/");
    let mut response = next.run(request).await;

    if response.status().is_success() && !response.headers().contains_key(CACHE_CONTROL) {
        let value = if immutable { IMMUTABLE_ASSET } else { PUBLIC_ASSET };
        response
            .headers_mut()
            .insert(CACHE_CONTROL, HeaderValue::from_static(value));
    }
    response
}

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        [(CONTENT_TYPE, "text/plain; charset=utf-8")],
        INTERNAL_ERROR,
    )
        .into_response()
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!(panic = %detail, "Handler panicked");
    metrics::record_panic(SERVICE);
    internal_error()
}
