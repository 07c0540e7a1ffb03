//! HTTP surface of both services.
//!
//! # Data Flow
//! ```text
//! Stream proxy:
//!     TCP → stream_proxy.rs (router, CORS, listener cap)
//!     → request.rs (request ID) → proxy::upstream (dial + retries)
//!     → response.rs (end-to-end headers) → proxy::relay (chunk relay)
//!
//! Edge renderer:
//!     TCP → edge_renderer.rs (router, compression, panic guard)
//!     → ServeDir for assets, else render::DocumentRenderer
//! ```

pub mod edge_renderer;
pub mod request;
pub mod response;
pub mod stream_proxy;

pub use edge_renderer::{EdgeRendererServer, EdgeStartupError, EdgeState};
pub use request::X_REQUEST_ID;
pub use stream_proxy::{ProxyState, StreamProxyServer};
