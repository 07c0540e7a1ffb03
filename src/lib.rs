//! Radio edge services: a live audio stream relay and an HTML edge renderer.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;
pub mod render;
pub mod resilience;
pub mod routing;

pub use config::AppConfig;
pub use http::{EdgeRendererServer, StreamProxyServer};
pub use lifecycle::Shutdown;
