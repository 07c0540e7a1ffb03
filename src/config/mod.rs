//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults (serde(default))
//!     → optional TOML file (loader.rs)
//!     → environment overrides (loader.rs)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → shared via Arc to the service that was started
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no runtime reload
//! - All fields have defaults to allow env-only deployments
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AppConfig, EdgeRendererConfig, LifecycleConfig, ListenerConfig, ObservabilityConfig,
    RetryConfig, SiteConfig, StreamProxyConfig,
};
pub use validation::ValidationError;
