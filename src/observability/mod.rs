//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Both services produce:
//!     → logging.rs (structured tracing events, request ids in fields)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (log aggregation)
//!     → Prometheus scrape (optional)
//! ```

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
