//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Dial upstream:
//!     → timeouts.rs (deadline for headers + first chunk)
//!     → On failure: retries.rs (check budget, sleep with backoff.rs)
//!     → redial the same rewritten path
//! ```
//!
//! # Design Decisions
//! - Every dial has a deadline; relayed bytes do not
//! - Retries only before anything is sent to the client
//! - Backoff is exponential with jitter, capped

pub mod backoff;
pub mod retries;
pub mod timeouts;

pub use retries::RetryPolicy;
pub use timeouts::{with_deadline, Elapsed};
