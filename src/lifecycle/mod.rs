//! Lifecycle management.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → wait_for_signal resolves
//!
//! Shutdown (shutdown.rs):
//!     trigger → servers stop accepting → drain until the grace deadline
//!     → abort whatever is still relaying
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::{DrainOutcome, Shutdown};
pub use signals::wait_for_signal;
