//! Timeout enforcement.
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from other errors
//! - Deadlines cover dialing and the first byte only; relayed streams
//!   have no deadline

use std::future::Future;
use std::time::Duration;

/// Returned when a deadline elapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Elapsed(pub Duration);

/// Run `fut` with a deadline, flattening its own error via `From<Elapsed>`.
pub async fn with_deadline<T, E, F>(deadline: Duration, fut: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<Elapsed>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(E::from(Elapsed(deadline))),
    }
}
