//! Stream proxy subsystem.
//!
//! # Data Flow
//! ```text
//! GET /stream/*
//!     → cors.rs (allow-list check; OPTIONS answered here)
//!     → target.rs (path rewrite → upstream URL)
//!     → upstream.rs (dial with deadline + retries)  ── failure → error.rs (502 JSON)
//!     → relay.rs (status + headers + chunked body, no buffering)
//! ```
//!
//! Per request: `Idle → DialingUpstream → {Connected → Streaming → Closed}
//! | {Failed → ErrorSent}` (session.rs).

pub mod cors;
pub mod error;
pub mod relay;
pub mod session;
pub mod target;
pub mod upstream;

pub use cors::{CorsDecision, CorsPolicy};
pub use error::{ProxyError, StreamErrorBody, STREAM_UNAVAILABLE};
pub use session::{StreamPhase, StreamSession};
pub use target::{ProxyTarget, TargetError, TrustPolicy};
pub use upstream::{OpenedStream, UpstreamClient};
