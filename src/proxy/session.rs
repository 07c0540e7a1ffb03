//! Per-request stream state machine.
//!
//! # State Transitions
//! ```text
//! Idle → DialingUpstream
//! DialingUpstream → Connected | Failed
//! Failed → DialingUpstream (retry) | ErrorSent
//! Connected → Streaming
//! Streaming → Closed
//! ```
//!
//! `Closed` and `ErrorSent` are terminal. Once `Streaming` is reached the
//! response head has been handed to the client, so no error status can
//! follow.

use std::fmt;
use std::time::{Duration, Instant};

/// Phase of a single proxied stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    Idle,
    DialingUpstream,
    Connected,
    Streaming,
    Closed,
    Failed,
    ErrorSent,
}

impl StreamPhase {
    /// Whether `next` is a legal successor of `self`.
    pub fn can_advance_to(self, next: StreamPhase) -> bool {
        use StreamPhase::*;
        matches!(
            (self, next),
            (Idle, DialingUpstream)
                | (DialingUpstream, Connected)
                | (DialingUpstream, Failed)
                | (Failed, DialingUpstream)
                | (Failed, ErrorSent)
                | (Connected, Streaming)
                | (Streaming, Closed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, StreamPhase::Closed | StreamPhase::ErrorSent)
    }
}

impl fmt::Display for StreamPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StreamPhase::Idle => "idle",
            StreamPhase::DialingUpstream => "dialing",
            StreamPhase::Connected => "connected",
            StreamPhase::Streaming => "streaming",
            StreamPhase::Closed => "closed",
            StreamPhase::Failed => "failed",
            StreamPhase::ErrorSent => "error_sent",
        };
        f.write_str(name)
    }
}

/// Tracks one proxied request from dial to close.
#[derive(Debug)]
pub struct StreamSession {
    request_id: String,
    phase: StreamPhase,
    attempts: u32,
    started: Instant,
}

impl StreamSession {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            phase: StreamPhase::Idle,
            attempts: 0,
            started: Instant::now(),
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn phase(&self) -> StreamPhase {
        self.phase
    }

    /// Number of upstream dials made so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Move to `next`. Illegal transitions are refused and logged.
    pub fn advance(&mut self, next: StreamPhase) -> bool {
        if !self.phase.can_advance_to(next) {
            tracing::error!(
                request_id = %self.request_id,
                from = %self.phase,
                to = %next,
                "Illegal stream phase transition"
            );
            return false;
        }
        if next == StreamPhase::DialingUpstream {
            self.attempts += 1;
        }
        self.phase = next;
        true
    }

    /// An error body may only be sent while nothing has been streamed.
    pub fn can_send_error(&self) -> bool {
        self.phase == StreamPhase::Failed
    }
}
