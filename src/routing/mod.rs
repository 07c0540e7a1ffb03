//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Stream proxy:
//!     request path → matcher.rs (segment-aware prefix match)
//!     → rewrite.rs (inbound prefix → upstream segment)
//!
//! Edge renderer:
//!     request path → matcher.rs (ArticleRoute::classify) → slug or generic page
//! ```
//!
//! # Design Decisions
//! - Rules built at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always yields the same output

pub mod matcher;
pub mod rewrite;

pub use matcher::{ArticleRoute, PathPrefixMatcher};
pub use rewrite::PathRewrite;
