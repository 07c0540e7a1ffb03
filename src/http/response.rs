//! Response header handling shared by both services.
//!
//! # Design Decisions
//! - Hop-by-hop headers from upstream are never relayed
//! - Everything else is copied as-is, including repeated values

use axum::http::{HeaderMap, HeaderName};

/// Headers that only describe a single connection.
pub const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Returns true if `name` must not cross a proxy.
pub fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(&name.as_str())
}

/// Copy end-to-end headers from `from` into `to`.
pub fn copy_end_to_end_headers(from: &HeaderMap, to: &mut HeaderMap) {
    for (name, value) in from.iter() {
        if !is_hop_by_hop(name) {
            to.append(name.clone(), value.clone());
        }
    }
}
