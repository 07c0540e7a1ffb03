//! Inbound → upstream path rewriting.
//!
//! A pure prefix substitution: the inbound prefix is replaced by the
//! upstream segment and the remainder (plus query) is carried over as is.
//! Remainders with `.` or `..` segments, literal or percent-encoded, are
//! rejected so a request never resolves outside the upstream segment.

use crate::routing::matcher::PathPrefixMatcher;

/// Prefix replacement rule.
#[derive(Debug, Clone)]
pub struct PathRewrite {
    inbound: PathPrefixMatcher,
    upstream: String,
}

impl PathRewrite {
    pub fn new(inbound_prefix: impl Into<String>, upstream_prefix: impl Into<String>) -> Self {
        Self {
            inbound: PathPrefixMatcher::new(inbound_prefix),
            upstream: upstream_prefix.into(),
        }
    }

    /// Inbound prefix this rule applies to.
    pub fn inbound_prefix(&self) -> &str {
        self.inbound.prefix()
    }

    /// Upstream segment requests are rewritten into, without trailing `/`.
    pub fn upstream_prefix(&self) -> &str {
        self.upstream.trim_end_matches('/')
    }

    /// Rewrite `path` (and optional query). `None` if the path is outside
    /// the inbound prefix or carries a dot segment.
    pub fn apply(&self, path: &str, query: Option<&str>) -> Option<String> {
        let rest = self.inbound.strip(path)?;
        if rest.split(['/', '\\']).any(is_dot_segment) {
            return None;
        }
        let upstream = self.upstream.trim_end_matches('/');
        let mut out = String::with_capacity(upstream.len() + rest.len() + 1);
        out.push_str(upstream);
        out.push_str(rest);
        if out.is_empty() {
            out.push('/');
        }
        if let Some(q) = query.filter(|q| !q.is_empty()) {
            out.push('?');
            out.push_str(q);
        }
        Some(out)
    }
}

fn is_dot_segment(segment: &str) -> bool {
    let decoded = segment.to_ascii_lowercase().replace("%2e", ".");
    decoded == "." || decoded == ".."
}
