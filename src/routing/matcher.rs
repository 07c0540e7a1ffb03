//! Path matching logic.
//!
//! # Responsibilities
//! - Match a path prefix on segment boundaries
//! - Classify article detail paths and extract the slug
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - `/stream` matches `/stream` and `/stream/...`, never `/streamer`
//! - No regex to guarantee O(n) matching

/// Matches a path prefix on a segment boundary.
#[derive(Debug, Clone)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// The configured prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the remainder of `path` after the prefix, if it matches.
    ///
    /// The remainder is empty or starts with `/`.
    pub fn strip<'a>(&self, path: &'a str) -> Option<&'a str> {
        if self.prefix == "/" {
            return Some(path);
        }
        let rest = path.strip_prefix(self.prefix.as_str())?;
        if rest.is_empty() || rest.starts_with('/') {
            Some(rest)
        } else {
            None
        }
    }

    /// Returns true if `path` falls under the prefix.
    pub fn matches(&self, path: &str) -> bool {
        self.strip(path).is_some()
    }
}

/// Recognizes `<prefix>/<slug>` article detail paths.
#[derive(Debug, Clone)]
pub struct ArticleRoute {
    prefix: PathPrefixMatcher,
}

impl ArticleRoute {
    /// Longest slug accepted; anything longer is not an article path.
    pub const MAX_SLUG_LEN: usize = 200;

    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: PathPrefixMatcher::new(prefix),
        }
    }

    /// Returns the slug when `path` is an article detail path.
    pub fn classify<'a>(&self, path: &'a str) -> Option<&'a str> {
        let rest = self.prefix.strip(path)?;
        let slug = rest.strip_prefix('/')?;
        let slug = slug.strip_suffix('/').unwrap_or(slug);
        if slug.is_empty() || slug.contains('/') || slug.len() > Self::MAX_SLUG_LEN {
            return None;
        }
        Some(slug)
    }
}
