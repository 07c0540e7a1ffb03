//! Short-lived cache of article metadata keyed by slug.
//!
//! Only articles that were found are stored, so an article published after
//! a miss shows up on the next request.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::render::metadata::ArticleMetadata;

#[derive(Debug, Clone)]
struct Entry {
    metadata: Arc<ArticleMetadata>,
    stored_at: Instant,
}

/// A thread-safe TTL cache. Disabled when built with a zero TTL.
#[derive(Debug, Clone)]
pub struct MetadataCache {
    inner: Arc<DashMap<String, Entry>>,
    ttl: Option<Duration>,
}

impl MetadataCache {
    pub fn new(ttl_secs: u64) -> Self {
        Self::with_ttl(Duration::from_secs(ttl_secs))
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            ttl: (!ttl.is_zero()).then_some(ttl),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.ttl.is_some()
    }

    /// Fresh entry for `slug`. Expired entries are evicted on read.
    pub fn get(&self, slug: &str) -> Option<Arc<ArticleMetadata>> {
        let ttl = self.ttl?;
        if let Some(entry) = self.inner.get(slug) {
            if entry.stored_at.elapsed() < ttl {
                return Some(entry.metadata.clone());
            }
        }
        self.inner
            .remove_if(slug, |_, entry| entry.stored_at.elapsed() >= ttl);
        None
    }

    pub fn insert(&self, slug: &str, metadata: Arc<ArticleMetadata>) {
        if !self.is_enabled() {
            return;
        }
        self.inner.insert(
            slug.to_string(),
            Entry {
                metadata,
                stored_at: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
