//! Edge rendering subsystem.
//!
//! # Data Flow
//! ```text
//! request path → routing::ArticleRoute (slug?)
//!     → metadata.rs (cache.rs, then content API under a deadline)
//!     → tags.rs (escaped head fragment + JSON-LD)
//!     → inject.rs (copy of template.rs snapshot with fragment before </head>)
//! ```
//!
//! # Design Decisions
//! - The template snapshot is shared and read-only; injection copies it
//! - Any lookup failure yields the unmodified template, never an error page
//! - watcher.rs swaps the snapshot atomically on file changes

pub mod cache;
pub mod escape;
pub mod inject;
pub mod metadata;
pub mod tags;
pub mod template;
pub mod watcher;

use std::borrow::Cow;

pub use cache::MetadataCache;
pub use inject::{inject_head, locate_head_anchor, HeadAnchor};
pub use metadata::{ArticleMetadata, MetadataClient, MetadataError, MetadataSetupError};
pub use tags::HeadTags;
pub use template::{DocumentTemplate, RenderError, TemplateStore};
pub use watcher::TemplateWatcher;

use crate::config::SiteConfig;
use crate::routing::ArticleRoute;

/// Produces the document for a request path.
#[derive(Clone)]
pub struct DocumentRenderer {
    route: ArticleRoute,
    metadata: MetadataClient,
    site: SiteConfig,
}

impl DocumentRenderer {
    pub fn new(route: ArticleRoute, metadata: MetadataClient, site: SiteConfig) -> Self {
        Self {
            route,
            metadata,
            site,
        }
    }

    /// The template with article tags injected, or the template unchanged.
    pub async fn render<'t>(&self, template: &'t DocumentTemplate, path: &str) -> Cow<'t, str> {
        let Some(slug) = self.route.classify(path) else {
            return Cow::Borrowed(template.html());
        };

        match template.anchor() {
            HeadAnchor::Single(_) => {}
            anchor => {
                tracing::warn!(slug = %slug, anchor = ?anchor, "Template head anchor unusable; serving unmodified");
                return Cow::Borrowed(template.html());
            }
        }

        match self.metadata.lookup(slug).await {
            Some(article) => {
                let tags = HeadTags::build(&article, &self.site);
                tracing::debug!(slug = %slug, "Injecting article head tags");
                inject_head(template.html(), tags.as_str())
            }
            None => Cow::Borrowed(template.html()),
        }
    }
}
