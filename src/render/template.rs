//! Document template loading.
//!
//! # Design Decisions
//! - With caching on, the template is read once at startup and swapped
//!   atomically on reload; readers never block
//! - With caching off, every request reads the file, and a read failure
//!   surfaces as an error instead of a stale copy

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use thiserror::Error;

use crate::render::inject::{locate_head_anchor, HeadAnchor};

/// Errors raised while producing a document.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to read template {path}: {source}")]
    TemplateRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The client-side application's HTML entry document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentTemplate {
    html: String,
}

impl DocumentTemplate {
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn anchor(&self) -> HeadAnchor {
        locate_head_anchor(&self.html)
    }
}

/// Source of the current template.
pub struct TemplateStore {
    path: PathBuf,
    cached: Option<ArcSwap<DocumentTemplate>>,
}

impl TemplateStore {
    /// Open the template at `path`. With `cache` the file must be readable now.
    pub fn open(path: impl Into<PathBuf>, cache: bool) -> Result<Self, RenderError> {
        let path = path.into();
        let cached = if cache {
            let template = read_sync(&path)?;
            warn_on_anchor(&path, &template);
            Some(ArcSwap::from_pointee(template))
        } else {
            None
        };
        Ok(Self { path, cached })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_cached(&self) -> bool {
        self.cached.is_some()
    }

    /// The template to render this request with.
    pub async fn current(&self) -> Result<Arc<DocumentTemplate>, RenderError> {
        match &self.cached {
            Some(cached) => Ok(cached.load_full()),
            None => {
                let html = tokio::fs::read_to_string(&self.path).await.map_err(|source| {
                    RenderError::TemplateRead {
                        path: self.path.clone(),
                        source,
                    }
                })?;
                Ok(Arc::new(DocumentTemplate::new(html)))
            }
        }
    }

    /// Re-read the file into the cache. The previous copy is kept on failure.
    ///
    /// A no-op when caching is off.
    pub fn reload(&self) -> Result<(), RenderError> {
        let Some(cached) = &self.cached else {
            return Ok(());
        };
        let template = read_sync(&self.path)?;
        warn_on_anchor(&self.path, &template);
        cached.store(Arc::new(template));
        Ok(())
    }
}

fn read_sync(path: &Path) -> Result<DocumentTemplate, RenderError> {
    std::fs::read_to_string(path)
        .map(DocumentTemplate::new)
        .map_err(|source| RenderError::TemplateRead {
            path: path.to_path_buf(),
            source,
        })
}

fn warn_on_anchor(path: &Path, template: &DocumentTemplate) {
    match template.anchor() {
        HeadAnchor::Single(_) => {}
        HeadAnchor::Missing => {
            tracing::warn!(path = ?path, "Template has no </head>; documents will be served unmodified")
        }
        HeadAnchor::Duplicated => {
            tracing::warn!(path = ?path, "Template has more than one </head>; documents will be served unmodified")
        }
    }
}
