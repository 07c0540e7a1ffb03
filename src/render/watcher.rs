//! Template file watcher for hot reload.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};

use crate::observability::metrics;
use crate::render::template::TemplateStore;

/// Reloads a cached template when its file changes.
pub struct TemplateWatcher {
    store: Arc<TemplateStore>,
}

impl TemplateWatcher {
    pub fn new(store: Arc<TemplateStore>) -> Self {
        Self { store }
    }

    /// Start watching in notify's background thread.
    ///
    /// The parent directory is watched so atomic replacements (write to a
    /// temp file, then rename) are seen. Dropping the returned watcher stops it.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let path = self.store.path().to_path_buf();
        let dir = watch_dir(&path);
        let file_name = path.file_name().map(|n| n.to_os_string());
        let store = self.store;

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if !(event.kind.is_modify() || event.kind.is_create()) {
                        return;
                    }
                    let touches_template = event
                        .paths
                        .iter()
                        .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
                    if !touches_template {
                        return;
                    }
                    match store.reload() {
                        Ok(()) => {
                            metrics::record_template_reload("ok");
                            tracing::info!(path = ?store.path(), "Template reloaded");
                        }
                        Err(e) => {
                            metrics::record_template_reload("error");
                            tracing::error!(error = %e, "Failed to reload template; keeping previous copy");
                        }
                    }
                }
                Err(e) => tracing::error!(error = ?e, "Template watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?path, "Template watcher started");
        Ok(watcher)
    }
}

fn watch_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
