//! Watch subscription seam and the notify-backed adapter.
//!
//! The index only ever talks to [`WatchSubscription`]; [`NotifyWatcher`] is
//! the production adapter over `notify`. Events originate on notify's own
//! notification thread and are forwarded through a channel, so they reach
//! the index outside the serialized merge queue.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Weak;

use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::events::WatchEvent;
use super::files::FileIndex;
use crate::error::WatchError;
use crate::Result;

/// Subscription service for file-system change notifications.
///
/// Only [`FileIndex`] mutates the subscription set, under its own lock.
pub trait WatchSubscription: Send + Sync {
    /// Subscribe to change notifications for a single directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the subscription.
    fn watch(&self, path: &Path) -> Result<()>;

    /// Drop the subscription for a directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the path was not subscribed.
    fn unwatch(&self, path: &Path) -> Result<()>;

    /// Drop every active subscription.
    fn clear(&self);
}

/// `notify`-backed watch subscription.
///
/// Directories are watched non-recursively: the index subscribes every
/// tracked directory individually, so recursive watches would double-report.
pub struct NotifyWatcher {
    backend: Mutex<RecommendedWatcher>,
    watched: Mutex<HashSet<PathBuf>>,
}

impl NotifyWatcher {
    /// Create the adapter and the event stream it feeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the notify backend cannot be created.
    pub fn new() -> Result<(Self, mpsc::UnboundedReceiver<WatchEvent>)> {
        let (tx, rx) = mpsc::unbounded_channel();

        let backend = notify::recommended_watcher(
            move |result: notify::Result<notify::Event>| match result {
                Ok(event) => {
                    for converted in convert(event) {
                        // Receiver gone means the subsystem is shutting down.
                        let _ = tx.send(converted);
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Watch backend error");
                }
            },
        )
        .map_err(|e| WatchError::InitFailed {
            reason: e.to_string(),
        })?;

        Ok((
            Self {
                backend: Mutex::new(backend),
                watched: Mutex::new(HashSet::new()),
            },
            rx,
        ))
    }

    /// Snapshot of the currently subscribed directories.
    #[must_use]
    pub fn watched_dirs(&self) -> Vec<PathBuf> {
        self.watched.lock().iter().cloned().collect()
    }
}

impl WatchSubscription for NotifyWatcher {
    fn watch(&self, path: &Path) -> Result<()> {
        self.backend
            .lock()
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(|e| WatchError::WatchFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        self.watched.lock().insert(path.to_path_buf());
        tracing::debug!(path = %path.display(), "Watching directory");
        Ok(())
    }

    fn unwatch(&self, path: &Path) -> Result<()> {
        self.backend
            .lock()
            .unwatch(path)
            .map_err(|e| WatchError::UnwatchFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        self.watched.lock().remove(path);
        tracing::debug!(path = %path.display(), "Stopped watching directory");
        Ok(())
    }

    fn clear(&self) {
        let paths: Vec<PathBuf> = self.watched.lock().drain().collect();
        let mut backend = self.backend.lock();
        for path in paths {
            // Directories deleted from disk unwatch themselves; ignore.
            let _ = backend.unwatch(&path);
        }
    }
}

/// Translate a notify event into index-level add/remove events.
///
/// Renames become a removal of the old spelling and an addition of the new
/// one. Content modifications carry no information the index tracks.
fn convert(event: notify::Event) -> Vec<WatchEvent> {
    match event.kind {
        EventKind::Create(_) => event.paths.into_iter().map(WatchEvent::Added).collect(),
        EventKind::Remove(_) => event.paths.into_iter().map(WatchEvent::Removed).collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            event.paths.into_iter().map(WatchEvent::Removed).collect()
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            event.paths.into_iter().map(WatchEvent::Added).collect()
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let mut paths = event.paths.into_iter();
            let mut out = Vec::with_capacity(2);
            if let Some(from) = paths.next() {
                out.push(WatchEvent::Removed(from));
            }
            if let Some(to) = paths.next() {
                out.push(WatchEvent::Added(to));
            }
            out
        }
        // Some backends report renames without a direction; the path's
        // current existence decides which side of the rename this is.
        EventKind::Modify(ModifyKind::Name(RenameMode::Any)) => event
            .paths
            .into_iter()
            .map(|path| {
                if path.exists() {
                    WatchEvent::Added(path)
                } else {
                    WatchEvent::Removed(path)
                }
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Apply watch events to the index in arrival order.
///
/// Runs until the watcher or the index is dropped. Holds only a weak
/// reference between events, so it never extends the index's lifetime.
pub async fn pump_events(
    index: Weak<FileIndex>,
    mut events: mpsc::UnboundedReceiver<WatchEvent>,
) {
    while let Some(event) = events.recv().await {
        let Some(index) = index.upgrade() else {
            tracing::debug!("Index dropped, stopping event dispatch");
            break;
        };

        match event {
            WatchEvent::Added(path) => index.on_file_added(&path),
            WatchEvent::Removed(path) => index.on_file_removed(&path),
        }
    }
}
