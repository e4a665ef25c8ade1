//! The directory to file-names map and its watch bookkeeping.
//!
//! All mutation of the map and the watched-directory set happens inside one
//! mutex. Scan merges arrive through the serialized merge queue while watch
//! events arrive from an independent dispatch path, so the queue alone cannot
//! serialize them; the lock is what keeps the two sources consistent.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use std::time::Instant;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::filter::{is_vcs_metadata, Classification, PathClassifier};
use super::project::ProjectHandle;
use super::reload::{ReloadMode, ScanResult};
use super::watcher::WatchSubscription;
use crate::Config;

/// Lifecycle phase of the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexPhase {
    /// No scan has populated the index yet.
    #[default]
    Uninitialized,
    /// A reload is in flight.
    Populating,
    /// Watch events keep the index current.
    Synchronized,
}

/// Map plus watch set, mutated only while holding the enclosing lock.
#[derive(Debug, Default)]
struct IndexState {
    /// Directory path to the bare names of files directly inside it.
    files: HashMap<PathBuf, HashSet<String>>,
    /// Directories currently subscribed to the watch backend.
    watched: HashSet<PathBuf>,
    phase: IndexPhase,
    /// Generation of the last applied merge.
    merged_generation: u64,
}

/// Live index of a project's files, keyed by directory.
///
/// Invariants: no entry has an empty key, no entry has an empty name set, and
/// the watched set tracks the key set except for directories excluded by
/// policy or when watching is disabled.
pub struct FileIndex {
    project: Weak<dyn ProjectHandle>,
    classifier: Arc<dyn PathClassifier>,
    watcher: Arc<dyn WatchSubscription>,
    watch_enabled: bool,
    state: Mutex<IndexState>,
    last_reload: Mutex<Option<Instant>>,
    reload_tx: mpsc::UnboundedSender<ReloadMode>,
}

impl FileIndex {
    /// Create an empty index.
    ///
    /// Returns the index together with the reload-request receiver consumed
    /// by [`super::ReloadController`]. The index starts empty and is
    /// populated by the first reload.
    #[must_use]
    pub fn new(
        project: Weak<dyn ProjectHandle>,
        classifier: Arc<dyn PathClassifier>,
        watcher: Arc<dyn WatchSubscription>,
        config: &Config,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<ReloadMode>) {
        let (reload_tx, reload_rx) = mpsc::unbounded_channel();

        let index = Arc::new(Self {
            project,
            classifier,
            watcher,
            watch_enabled: config.watch_enabled,
            state: Mutex::new(IndexState::default()),
            last_reload: Mutex::new(None),
            reload_tx,
        });

        (index, reload_rx)
    }

    /// Replace the entire index with one complete scan result.
    ///
    /// A result older than the last applied one is discarded, so overlapping
    /// reloads that complete out of order cannot roll the index back. If the
    /// owning project is gone the result is dropped silently.
    pub fn merge(&self, scan: ScanResult) {
        if self.project.upgrade().is_none() {
            tracing::debug!("Project gone, discarding scan result");
            return;
        }

        let (paths, generation) = scan.into_parts();
        let mut state = self.state.lock();

        if generation < state.merged_generation {
            tracing::debug!(
                generation,
                newest = state.merged_generation,
                "Discarding stale scan result"
            );
            return;
        }
        state.merged_generation = generation;

        state.files.clear();
        self.watcher.clear();
        state.watched.clear();

        for path in paths {
            let Some(parent) = parent_dir(&path) else {
                tracing::warn!(path = %path.display(), "No parent directory for scanned path");
                continue;
            };
            let Some(name) = file_name(&path) else {
                tracing::warn!(path = %path.display(), "No file name for scanned path");
                continue;
            };

            self.watch_dir(&mut state, &parent);
            state.files.entry(parent).or_default().insert(name);
        }

        state.phase = IndexPhase::Synchronized;
        debug_assert!(!state.files.contains_key(Path::new("")));

        tracing::debug!(
            directories = state.files.len(),
            generation,
            "Merged scan result"
        );
    }

    /// Apply a creation notification from the watch subscription.
    ///
    /// A new directory triggers a full asynchronous reload: the flat event
    /// cannot describe what the directory already contains.
    pub fn on_file_added(&self, path: &Path) {
        if path.as_os_str().is_empty() {
            return;
        }

        match self.classifier.classify(path) {
            Classification::Filtered => {}
            Classification::Directory => {
                {
                    let mut state = self.state.lock();
                    self.watch_dir(&mut state, path);
                }
                self.request_reload();
            }
            Classification::File | Classification::Source => {
                let (Some(parent), Some(name)) = (parent_dir(path), file_name(path))
                else {
                    tracing::warn!(path = %path.display(), "No parent directory for added file");
                    self.request_reload();
                    return;
                };

                let mut state = self.state.lock();
                self.watch_dir(&mut state, &parent);
                state.files.entry(parent).or_default().insert(name);
                debug_assert!(!state.files.contains_key(Path::new("")));
            }
        }
    }

    /// Apply a removal notification from the watch subscription.
    ///
    /// Removal of a tracked directory triggers a full asynchronous reload;
    /// what vanished with it cannot be reconstructed locally.
    pub fn on_file_removed(&self, path: &Path) {
        let mut state = self.state.lock();

        if state.files.contains_key(path) {
            drop(state);
            self.request_reload();
            return;
        }

        let Some(parent) = path.parent() else {
            return;
        };
        let Some(name) = file_name(path) else {
            return;
        };

        if let Some(names) = state.files.get_mut(parent) {
            names.remove(&name);
            if names.is_empty() {
                state.files.remove(parent);
                self.unwatch_dir(&mut state, parent);
            }
        }
    }

    /// Whether `path` lies under the project root.
    ///
    /// A cheap ownership check, not a guarantee the file is indexed. Falls
    /// back to the canonicalized form of `path` so symlinked spellings of
    /// project files are recognized. Returns false once the project is gone.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        let Some(project) = self.project.upgrade() else {
            return false;
        };
        let root = project.root_path();

        if path.starts_with(root) {
            return true;
        }

        match path.canonicalize() {
            Ok(resolved) => resolved != path && resolved.starts_with(root),
            Err(_) => false,
        }
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> IndexPhase {
        self.state.lock().phase
    }

    /// When the last reload was started, if any.
    #[must_use]
    pub fn last_reload(&self) -> Option<Instant> {
        *self.last_reload.lock()
    }

    /// Total number of indexed files.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.state.lock().files.values().map(HashSet::len).sum()
    }

    /// Number of tracked directories.
    #[must_use]
    pub fn directory_count(&self) -> usize {
        self.state.lock().files.len()
    }

    /// Whether the index tracks no files.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().files.is_empty()
    }

    /// Snapshot of the tracked directories.
    #[must_use]
    pub fn directories(&self) -> Vec<PathBuf> {
        self.state.lock().files.keys().cloned().collect()
    }

    /// Sorted bare names of the files directly inside `dir`, or `None` when
    /// the directory is not tracked.
    #[must_use]
    pub fn files_in(&self, dir: &Path) -> Option<Vec<String>> {
        let state = self.state.lock();
        state.files.get(dir).map(|names| {
            let mut sorted: Vec<String> = names.iter().cloned().collect();
            sorted.sort();
            sorted
        })
    }

    /// Snapshot of the currently watched directories.
    #[must_use]
    pub fn watched_dirs(&self) -> Vec<PathBuf> {
        self.state.lock().watched.iter().cloned().collect()
    }

    /// Mark a reload as started: phase and timestamp.
    pub(crate) fn begin_reload(&self) {
        self.state.lock().phase = IndexPhase::Populating;
        *self.last_reload.lock() = Some(Instant::now());
    }

    /// Ask the reload controller for a fresh asynchronous rescan.
    fn request_reload(&self) {
        if self.reload_tx.send(ReloadMode::Asynchronous).is_err() {
            tracing::debug!("Reload controller gone, dropping reload request");
        }
    }

    /// Subscribe a directory, honoring the watch policy.
    ///
    /// VCS metadata directories are never watched; a disabled configuration
    /// turns every subscription into a no-op.
    fn watch_dir(&self, state: &mut IndexState, dir: &Path) {
        if !self.watch_enabled || is_vcs_metadata(dir) {
            return;
        }
        if state.watched.insert(dir.to_path_buf()) {
            if let Err(e) = self.watcher.watch(dir) {
                tracing::warn!(path = %dir.display(), error = %e, "Failed to watch directory");
            }
        }
    }

    /// Drop a directory subscription.
    fn unwatch_dir(&self, state: &mut IndexState, dir: &Path) {
        if state.watched.remove(dir) {
            if let Err(e) = self.watcher.unwatch(dir) {
                tracing::warn!(path = %dir.display(), error = %e, "Failed to unwatch directory");
            }
        }
    }
}

impl Drop for FileIndex {
    fn drop(&mut self) {
        // Subscriptions go first so no event outlives the index.
        self.watcher.clear();
    }
}

/// Parent directory of `path`, treating an empty parent as unobtainable.
fn parent_dir(path: &Path) -> Option<PathBuf> {
    let parent = path.parent()?;
    if parent.as_os_str().is_empty() {
        None
    } else {
        Some(parent.to_path_buf())
    }
}

/// Bare file name of `path`.
fn file_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}
