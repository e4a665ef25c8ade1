//! Reload orchestration: synchronous and asynchronous full rescans.
//!
//! The controller is the single consumer of two channels: reload requests
//! sent by the index when an event cannot be applied locally, and completed
//! scan results from background workers. Popping results one at a time is
//! what serializes merge delivery; workers themselves hold no reference to
//! the index, only the result channel.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use tokio::sync::mpsc;

use super::files::FileIndex;
use super::filter::PathClassifier;
use super::project::ProjectHandle;
use super::scanner;
use crate::Config;

/// How a reload interacts with its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadMode {
    /// Scan and merge in-line, blocking the caller.
    Synchronous,
    /// Return immediately; a background worker delivers the result later.
    Asynchronous,
}

/// One complete traversal result, consumed exactly once by a merge.
#[derive(Debug)]
pub struct ScanResult {
    paths: HashSet<PathBuf>,
    generation: u64,
}

impl ScanResult {
    /// Bundle scanned paths with their reload generation.
    ///
    /// Normally produced by [`ReloadController`]; public for hosts driving
    /// merges directly.
    #[must_use]
    pub fn new(paths: HashSet<PathBuf>, generation: u64) -> Self {
        Self { paths, generation }
    }

    /// Number of accepted paths in the result.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Whether the scan accepted no paths.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub(crate) fn into_parts(self) -> (HashSet<PathBuf>, u64) {
        (self.paths, self.generation)
    }
}

/// Decides how reloads run and delivers their results into the index.
pub struct ReloadController {
    index: Weak<FileIndex>,
    project: Weak<dyn ProjectHandle>,
    classifier: Arc<dyn PathClassifier>,
    force_synchronous: bool,
    stop_marker: String,
    generation: AtomicU64,
    merge_tx: mpsc::UnboundedSender<ScanResult>,
    merge_rx: mpsc::UnboundedReceiver<ScanResult>,
    reload_rx: mpsc::UnboundedReceiver<ReloadMode>,
}

impl ReloadController {
    /// Create a controller for `index`.
    ///
    /// `reload_rx` is the receiver returned by [`FileIndex::new`].
    #[must_use]
    pub fn new(
        index: &Arc<FileIndex>,
        project: Weak<dyn ProjectHandle>,
        classifier: Arc<dyn PathClassifier>,
        config: &Config,
        reload_rx: mpsc::UnboundedReceiver<ReloadMode>,
    ) -> Self {
        let (merge_tx, merge_rx) = mpsc::unbounded_channel();

        Self {
            index: Arc::downgrade(index),
            project,
            classifier,
            force_synchronous: config.force_synchronous,
            stop_marker: config.stop_marker.clone(),
            generation: AtomicU64::new(0),
            merge_tx,
            merge_rx,
            reload_rx,
        }
    }

    /// Rebuild the index from a fresh scan.
    ///
    /// The requested mode is forced to synchronous when the configuration
    /// demands deterministic ordering. A no-op once the index or the project
    /// is gone.
    pub fn reload(&self, mode: ReloadMode) {
        let mode = if self.force_synchronous {
            ReloadMode::Synchronous
        } else {
            mode
        };

        let Some(index) = self.index.upgrade() else {
            return;
        };
        let Some(project) = self.project.upgrade() else {
            return;
        };
        let root = project.root_path().to_path_buf();
        drop(project);

        index.begin_reload();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        match mode {
            ReloadMode::Synchronous => {
                let paths = scanner::scan(&root, self.classifier.as_ref(), &self.stop_marker);
                index.merge(ScanResult::new(paths, generation));
            }
            ReloadMode::Asynchronous => {
                drop(index);
                let classifier = Arc::clone(&self.classifier);
                let stop_marker = self.stop_marker.clone();
                let merge_tx = self.merge_tx.clone();

                tokio::spawn(async move {
                    match scanner::scan_async(root, classifier, stop_marker).await {
                        Ok(paths) => {
                            // A closed channel means the owner is shutting
                            // down; the result is simply dropped.
                            let _ = merge_tx.send(ScanResult::new(paths, generation));
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Asynchronous scan failed");
                        }
                    }
                });
            }
        }
    }

    /// Drive reload requests and scan completions until the index is gone.
    ///
    /// Completed results are applied one at a time; a result arriving after
    /// the index has been dropped is discarded without touching anything.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                request = self.reload_rx.recv() => match request {
                    Some(mode) => self.reload(mode),
                    None => break,
                },
                Some(result) = self.merge_rx.recv() => {
                    let Some(index) = self.index.upgrade() else {
                        tracing::debug!("Index dropped, discarding scan result");
                        break;
                    };
                    index.merge(result);
                }
            }
        }

        tracing::debug!("Reload controller stopped");
    }
}
