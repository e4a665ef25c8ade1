//! Directory traversal building the initial file set.
//!
//! Walks a project root applying a classifier and collects every accepted
//! file path. The walk is best-effort: unreadable entries are skipped and the
//! scan never fails as a whole. A stale or partial result is corrected by
//! subsequent watch events or the next reload.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use walkdir::WalkDir;

use super::filter::{Classification, PathClassifier};
use crate::error::ScanError;
use crate::Result;

/// Continuation signal returned by a traversal policy for each entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    /// Record the entry in the result set.
    Accept,
    /// Enter the directory without recording it.
    Descend,
    /// Pass over the entry; for a directory the whole subtree is pruned.
    Skip,
}

/// Walk the tree under `root`, consulting `policy` for every entry.
///
/// Pre-order traversal; `root` itself is not visited. Entries that cannot be
/// read are logged and skipped.
pub fn walk<F>(root: &Path, mut policy: F) -> HashSet<PathBuf>
where
    F: FnMut(&Path) -> Visit,
{
    let mut accepted = HashSet::new();

    let mut entries = WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .into_iter();

    while let Some(entry) = entries.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!(error = %e, "Skipping unreadable entry");
                continue;
            }
        };

        match policy(entry.path()) {
            Visit::Accept => {
                accepted.insert(entry.into_path());
            }
            Visit::Descend => {}
            Visit::Skip => {
                if entry.file_type().is_dir() {
                    entries.skip_current_dir();
                }
            }
        }
    }

    accepted
}

/// Scan `root` and return the set of accepted file paths.
///
/// Directories containing a file named `stop_marker` are not descended into.
/// The returned set is complete and filter-consistent; iteration order is
/// unspecified.
pub fn scan(
    root: &Path,
    classifier: &dyn PathClassifier,
    stop_marker: &str,
) -> HashSet<PathBuf> {
    let start = Instant::now();
    let mut filtered: u64 = 0;
    let mut pruned: u64 = 0;

    let accepted = walk(root, |path| match classifier.classify(path) {
        Classification::Filtered => {
            filtered += 1;
            Visit::Skip
        }
        Classification::Directory => {
            if path.join(stop_marker).exists() {
                pruned += 1;
                Visit::Skip
            } else {
                Visit::Descend
            }
        }
        Classification::File | Classification::Source => Visit::Accept,
    });

    tracing::info!(
        root = %root.display(),
        accepted = accepted.len(),
        filtered,
        pruned,
        elapsed = ?start.elapsed(),
        "Directory scan complete"
    );

    accepted
}

/// Run [`scan`] on a blocking worker thread.
///
/// # Errors
///
/// Returns an error if the worker terminates abnormally; the scan itself
/// never fails.
pub async fn scan_async(
    root: PathBuf,
    classifier: Arc<dyn PathClassifier>,
    stop_marker: String,
) -> Result<HashSet<PathBuf>> {
    tokio::task::spawn_blocking(move || scan(&root, classifier.as_ref(), &stop_marker))
        .await
        .map_err(|e| {
            ScanError::WorkerFailed {
                reason: e.to_string(),
            }
            .into()
        })
}
