//! Path classification for scans and watch events.

use std::path::{Component, Path};

use ignore::gitignore::{Gitignore, GitignoreBuilder};

use super::project::ProjectHandle;
use crate::{Error, Result};

/// Version-control metadata directories, never indexed and never watched.
const VCS_DIRS: &[&str] = &[".git", ".svn", ".cvs"];

/// Extensions recognized as source files.
const SOURCE_EXTENSIONS: &[&str] = &[
    "c", "cc", "cpp", "cxx", "h", "hh", "hpp", "m", "mm", "rs", "go", "py", "js", "ts",
    "java",
];

/// How the classifier sees a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Excluded from the index entirely.
    Filtered,
    /// A directory that may be descended into.
    Directory,
    /// A plain file tracked by the index.
    File,
    /// A recognized source file.
    Source,
}

/// Deterministic, side-effect-free path categorization.
///
/// Consulted on every entry during scans and on every watch event. Hosts with
/// their own rule engine implement this trait; [`PatternClassifier`] is the
/// built-in gitignore-style implementation.
pub trait PathClassifier: Send + Sync {
    /// Categorize a single path.
    fn classify(&self, path: &Path) -> Classification;
}

/// Classifier backed by gitignore-style exclude patterns.
#[derive(Debug)]
pub struct PatternClassifier {
    excludes: Option<Gitignore>,
}

impl PatternClassifier {
    /// Create a classifier with no exclude patterns.
    #[must_use]
    pub fn new() -> Self {
        Self { excludes: None }
    }

    /// Create a classifier from exclude patterns rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if a pattern is invalid.
    pub fn with_patterns(root: impl AsRef<Path>, patterns: &[String]) -> Result<Self> {
        if patterns.is_empty() {
            return Ok(Self::new());
        }

        let mut builder = GitignoreBuilder::new(root.as_ref());
        for pattern in patterns {
            builder.add_line(None, pattern).map_err(|e| {
                Error::config(format!("invalid exclude pattern '{pattern}': {e}"))
            })?;
        }

        let excludes = builder
            .build()
            .map_err(|e| Error::config(format!("failed to build exclude matcher: {e}")))?;

        Ok(Self {
            excludes: Some(excludes),
        })
    }

    /// Create a classifier from the owning project's root and filters.
    ///
    /// # Errors
    ///
    /// Returns an error if the project's filter list contains an invalid
    /// pattern.
    pub fn for_project(project: &dyn ProjectHandle) -> Result<Self> {
        Self::with_patterns(project.root_path(), &project.exclude_filters())
    }
}

impl Default for PatternClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl PathClassifier for PatternClassifier {
    fn classify(&self, path: &Path) -> Classification {
        if is_vcs_metadata(path) {
            return Classification::Filtered;
        }

        let is_dir = path.is_dir();
        if let Some(ref excludes) = self.excludes {
            // Parent matching so a watch event for a file inside an excluded
            // directory is filtered like the directory itself.
            if excludes
                .matched_path_or_any_parents(path, is_dir)
                .is_ignore()
            {
                return Classification::Filtered;
            }
        }

        if is_dir {
            return Classification::Directory;
        }

        if is_source_extension(path) {
            Classification::Source
        } else {
            Classification::File
        }
    }
}

/// Check whether any component of `path` is a VCS metadata directory.
pub(crate) fn is_vcs_metadata(path: &Path) -> bool {
    path.components().any(|component| {
        matches!(component, Component::Normal(name)
            if VCS_DIRS.iter().any(|dir| name == *dir))
    })
}

/// Check if a path carries a recognized source extension.
fn is_source_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            let ext = ext.to_lowercase();
            SOURCE_EXTENSIONS.iter().any(|s| *s == ext)
        })
}
