//! Owner-side inputs consumed by the index subsystem.

use std::path::{Path, PathBuf};

/// Interface to the project object that owns the index subsystem.
///
/// The index holds this only as a `Weak` reference: the project outlives the
/// index in normal operation, and every access checks liveness instead of
/// assuming it.
pub trait ProjectHandle: Send + Sync {
    /// Absolute project root; immutable for the project's lifetime.
    fn root_path(&self) -> &Path;

    /// Exclude patterns consumed when a classifier is built.
    fn exclude_filters(&self) -> Vec<String>;
}

/// Fixed-value [`ProjectHandle`] for hosts with static configuration.
#[derive(Debug, Clone)]
pub struct StaticProject {
    root: PathBuf,
    exclude: Vec<String>,
}

impl StaticProject {
    /// Create a handle with no exclude filters.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            exclude: Vec::new(),
        }
    }

    /// Create a handle with a fixed exclude-filter list.
    #[must_use]
    pub fn with_excludes(root: impl Into<PathBuf>, exclude: Vec<String>) -> Self {
        Self {
            root: root.into(),
            exclude,
        }
    }
}

impl ProjectHandle for StaticProject {
    fn root_path(&self) -> &Path {
        &self.root
    }

    fn exclude_filters(&self) -> Vec<String> {
        self.exclude.clone()
    }
}
