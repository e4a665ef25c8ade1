//! Live project file index.
//!
//! This module provides:
//! - Filtered recursive directory scanning, inline or on a background worker
//! - A directory to file-names map guarded by a single lock
//! - Reconciliation of that map against watch add/remove notifications
//! - Lifecycle-safe delivery of background scan results into the map's owner

mod events;
mod files;
mod filter;
mod project;
mod reload;
mod scanner;
mod watcher;

pub use events::WatchEvent;
pub use files::{FileIndex, IndexPhase};
pub use filter::{Classification, PathClassifier, PatternClassifier};
pub use project::{ProjectHandle, StaticProject};
pub use reload::{ReloadController, ReloadMode, ScanResult};
pub use scanner::{scan, scan_async, walk, Visit};
pub use watcher::{pump_events, NotifyWatcher, WatchSubscription};
