//! Live project file index for code navigation tools.
//!
//! Maintains a directory to file-names map for one project root, populated by
//! filtered directory scans and kept current by file-system watch events.
//! Callers never block on a full re-scan: reloads can run on a background
//! worker and deliver their result through a serialized merge queue.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod index;

pub use config::Config;
pub use error::{Error, Result};
