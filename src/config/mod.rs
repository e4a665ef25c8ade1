//! Configuration management for fileindex.
//!
//! The owning daemon builds a [`Config`] from its own configuration surface
//! (CLI, environment, files); this crate only validates and consumes it.

mod settings;

pub use settings::Config;
