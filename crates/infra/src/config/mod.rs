//! Configuration loading
//!
//! This module loads [`ticketsync_domain::AppConfig`] from JSON or TOML
//! files.

pub mod loader;

// Re-export commonly used items
pub use loader::{load, load_from_file, probe_config_paths};
