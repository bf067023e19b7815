//! Configuration file loading for huddle
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `HUDDLE_*` environment variables
//! 2. `--config <path>` specified file
//! 3. Project root: `./huddle.toml` or `./.huddle.toml`
//! 4. Global: `$XDG_CONFIG_HOME/huddle/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigIssue, FileConfig, FileLoggingConfig, FileServerConfig, FileStorageConfig,
    FileTimingConfig, Severity,
};
pub use loader::ConfigLoader;
