//! Infrastructure layer for huddle
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, including configuration file loading.

pub mod config;
pub mod http;
pub mod logging;
pub mod store;

// Re-export commonly used types
pub use config::{
    ConfigIssue, ConfigLoader, FileConfig, FileLoggingConfig, FileServerConfig, FileStorageConfig,
    FileTimingConfig, Severity,
};
pub use http::{HttpServiceError, HttpSessionService};
pub use logging::JsonlSessionEventLogger;
pub use store::JsonFileStateStore;
