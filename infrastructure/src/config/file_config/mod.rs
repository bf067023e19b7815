//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and converted to application types where
//! the application needs them.

mod logging;
mod server;
mod storage;
mod timing;

pub use logging::FileLoggingConfig;
pub use server::FileServerConfig;
pub use storage::FileStorageConfig;
pub use timing::FileTimingConfig;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity level of a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Fatal: the configuration cannot work at all.
    Error,
    /// Non-fatal: the configuration works but may not behave as expected.
    Warning,
}

/// A detected issue in the configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigIssue {
    pub severity: Severity,
    /// Dotted path of the offending key
    pub field: String,
    pub message: String,
}

impl ConfigIssue {
    pub fn new(severity: Severity, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Session service connection
    pub server: FileServerConfig,
    /// Countdowns, poll intervals and penalty size
    pub timing: FileTimingConfig,
    /// Local phase snapshots
    pub storage: FileStorageConfig,
    /// Session event log and diagnostic log files
    pub logging: FileLoggingConfig,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if self.server.base_url.trim().is_empty() {
            issues.push(ConfigIssue::new(
                Severity::Error,
                "server.base_url",
                "server.base_url cannot be empty",
            ));
        }
        if self.server.timeout_seconds == 0 {
            issues.push(ConfigIssue::new(
                Severity::Error,
                "server.timeout_seconds",
                "server.timeout_seconds cannot be 0",
            ));
        }

        issues.extend(self.timing.validate());

        if self.storage.ephemeral && self.storage.state_dir.is_some() {
            issues.push(ConfigIssue::new(
                Severity::Warning,
                "storage.state_dir",
                "storage.state_dir is ignored when storage.ephemeral is set",
            ));
        }

        issues
    }
}
