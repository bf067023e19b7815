//! Local state configuration from TOML (`[storage]` section)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw storage configuration from TOML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileStorageConfig {
    /// Directory for phase snapshots (default: platform data dir)
    pub state_dir: Option<PathBuf>,
    /// Keep state in memory only; nothing survives a restart
    pub ephemeral: bool,
}
