//! JSON file store for phase snapshots.
//!
//! Layout under the state directory:
//!
//! ```text
//! <state_dir>/
//!   active              id of the session this client last ran
//!   sessions/<id>.json  {"sessionId":…,"phase":…,"timeRemaining":…}
//! ```
//!
//! Each write goes to a temporary file first and is renamed into place, so
//! a crash mid-write leaves the previous snapshot intact.

use huddle_application::{SessionStateStore, StoreError};
use huddle_domain::{PersistedPhase, SessionId};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

const ACTIVE_FILE: &str = "active";
const SESSIONS_DIR: &str = "sessions";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSnapshot {
    session_id: SessionId,
    #[serde(flatten)]
    snapshot: PersistedPhase,
}

/// [`SessionStateStore`] backed by one JSON file per session
#[derive(Debug, Clone)]
pub struct JsonFileStateStore {
    root: PathBuf,
}

impl JsonFileStateStore {
    /// Store rooted at `root`; directories are created on first write
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Default state directory: `$XDG_DATA_HOME/huddle` (or platform equivalent)
    pub fn default_dir() -> Option<PathBuf> {
        dirs::data_local_dir().map(|d| d.join("huddle"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn session_path(&self, session: &SessionId) -> PathBuf {
        self.root
            .join(SESSIONS_DIR)
            .join(format!("{}.json", file_stem(session)))
    }

    fn active_path(&self) -> PathBuf {
        self.root.join(ACTIVE_FILE)
    }
}

/// Session ids are opaque; keep file names portable
fn file_stem(session: &SessionId) -> String {
    session
        .as_str()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn io_error(path: &Path, e: std::io::Error) -> StoreError {
    StoreError::Io(format!("{}: {}", path.display(), e))
}

fn read_optional(path: &Path) -> Result<Option<String>, StoreError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(io_error(path, e)),
    }
}

fn write_atomic(path: &Path, content: &str) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
    }
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, content).map_err(|e| io_error(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| io_error(path, e))
}

fn remove_optional(path: &Path) -> Result<(), StoreError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(io_error(path, e)),
    }
}

impl SessionStateStore for JsonFileStateStore {
    fn load(&self, session: &SessionId) -> Result<Option<PersistedPhase>, StoreError> {
        let path = self.session_path(session);
        let Some(content) = read_optional(&path)? else {
            return Ok(None);
        };
        let stored: StoredSnapshot =
            serde_json::from_str(&content).map_err(|e| StoreError::Corrupt {
                key: path.display().to_string(),
                message: e.to_string(),
            })?;
        if &stored.session_id != session {
            debug!(
                "Snapshot at {} belongs to {}, ignoring",
                path.display(),
                stored.session_id
            );
            return Ok(None);
        }
        Ok(Some(stored.snapshot))
    }

    fn save(&self, session: &SessionId, snapshot: &PersistedPhase) -> Result<(), StoreError> {
        let path = self.session_path(session);
        let stored = StoredSnapshot {
            session_id: session.clone(),
            snapshot: *snapshot,
        };
        let content = serde_json::to_string(&stored).map_err(|e| StoreError::Corrupt {
            key: path.display().to_string(),
            message: e.to_string(),
        })?;
        write_atomic(&path, &content)
    }

    fn clear(&self, session: &SessionId) -> Result<(), StoreError> {
        remove_optional(&self.session_path(session))?;
        if self.active_session()?.as_ref() == Some(session) {
            remove_optional(&self.active_path())?;
        }
        Ok(())
    }

    fn active_session(&self) -> Result<Option<SessionId>, StoreError> {
        let path = self.active_path();
        match read_optional(&path)? {
            None => Ok(None),
            Some(content) if content.trim().is_empty() => Ok(None),
            Some(content) => SessionId::new(content)
                .map(Some)
                .map_err(|e| StoreError::Corrupt {
                    key: path.display().to_string(),
                    message: e.to_string(),
                }),
        }
    }

    fn set_active_session(&self, session: &SessionId) -> Result<(), StoreError> {
        write_atomic(&self.active_path(), session.as_str())
    }
}
