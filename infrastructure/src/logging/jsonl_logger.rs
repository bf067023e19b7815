//! JSONL audit trail for session events.
//!
//! Every record names the session it belongs to and carries a per-session
//! sequence number, so one file can hold several sessions and a resumed
//! session continues its numbering:
//!
//! ```text
//! {"seq":3,"timestamp":"…","type":"penalty_applied","session_id":"sess1","question_index":2,"points":0.5}
//! ```
//!
//! Payloads must be JSON objects with a string `session_id`; anything else
//! is rejected with a warning.

use huddle_application::{SessionEvent, SessionEventLogger};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::warn;

#[derive(Debug, Serialize)]
struct EventRecord<'a> {
    seq: u64,
    timestamp: String,
    #[serde(rename = "type")]
    event_type: &'a str,
    session_id: String,
    #[serde(flatten)]
    details: Map<String, Value>,
}

struct Trail {
    file: File,
    /// Last sequence number written per session
    sequences: HashMap<String, u64>,
}

/// Append-only session event log, one JSON object per line
pub struct JsonlSessionEventLogger {
    trail: Mutex<Trail>,
    path: PathBuf,
}

/// Highest `seq` per session already in the file
fn scan_sequences(path: &Path) -> HashMap<String, u64> {
    let mut sequences = HashMap::new();
    let Ok(file) = File::open(path) else {
        return sequences;
    };
    for line in BufReader::new(file).lines().map_while(Result::ok) {
        let Ok(record) = serde_json::from_str::<Value>(&line) else {
            continue;
        };
        if let (Some(session), Some(seq)) = (
            record.get("session_id").and_then(Value::as_str),
            record.get("seq").and_then(Value::as_u64),
        ) {
            let last = sequences.entry(session.to_string()).or_insert(0);
            *last = (*last).max(seq);
        }
    }
    sequences
}

impl JsonlSessionEventLogger {
    /// Open (or create) the log at the given path, creating parent
    /// directories. Returns `None` if the file cannot be opened.
    pub fn new(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            warn!(
                "Could not create event log directory {}: {}",
                parent.display(),
                e
            );
            return None;
        }

        let sequences = scan_sequences(path);
        let file = match OpenOptions::new().create(true).append(true).open(path) {
            Ok(f) => f,
            Err(e) => {
                warn!("Could not open event log file {}: {}", path.display(), e);
                return None;
            }
        };

        Some(Self {
            trail: Mutex::new(Trail { file, sequences }),
            path: path.to_path_buf(),
        })
    }

    fn trail(&self) -> MutexGuard<'_, Trail> {
        self.trail.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SessionEventLogger for JsonlSessionEventLogger {
    fn log(&self, event: SessionEvent) {
        let Value::Object(mut details) = event.payload else {
            warn!("Dropping {} event: payload is not an object", event.event_type);
            return;
        };
        let session_id = match details.remove("session_id") {
            Some(Value::String(id)) => id,
            _ => {
                warn!("Dropping {} event: no session_id", event.event_type);
                return;
            }
        };

        let mut trail = self.trail();
        let seq = trail.sequences.get(&session_id).copied().unwrap_or(0) + 1;
        let record = EventRecord {
            seq,
            timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            event_type: event.event_type,
            session_id,
            details,
        };
        let mut line = match serde_json::to_string(&record) {
            Ok(line) => line,
            Err(e) => {
                warn!("Could not encode {} event: {}", event.event_type, e);
                return;
            }
        };
        line.push('\n');

        // One write per record keeps lines whole; penalties must survive a crash
        match trail.file.write_all(line.as_bytes()).and_then(|()| trail.file.flush()) {
            Ok(()) => {
                trail.sequences.insert(record.session_id, seq);
            }
            Err(e) => warn!(
                "Could not write {} event to {}: {}",
                event.event_type,
                self.path.display(),
                e
            ),
        }
    }
}
