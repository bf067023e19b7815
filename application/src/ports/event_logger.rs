//! Port for structured session event logging.
//!
//! Defines the [`SessionEventLogger`] trait for recording session events
//! (phase changes, penalties, submissions, completion) to a structured log.
//!
//! This is separate from `tracing`-based operation logs: tracing handles
//! human-readable diagnostics, while this port keeps a machine-readable
//! audit trail (JSONL) of what happened to the student's score.

use serde_json::Value;

/// A structured session event for logging.
pub struct SessionEvent {
    /// Event type identifier (e.g., "phase_change", "penalty_applied").
    pub event_type: &'static str,
    /// JSON payload with event-specific data.
    pub payload: Value,
}

impl SessionEvent {
    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }
}

/// Port for logging session events to a structured log.
///
/// The `log` method is synchronous and non-fallible so logging never
/// disrupts a running session; adapters report failures through `tracing`.
pub trait SessionEventLogger: Send + Sync {
    fn log(&self, event: SessionEvent);
}

/// No-op implementation for tests and when logging is disabled.
pub struct NoSessionEventLogger;

impl SessionEventLogger for NoSessionEventLogger {
    fn log(&self, _event: SessionEvent) {}
}
