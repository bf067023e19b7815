//! Completion status and the quorum rule

use serde::{Deserialize, Serialize};

/// Participants required before a session can count as complete
pub const QUORUM_MIN_PARTICIPANTS: u32 = 2;

/// Survey completion across the group (Value Object)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionStatus {
    pub completed: u32,
    pub total: u32,
    pub all_completed: bool,
}

impl CompletionStatus {
    pub fn new(completed: u32, total: u32, all_completed: bool) -> Self {
        Self {
            completed,
            total,
            all_completed,
        }
    }

    /// Results are ready only with a quorum and everyone finished
    pub fn is_ready(&self) -> bool {
        self.total >= QUORUM_MIN_PARTICIPANTS && self.all_completed
    }

    /// Fewer participants than the quorum have joined so far
    pub fn is_gathering(&self) -> bool {
        self.total < QUORUM_MIN_PARTICIPANTS
    }

    pub fn outstanding(&self) -> u32 {
        self.total.saturating_sub(self.completed)
    }
}
