//! Phase clock reconciliation
//!
//! The phase can come from two places: the session service (authoritative
//! end time) or the local store (last persisted snapshot). [`reconcile`] is
//! the single place that decides which one wins.
//!
//! ```text
//! remote reachable ──► remote phase, remaining = ceil(end_time - now)
//!        │ no
//!        ▼
//! local snapshot for this session ──► persisted phase / time remaining
//!        │ none
//!        ▼
//! prep with full duration
//! ```

use super::phase::{Phase, PhaseDurations};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Phase as reported by the session service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePhase {
    pub phase: Phase,
    /// Authoritative end of the current phase, when the service tracks one
    pub end_time: Option<DateTime<Utc>>,
}

impl RemotePhase {
    pub fn new(phase: Phase, end_time: Option<DateTime<Utc>>) -> Self {
        Self { phase, end_time }
    }

    /// Whole seconds left until `end_time`, rounded up and never negative
    pub fn remaining_at(&self, now: DateTime<Utc>) -> Option<u64> {
        self.end_time.map(|end| {
            let millis = (end - now).num_milliseconds();
            if millis <= 0 {
                0
            } else {
                (millis as u64).div_ceil(1000)
            }
        })
    }
}

/// Snapshot written to the local store on every clock mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedPhase {
    pub phase: Phase,
    pub time_remaining: u64,
}

impl PersistedPhase {
    pub fn new(phase: Phase, time_remaining: u64) -> Self {
        Self {
            phase,
            time_remaining,
        }
    }
}

/// Where the reconciled clock state came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockSource {
    Remote,
    Local,
    Default,
}

/// Authoritative clock state after reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockState {
    pub phase: Phase,
    pub remaining_seconds: u64,
    pub source: ClockSource,
}

/// Decide the clock state from remote and local sources.
///
/// Remote wins whenever it was reachable. A remote timed phase without an
/// end time keeps the local countdown if the local snapshot is in the same
/// phase, otherwise it starts from the full duration. Untimed phases always
/// carry zero remaining seconds.
pub fn reconcile(
    remote: Option<&RemotePhase>,
    local: Option<&PersistedPhase>,
    now: DateTime<Utc>,
    durations: &PhaseDurations,
) -> ClockState {
    if let Some(remote) = remote {
        let remaining = if remote.phase.is_timed() {
            remote
                .remaining_at(now)
                .or_else(|| {
                    local
                        .filter(|l| l.phase == remote.phase)
                        .map(|l| l.time_remaining)
                })
                .unwrap_or_else(|| durations.full_duration(remote.phase))
        } else {
            0
        };
        return ClockState {
            phase: remote.phase,
            remaining_seconds: remaining,
            source: ClockSource::Remote,
        };
    }

    if let Some(local) = local {
        let remaining = if local.phase.is_timed() {
            local.time_remaining
        } else {
            0
        };
        return ClockState {
            phase: local.phase,
            remaining_seconds: remaining,
            source: ClockSource::Local,
        };
    }

    ClockState {
        phase: Phase::Prep,
        remaining_seconds: durations.full_duration(Phase::Prep),
        source: ClockSource::Default,
    }
}
