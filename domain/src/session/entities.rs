//! Session entities

use super::clock::{ClockState, PersistedPhase};
use super::phase::{Phase, PhaseDurations};
use crate::core::ids::{ParticipantId, SessionId};
use serde::{Deserialize, Serialize};

/// A group member that can be placed in a rank slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
}

impl Participant {
    pub fn new(id: ParticipantId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// Name to show, falling back to the id when the service sent none
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            self.id.as_str()
        } else {
            &self.name
        }
    }
}

/// A phase change produced by the countdown or an explicit advance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTransition {
    pub from: Phase,
    pub to: Phase,
}

/// Client-side view of a discussion session (Entity)
///
/// Holds the current phase and the locally derived countdown. The
/// authoritative end time lives on the service; this entity only mirrors it
/// through [`ClockState`].
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    phase: Phase,
    time_remaining: u64,
    durations: PhaseDurations,
}

impl Session {
    /// Fresh session in `prep` with the full preparation duration
    pub fn new(id: SessionId, durations: PhaseDurations) -> Self {
        Self {
            id,
            phase: Phase::Prep,
            time_remaining: durations.full_duration(Phase::Prep),
            durations,
        }
    }

    /// Session positioned at a reconciled clock state
    pub fn from_clock(id: SessionId, state: ClockState, durations: PhaseDurations) -> Self {
        Self {
            id,
            phase: state.phase,
            time_remaining: state.remaining_seconds,
            durations,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn time_remaining(&self) -> u64 {
        self.time_remaining
    }

    /// One second of local countdown.
    ///
    /// Returns the transition when the countdown of a timed phase runs out.
    /// Untimed phases ignore ticks.
    pub fn tick(&mut self) -> Option<PhaseTransition> {
        if !self.phase.is_timed() {
            return None;
        }
        if self.time_remaining > 1 {
            self.time_remaining -= 1;
            return None;
        }
        let next = self.phase.next()?;
        self.advance_to(next)
    }

    /// Move forward to `phase` with its full duration.
    ///
    /// Moving backwards or staying put is ignored.
    pub fn advance_to(&mut self, phase: Phase) -> Option<PhaseTransition> {
        if phase <= self.phase {
            return None;
        }
        let from = self.phase;
        self.phase = phase;
        self.time_remaining = self.durations.full_duration(phase);
        Some(PhaseTransition { from, to: phase })
    }

    pub fn snapshot(&self) -> PersistedPhase {
        PersistedPhase::new(self.phase, self.time_remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::clock::ClockSource;

    fn session() -> Session {
        Session::new(
            SessionId::new("sess1").unwrap(),
            PhaseDurations {
                prep_seconds: 3,
                discussion_seconds: 5,
            },
        )
    }

    #[test]
    fn test_new_session_starts_in_prep() {
        let s = session();
        assert_eq!(s.phase(), Phase::Prep);
        assert_eq!(s.time_remaining(), 3);
    }

    #[test]
    fn test_tick_counts_down_then_transitions() {
        let mut s = session();
        assert_eq!(s.tick(), None);
        assert_eq!(s.tick(), None);
        assert_eq!(s.time_remaining(), 1);

        let transition = s.tick().unwrap();
        assert_eq!(transition.from, Phase::Prep);
        assert_eq!(transition.to, Phase::Discussion);
        assert_eq!(s.time_remaining(), 5);
    }

    #[test]
    fn test_tick_at_zero_transitions_immediately() {
        let state = ClockState {
            phase: Phase::Discussion,
            remaining_seconds: 0,
            source: ClockSource::Remote,
        };
        let mut s = Session::from_clock(
            SessionId::new("sess1").unwrap(),
            state,
            PhaseDurations::default(),
        );
        let transition = s.tick().unwrap();
        assert_eq!(transition.to, Phase::Survey);
        assert_eq!(s.time_remaining(), 0);
        assert_eq!(s.tick(), None);
    }

    #[test]
    fn test_advance_never_goes_backwards() {
        let mut s = session();
        assert!(s.advance_to(Phase::Survey).is_some());
        assert!(s.advance_to(Phase::Discussion).is_none());
        assert!(s.advance_to(Phase::Survey).is_none());
        assert_eq!(s.snapshot(), PersistedPhase::new(Phase::Survey, 0));
    }

    #[test]
    fn test_participant_display_name_fallback() {
        let p = Participant::new(ParticipantId::new("p1").unwrap(), " ");
        assert_eq!(p.display_name(), "p1");
        let p = Participant::new(ParticipantId::new("p2").unwrap(), "Bob");
        assert_eq!(p.display_name(), "Bob");
    }
}
