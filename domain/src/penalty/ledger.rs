//! Penalty ledger
//!
//! Two signals (local countdown, remote timeout poll) may race to penalize
//! the same question. The ledger gives exactly one of them the right to call
//! the service and raise a notice:
//!
//! ```text
//! absent ──claim──► in-flight ──complete──► applied
//!                      │
//!                      └──abandon──► absent   (transport failure)
//! ```
//!
//! The ledger is only a fast-path cache; the service keeps the
//! authoritative record and is itself idempotent.

use crate::core::ids::SessionId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Flat deduction per timed-out or skipped question
pub const DEFAULT_PENALTY_POINTS: f64 = 0.5;

/// An applied penalty
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PenaltyRecord {
    pub session_id: SessionId,
    pub question_index: usize,
    pub points: f64,
}

/// Answer to a claim on a (session, question) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PenaltyClaim {
    /// Caller owns the penalty and must complete or abandon it
    Claimed,
    /// Another signal is applying it right now
    InFlight,
    /// Already recorded
    AlreadyApplied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entry {
    InFlight,
    Applied,
}

#[derive(Debug, Clone)]
pub struct PenaltyLedger {
    points: f64,
    entries: HashMap<(SessionId, usize), Entry>,
}

impl Default for PenaltyLedger {
    fn default() -> Self {
        Self::new(DEFAULT_PENALTY_POINTS)
    }
}

impl PenaltyLedger {
    pub fn new(points: f64) -> Self {
        Self {
            points,
            entries: HashMap::new(),
        }
    }

    pub fn points(&self) -> f64 {
        self.points
    }

    pub fn claim(&mut self, session: &SessionId, question_index: usize) -> PenaltyClaim {
        let key = (session.clone(), question_index);
        match self.entries.get(&key) {
            Some(Entry::Applied) => PenaltyClaim::AlreadyApplied,
            Some(Entry::InFlight) => PenaltyClaim::InFlight,
            None => {
                self.entries.insert(key, Entry::InFlight);
                PenaltyClaim::Claimed
            }
        }
    }

    /// Record the penalty as applied
    pub fn complete(&mut self, session: &SessionId, question_index: usize) -> PenaltyRecord {
        self.entries
            .insert((session.clone(), question_index), Entry::Applied);
        PenaltyRecord {
            session_id: session.clone(),
            question_index,
            points: self.points,
        }
    }

    /// Release an in-flight claim so a later signal can retry
    pub fn abandon(&mut self, session: &SessionId, question_index: usize) {
        let key = (session.clone(), question_index);
        if self.entries.get(&key) == Some(&Entry::InFlight) {
            self.entries.remove(&key);
        }
    }

    pub fn is_applied(&self, session: &SessionId, question_index: usize) -> bool {
        self.entries.get(&(session.clone(), question_index)) == Some(&Entry::Applied)
    }

    pub fn applied_count(&self, session: &SessionId) -> usize {
        self.entries
            .iter()
            .filter(|((s, _), e)| s == session && **e == Entry::Applied)
            .count()
    }

    /// Total deduction recorded for `session`
    pub fn total_points(&self, session: &SessionId) -> f64 {
        self.applied_count(session) as f64 * self.points
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sess(s: &str) -> SessionId {
        SessionId::new(s).unwrap()
    }

    #[test]
    fn test_claim_is_exclusive() {
        let mut ledger = PenaltyLedger::default();
        let s = sess("sess1");
        assert_eq!(ledger.claim(&s, 0), PenaltyClaim::Claimed);
        assert_eq!(ledger.claim(&s, 0), PenaltyClaim::InFlight);

        let record = ledger.complete(&s, 0);
        assert_eq!(record.points, DEFAULT_PENALTY_POINTS);
        assert_eq!(ledger.claim(&s, 0), PenaltyClaim::AlreadyApplied);
        assert!(ledger.is_applied(&s, 0));
    }

    #[test]
    fn test_abandon_allows_retry() {
        let mut ledger = PenaltyLedger::default();
        let s = sess("sess1");
        ledger.claim(&s, 1);
        ledger.abandon(&s, 1);
        assert_eq!(ledger.claim(&s, 1), PenaltyClaim::Claimed);
    }

    #[test]
    fn test_abandon_keeps_applied() {
        let mut ledger = PenaltyLedger::default();
        let s = sess("sess1");
        ledger.claim(&s, 1);
        ledger.complete(&s, 1);
        ledger.abandon(&s, 1);
        assert!(ledger.is_applied(&s, 1));
    }

    #[test]
    fn test_totals_are_per_session() {
        let mut ledger = PenaltyLedger::new(0.5);
        let a = sess("a");
        let b = sess("b");
        ledger.complete(&a, 0);
        ledger.complete(&a, 2);
        ledger.complete(&b, 0);
        ledger.claim(&a, 3);

        assert_eq!(ledger.applied_count(&a), 2);
        assert_eq!(ledger.total_points(&a), 1.0);
        assert_eq!(ledger.total_points(&b), 0.5);
    }
}
