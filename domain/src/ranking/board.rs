//! Ranking selection engine
//!
//! One [`QuestionRanking`] per question in the student's order, each moving
//! `unconfirmed → confirmed` exactly once.
//!
//! ```text
//!            select / clear
//!              ┌──────┐
//!              ▼      │
//!        ┌─────────────┐  confirm(ack)   ┌───────────┐
//!  ────► │ Unconfirmed │ ──────────────► │ Confirmed │ (writes rejected)
//!        └─────────────┘                 └───────────┘
//!              │ confirm, nothing selected, no ack
//!              ▼
//!       NeedsAcknowledgement (state unchanged)
//! ```
//!
//! Invariant violations (duplicate placement, writes after confirmation) are
//! rejected here with a [`RankingError`] and never reach the transport.

use super::slot::{RankSlot, RankingSelection};
use crate::core::ids::ParticipantId;
use crate::session::entities::Participant;
use thiserror::Error;

/// Rejected ranking operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RankingError {
    #[error("{slot} place is already taken; clear it first")]
    SlotOccupied { slot: RankSlot },

    #[error("{participant} is already ranked {slot}")]
    ParticipantAlreadyRanked {
        participant: ParticipantId,
        slot: RankSlot,
    },

    #[error("{0} is not a participant of this session")]
    UnknownParticipant(ParticipantId),

    #[error("Question {index} is confirmed and can no longer be changed")]
    QuestionLocked { index: usize },

    #[error("Question {index} was already confirmed")]
    AlreadyConfirmed { index: usize },

    #[error("Question {index} is not available yet")]
    NotReachable { index: usize },
}

/// What the survey should do after a question is confirmed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStep {
    /// Move on to this question index
    Question(usize),
    /// Last question done; wait for the rest of the group
    AwaitQuorum,
}

/// Result of a confirm request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// Nothing selected; the student must accept the penalty to proceed
    NeedsAcknowledgement { index: usize },
    /// Question locked
    Confirmed {
        index: usize,
        selection: RankingSelection,
        /// Confirmed with nothing selected (penalized exit)
        skipped: bool,
        /// Every available slot was filled
        complete: bool,
    },
}

/// Ranking state of one question
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionRanking {
    selection: RankingSelection,
    confirmed: bool,
}

impl QuestionRanking {
    pub fn selection(&self) -> &RankingSelection {
        &self.selection
    }

    pub fn is_confirmed(&self) -> bool {
        self.confirmed
    }
}

/// Per-survey ranking engine (Entity)
///
/// Writes always target the question being viewed. The active question is
/// the first unconfirmed one; earlier questions can be viewed for review but
/// not edited, later ones cannot be reached.
#[derive(Debug, Clone)]
pub struct RankingBoard {
    candidates: Vec<Participant>,
    questions: Vec<QuestionRanking>,
    active: usize,
    viewing: usize,
}

impl RankingBoard {
    /// Create a board for `question_count` questions.
    ///
    /// `candidates` must already exclude the ranking student.
    pub fn new(candidates: Vec<Participant>, question_count: usize) -> Self {
        Self {
            candidates,
            questions: vec![QuestionRanking::default(); question_count],
            active: 0,
            viewing: 0,
        }
    }

    pub fn candidates(&self) -> &[Participant] {
        &self.candidates
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn viewing_index(&self) -> usize {
        self.viewing
    }

    pub fn question(&self, index: usize) -> Option<&QuestionRanking> {
        self.questions.get(index)
    }

    pub fn viewing(&self) -> Option<&QuestionRanking> {
        self.questions.get(self.viewing)
    }

    /// Slots a complete answer fills: three, or fewer in a small group
    pub fn required_slots(&self) -> usize {
        self.candidates.len().min(RankSlot::ALL.len())
    }

    pub fn all_confirmed(&self) -> bool {
        self.questions.iter().all(|q| q.confirmed)
    }

    /// Place `participant` in `slot` on the viewed question
    pub fn select(&mut self, slot: RankSlot, participant: ParticipantId) -> Result<(), RankingError> {
        if !self.candidates.iter().any(|c| c.id == participant) {
            return Err(RankingError::UnknownParticipant(participant));
        }
        let index = self.viewing;
        let question = self.writable(index)?;

        if question.selection.get(slot).is_some() {
            return Err(RankingError::SlotOccupied { slot });
        }
        if let Some(existing) = question.selection.slot_of(&participant) {
            return Err(RankingError::ParticipantAlreadyRanked {
                participant,
                slot: existing,
            });
        }
        question.selection.set(slot, participant);
        Ok(())
    }

    /// Empty `slot` on the viewed question. Clearing an empty slot is a no-op.
    pub fn clear(&mut self, slot: RankSlot) -> Result<Option<ParticipantId>, RankingError> {
        let index = self.viewing;
        let question = self.writable(index)?;
        Ok(question.selection.take(slot))
    }

    /// Confirm the viewed question.
    ///
    /// With nothing selected and no acknowledgement the question stays open
    /// and [`ConfirmOutcome::NeedsAcknowledgement`] is returned. A board
    /// without candidates has nothing to select and confirms freely.
    pub fn confirm(&mut self, acknowledge_penalty: bool) -> Result<ConfirmOutcome, RankingError> {
        let index = self.viewing;
        let question = self
            .questions
            .get(index)
            .ok_or(RankingError::NotReachable { index })?;
        if question.confirmed {
            return Err(RankingError::AlreadyConfirmed { index });
        }
        if question.selection.is_empty() && self.required_slots() > 0 && !acknowledge_penalty {
            return Ok(ConfirmOutcome::NeedsAcknowledgement { index });
        }
        Ok(self.lock(index))
    }

    /// Confirm the active question because its time ran out.
    ///
    /// Whatever is selected is kept; an empty selection counts as skipped.
    pub fn confirm_on_timeout(&mut self, index: usize) -> Result<ConfirmOutcome, RankingError> {
        if index != self.active {
            return Err(RankingError::NotReachable { index });
        }
        match self.questions.get(index) {
            None => Err(RankingError::NotReachable { index }),
            Some(q) if q.confirmed => Err(RankingError::AlreadyConfirmed { index }),
            Some(_) => {
                self.viewing = index;
                Ok(self.lock(index))
            }
        }
    }

    /// Move past a confirmed active question
    pub fn advance(&mut self) -> Option<NextStep> {
        let current = self.questions.get(self.active)?;
        if !current.confirmed {
            return None;
        }
        if self.active + 1 >= self.questions.len() {
            self.viewing = self.active;
            return Some(NextStep::AwaitQuorum);
        }
        self.active += 1;
        self.viewing = self.active;
        Some(NextStep::Question(self.active))
    }

    /// View an earlier question for review, or return to the active one
    pub fn go_to(&mut self, index: usize) -> Result<(), RankingError> {
        if index > self.active || index >= self.questions.len() {
            return Err(RankingError::NotReachable { index });
        }
        self.viewing = index;
        Ok(())
    }

    pub fn back(&mut self) -> Result<(), RankingError> {
        match self.viewing.checked_sub(1) {
            Some(index) => self.go_to(index),
            None => Err(RankingError::NotReachable { index: 0 }),
        }
    }

    fn writable(&mut self, index: usize) -> Result<&mut QuestionRanking, RankingError> {
        let question = self
            .questions
            .get_mut(index)
            .ok_or(RankingError::NotReachable { index })?;
        if question.confirmed {
            return Err(RankingError::QuestionLocked { index });
        }
        Ok(question)
    }

    fn lock(&mut self, index: usize) -> ConfirmOutcome {
        let required = self.required_slots();
        let question = &mut self.questions[index];
        question.confirmed = true;
        let selection = question.selection.clone();
        ConfirmOutcome::Confirmed {
            index,
            skipped: selection.is_empty() && required > 0,
            complete: selection.count() >= required,
            selection,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn pid(s: &str) -> ParticipantId {
        ParticipantId::new(s).unwrap()
    }

    fn board(questions: usize) -> RankingBoard {
        let candidates = ["bob", "carol", "dave", "erin"]
            .iter()
            .map(|id| Participant::new(pid(id), id.to_uppercase()))
            .collect();
        RankingBoard::new(candidates, questions)
    }

    #[test]
    fn test_select_and_clear() {
        let mut b = board(2);
        b.select(RankSlot::First, pid("bob")).unwrap();
        assert_eq!(b.viewing().unwrap().selection().get(RankSlot::First), Some(&pid("bob")));

        assert_eq!(b.clear(RankSlot::First).unwrap(), Some(pid("bob")));
        assert_eq!(b.clear(RankSlot::First).unwrap(), None);
    }

    #[test]
    fn test_occupied_slot_rejected() {
        let mut b = board(1);
        b.select(RankSlot::First, pid("bob")).unwrap();
        let err = b.select(RankSlot::First, pid("carol")).unwrap_err();
        assert_eq!(err, RankingError::SlotOccupied { slot: RankSlot::First });
    }

    #[test]
    fn test_participant_in_two_slots_rejected() {
        let mut b = board(1);
        b.select(RankSlot::First, pid("bob")).unwrap();
        let err = b.select(RankSlot::Second, pid("bob")).unwrap_err();
        assert_eq!(
            err,
            RankingError::ParticipantAlreadyRanked {
                participant: pid("bob"),
                slot: RankSlot::First
            }
        );
    }

    #[test]
    fn test_unknown_participant_rejected() {
        let mut b = board(1);
        assert!(matches!(
            b.select(RankSlot::First, pid("mallory")),
            Err(RankingError::UnknownParticipant(_))
        ));
    }

    #[test]
    fn test_invariant_holds_after_arbitrary_operations() {
        let mut b = board(1);
        let ids = ["bob", "carol", "dave", "erin"];
        let mut state: u32 = 0x2545_f491;
        for _ in 0..500 {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            let slot = RankSlot::ALL[(state % 3) as usize];
            if state % 4 == 0 {
                let _ = b.clear(slot);
            } else {
                let who = ids[((state >> 8) % 4) as usize];
                let _ = b.select(slot, pid(who));
            }

            let selection = b.viewing().unwrap().selection();
            let placed: Vec<_> = selection.choices().into_iter().map(|c| c.participant_id).collect();
            let unique: HashSet<_> = placed.iter().collect();
            assert_eq!(placed.len(), unique.len());
            assert!(placed.len() <= 3);
        }
    }

    #[test]
    fn test_confirm_empty_needs_acknowledgement() {
        let mut b = board(2);
        assert_eq!(
            b.confirm(false).unwrap(),
            ConfirmOutcome::NeedsAcknowledgement { index: 0 }
        );
        assert!(!b.question(0).unwrap().is_confirmed());

        match b.confirm(true).unwrap() {
            ConfirmOutcome::Confirmed { skipped, complete, .. } => {
                assert!(skipped);
                assert!(!complete);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_confirm_twice_has_no_effect() {
        let mut b = board(2);
        b.select(RankSlot::First, pid("bob")).unwrap();
        b.confirm(false).unwrap();
        let before = b.question(0).unwrap().clone();

        assert_eq!(b.confirm(false), Err(RankingError::AlreadyConfirmed { index: 0 }));
        assert_eq!(
            b.select(RankSlot::Second, pid("carol")),
            Err(RankingError::QuestionLocked { index: 0 })
        );
        assert_eq!(b.clear(RankSlot::First), Err(RankingError::QuestionLocked { index: 0 }));
        assert_eq!(b.question(0).unwrap(), &before);
    }

    #[test]
    fn test_complete_when_required_slots_filled() {
        let mut b = RankingBoard::new(vec![Participant::new(pid("bob"), "Bob")], 1);
        assert_eq!(b.required_slots(), 1);
        b.select(RankSlot::First, pid("bob")).unwrap();
        match b.confirm(false).unwrap() {
            ConfirmOutcome::Confirmed { complete, skipped, .. } => {
                assert!(complete);
                assert!(!skipped);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_no_candidates_confirms_without_penalty() {
        let mut b = RankingBoard::new(vec![], 1);
        match b.confirm(false).unwrap() {
            ConfirmOutcome::Confirmed { skipped, complete, .. } => {
                assert!(!skipped);
                assert!(complete);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_advance_and_quorum_wait() {
        let mut b = board(2);
        assert_eq!(b.advance(), None);
        b.confirm(true).unwrap();
        assert_eq!(b.advance(), Some(NextStep::Question(1)));
        assert_eq!(b.viewing_index(), 1);
        b.confirm(true).unwrap();
        assert_eq!(b.advance(), Some(NextStep::AwaitQuorum));
        assert!(b.all_confirmed());
    }

    #[test]
    fn test_review_navigation_is_read_only() {
        let mut b = board(3);
        b.select(RankSlot::First, pid("bob")).unwrap();
        b.confirm(false).unwrap();
        b.advance();

        assert_eq!(b.go_to(2), Err(RankingError::NotReachable { index: 2 }));
        b.back().unwrap();
        assert_eq!(b.viewing_index(), 0);
        assert_eq!(
            b.select(RankSlot::Second, pid("carol")),
            Err(RankingError::QuestionLocked { index: 0 })
        );
        assert!(b.back().is_err());

        b.go_to(1).unwrap();
        b.select(RankSlot::Second, pid("carol")).unwrap();
    }

    #[test]
    fn test_timeout_confirms_active_with_existing_selection() {
        let mut b = board(2);
        b.select(RankSlot::Second, pid("dave")).unwrap();
        match b.confirm_on_timeout(0).unwrap() {
            ConfirmOutcome::Confirmed { selection, skipped, .. } => {
                assert!(!skipped);
                assert_eq!(selection.get(RankSlot::Second), Some(&pid("dave")));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(
            b.confirm_on_timeout(0),
            Err(RankingError::AlreadyConfirmed { index: 0 })
        );
        assert_eq!(b.confirm_on_timeout(1), Err(RankingError::NotReachable { index: 1 }));
    }
}
