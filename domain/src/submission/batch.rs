//! Submission batches

use crate::core::error::DomainError;
use crate::core::ids::{SessionId, StudentId};
use crate::question::sequencer::QuestionOrder;
use crate::ranking::slot::{RankedChoice, RankingSelection};
use serde::{Deserialize, Serialize};

/// Rankings for one confirmed question (Value Object)
///
/// `is_final` is only set for the last question of the student's order; all
/// other batches are partial and the service aggregates them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionBatch {
    pub session_id: SessionId,
    pub student_id: StudentId,
    pub question_index: usize,
    pub question_id: String,
    pub rankings: Vec<RankedChoice>,
    pub is_partial: bool,
    pub is_final: bool,
}

impl SubmissionBatch {
    pub fn new(
        session_id: SessionId,
        student_id: StudentId,
        order: &QuestionOrder,
        question_index: usize,
        selection: &RankingSelection,
    ) -> Result<Self, DomainError> {
        let question_id = order
            .ids()
            .get(question_index)
            .cloned()
            .ok_or(DomainError::QuestionIndexOutOfRange {
                index: question_index,
                len: order.len(),
            })?;
        let is_final = order.is_last(question_index);

        Ok(Self {
            session_id,
            student_id,
            question_index,
            question_id,
            rankings: selection.choices(),
            is_partial: !is_final,
            is_final,
        })
    }

    /// Submitted without any ranking (penalized skip)
    pub fn is_empty(&self) -> bool {
        self.rankings.is_empty()
    }
}

/// Delivery state of a question's batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Pending,
    Sent,
    Failed,
}

impl SubmissionStatus {
    pub fn is_sent(&self) -> bool {
        matches!(self, SubmissionStatus::Sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ids::ParticipantId;
    use crate::question::entities::QuestionSet;
    use crate::ranking::board::RankingBoard;
    use crate::ranking::slot::RankSlot;
    use crate::session::entities::Participant;

    fn ids() -> (SessionId, StudentId) {
        (SessionId::new("sess1").unwrap(), StudentId::new("alice").unwrap())
    }

    #[test]
    fn test_only_last_batch_is_final() {
        let order = QuestionOrder::from_seed("alice-sess1", &QuestionSet::fallback());
        let (session, student) = ids();
        let empty = RankingSelection::default();

        let first = SubmissionBatch::new(session.clone(), student.clone(), &order, 0, &empty).unwrap();
        assert!(first.is_partial);
        assert!(!first.is_final);
        assert!(first.is_empty());

        let last = SubmissionBatch::new(session, student, &order, 2, &empty).unwrap();
        assert!(last.is_final);
        assert!(!last.is_partial);
        assert_eq!(last.question_id, order.ids()[2]);
    }

    #[test]
    fn test_out_of_range_index() {
        let order = QuestionOrder::from_seed("seed", &QuestionSet::fallback());
        let (session, student) = ids();
        let err = SubmissionBatch::new(session, student, &order, 3, &RankingSelection::default())
            .unwrap_err();
        assert_eq!(err, DomainError::QuestionIndexOutOfRange { index: 3, len: 3 });
    }

    #[test]
    fn test_batch_wire_format() {
        let order = QuestionOrder::from_seed("seed", &QuestionSet::fallback());
        let bob = ParticipantId::new("bob").unwrap();
        let mut board = RankingBoard::new(vec![Participant::new(bob.clone(), "Bob")], 3);
        board.select(RankSlot::First, bob).unwrap();
        let selection = board.viewing().unwrap().selection().clone();
        let (session, student) = ids();

        let batch = SubmissionBatch::new(session, student, &order, 0, &selection).unwrap();
        let json = serde_json::to_value(&batch).unwrap();
        assert_eq!(json["sessionId"], "sess1");
        assert_eq!(json["questionIndex"], 0);
        assert_eq!(json["rankings"][0]["rank"], 1);
        assert_eq!(json["rankings"][0]["participantId"], "bob");
        assert_eq!(json["isPartial"], true);
        assert_eq!(json["isFinal"], false);
    }
}
