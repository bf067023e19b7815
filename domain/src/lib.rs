//! Domain layer for huddle
//!
//! This crate contains the core business logic, entities, and value objects.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Session
//!
//! A timed group discussion moves through `prep → discussion → survey → done`.
//! The client mirrors the authoritative remote clock and falls back to its
//! own persisted snapshot when the service is unreachable
//! ([`session::clock::reconcile`]).
//!
//! ## Survey
//!
//! After the discussion every student ranks their peers (1st/2nd/3rd) for
//! each question:
//!
//! - **Question order**: per-student deterministic shuffle
//! - **Ranking board**: exclusive slots, confirm-once locking
//! - **Penalty ledger**: exactly one penalty per timed-out question
//! - **Completion**: results are ready once a quorum has finished

pub mod completion;
pub mod core;
pub mod penalty;
pub mod question;
pub mod ranking;
pub mod session;
pub mod submission;

// Re-export commonly used types
pub use completion::{CompletionStatus, QUORUM_MIN_PARTICIPANTS};
pub use core::{
    error::DomainError,
    ids::{ParticipantId, SessionId, StudentId},
};
pub use penalty::{DEFAULT_PENALTY_POINTS, PenaltyClaim, PenaltyLedger, PenaltyRecord};
pub use question::{Question, QuestionOrder, QuestionSet};
pub use ranking::{
    ConfirmOutcome, NextStep, QuestionRanking, RankSlot, RankedChoice, RankingBoard,
    RankingError, RankingSelection,
};
pub use session::{
    clock::{ClockSource, ClockState, PersistedPhase, RemotePhase, reconcile},
    entities::{Participant, PhaseTransition, Session},
    phase::{Phase, PhaseDurations},
};
pub use submission::{SubmissionBatch, SubmissionStatus};
