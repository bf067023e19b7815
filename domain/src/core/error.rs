//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Identifier cannot be empty")]
    EmptyIdentifier,

    #[error("Unknown phase: {0}")]
    UnknownPhase(String),

    #[error("Invalid rank slot: {0} (expected 1, 2 or 3)")]
    InvalidRankSlot(u8),

    #[error("Question index {index} out of range (0..{len})")]
    QuestionIndexOutOfRange { index: usize, len: usize },
}
