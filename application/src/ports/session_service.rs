//! Session service port
//!
//! Defines the interface to the remote service that owns the authoritative
//! phase clock, question bank, penalties and survey results.

use async_trait::async_trait;
use huddle_domain::{
    CompletionStatus, Participant, Question, RemotePhase, SessionId, StudentId, SubmissionBatch,
};
use thiserror::Error;

/// Errors that can occur when talking to the session service
///
/// Every variant is a transport-level failure: callers degrade to local
/// state instead of surfacing it as a blocking error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Other error: {0}")]
    Other(String),
}

/// Service answer to a penalty request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PenaltyReceipt {
    /// `false` when the service already held a penalty for this question
    pub newly_applied: bool,
}

/// Remote session service
///
/// This port defines how the application layer reaches the session service.
/// Implementations (adapters) live in the infrastructure layer.
///
/// `apply_question_penalty` must be safe to call more than once for the same
/// question; callers do not pre-check.
#[async_trait]
pub trait SessionService: Send + Sync {
    /// Current phase and its authoritative end time
    async fn get_phase(&self, session: &SessionId) -> Result<RemotePhase, ServiceError>;

    /// Survey questions for a level (unvalidated)
    async fn get_questions(
        &self,
        level: &str,
        session: &SessionId,
    ) -> Result<Vec<Question>, ServiceError>;

    /// Members of the discussion group
    async fn get_participants(&self, session: &SessionId) -> Result<Vec<Participant>, ServiceError>;

    /// Start the remote timer for one question
    async fn start_question_timer(
        &self,
        session: &SessionId,
        question_index: usize,
    ) -> Result<(), ServiceError>;

    /// Whether the remote timer for a question has run out
    async fn check_question_timeout(
        &self,
        session: &SessionId,
        question_index: usize,
    ) -> Result<bool, ServiceError>;

    /// Register the timeout penalty for a question (idempotent)
    async fn apply_question_penalty(
        &self,
        session: &SessionId,
        question_index: usize,
        student: &StudentId,
    ) -> Result<PenaltyReceipt, ServiceError>;

    /// Send one question's rankings
    async fn submit_survey_batch(&self, batch: &SubmissionBatch) -> Result<(), ServiceError>;

    /// Survey completion across the group
    async fn get_completion_status(
        &self,
        session: &SessionId,
    ) -> Result<CompletionStatus, ServiceError>;
}
