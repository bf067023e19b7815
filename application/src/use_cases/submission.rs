//! Submission coordinator
//!
//! Sends one batch per confirmed question and remembers its delivery state.
//! A failed batch is kept so the student can retry it without re-ranking;
//! a batch that was delivered is never sent twice.

use crate::ports::event_logger::{SessionEvent, SessionEventLogger};
use crate::ports::notifier::SurveyNotifier;
use crate::ports::session_service::{ServiceError, SessionService};
use huddle_domain::{SubmissionBatch, SubmissionStatus};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Successful result of a submit request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Sent,
    /// Delivered earlier; nothing was sent
    AlreadySent,
}

/// Errors from [`SubmissionCoordinator::retry`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    #[error("No batch recorded for question {0}")]
    NothingToRetry(usize),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

pub struct SubmissionCoordinator<S: SessionService + ?Sized> {
    service: Arc<S>,
    notifier: Arc<dyn SurveyNotifier>,
    logger: Arc<dyn SessionEventLogger>,
    batches: BTreeMap<usize, (SubmissionBatch, SubmissionStatus)>,
}

impl<S: SessionService + ?Sized> SubmissionCoordinator<S> {
    pub fn new(
        service: Arc<S>,
        notifier: Arc<dyn SurveyNotifier>,
        logger: Arc<dyn SessionEventLogger>,
    ) -> Self {
        Self {
            service,
            notifier,
            logger,
            batches: BTreeMap::new(),
        }
    }

    /// Deliver a question's batch.
    ///
    /// On failure the batch stays recorded as [`SubmissionStatus::Failed`]
    /// and the student is told; the error is returned so the caller keeps
    /// the survey on that question.
    pub async fn submit(&mut self, batch: SubmissionBatch) -> Result<SubmitOutcome, ServiceError> {
        let index = batch.question_index;
        if self.status(index).is_some_and(|s| s.is_sent()) {
            return Ok(SubmitOutcome::AlreadySent);
        }
        self.batches
            .insert(index, (batch.clone(), SubmissionStatus::Pending));

        let result = self.service.submit_survey_batch(&batch).await;
        let status = match &result {
            Ok(()) => SubmissionStatus::Sent,
            Err(_) => SubmissionStatus::Failed,
        };
        if let Some(entry) = self.batches.get_mut(&index) {
            entry.1 = status;
        }

        match result {
            Ok(()) => {
                info!(
                    "Submitted rankings for question {} ({} choices{})",
                    index,
                    batch.rankings.len(),
                    if batch.is_final { ", final" } else { "" }
                );
                self.logger.log(SessionEvent::new(
                    "batch_submitted",
                    serde_json::json!({
                        "session_id": batch.session_id,
                        "question_index": index,
                        "question_id": batch.question_id,
                        "choices": batch.rankings.len(),
                        "is_final": batch.is_final,
                    }),
                ));
                Ok(SubmitOutcome::Sent)
            }
            Err(e) => {
                warn!("Submission for question {} failed: {}", index, e);
                self.notifier.on_submission_failed(index, &e);
                self.logger.log(SessionEvent::new(
                    "batch_failed",
                    serde_json::json!({
                        "session_id": batch.session_id,
                        "question_index": index,
                        "error": e.to_string(),
                    }),
                ));
                Err(e)
            }
        }
    }

    /// Resend a previously recorded batch
    pub async fn retry(&mut self, question_index: usize) -> Result<SubmitOutcome, SubmitError> {
        let batch = self
            .batches
            .get(&question_index)
            .map(|(batch, _)| batch.clone())
            .ok_or(SubmitError::NothingToRetry(question_index))?;
        Ok(self.submit(batch).await?)
    }

    pub fn status(&self, question_index: usize) -> Option<SubmissionStatus> {
        self.batches.get(&question_index).map(|(_, status)| *status)
    }

    /// Whether the last question's batch was delivered
    pub fn final_sent(&self) -> bool {
        self.batches
            .values()
            .any(|(batch, status)| batch.is_final && status.is_sent())
    }
}
