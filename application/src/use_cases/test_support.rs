//! Shared mocks for use case tests

use crate::ports::notifier::SurveyNotifier;
use crate::ports::session_service::{PenaltyReceipt, ServiceError, SessionService};
use async_trait::async_trait;
use huddle_domain::{
    CompletionStatus, Participant, ParticipantId, PenaltyRecord, PhaseTransition, Question,
    RankingError, RemotePhase, SessionId, StudentId, SubmissionBatch,
};
use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

fn offline() -> ServiceError {
    ServiceError::Connection("offline".to_string())
}

/// Scriptable in-memory session service
///
/// Penalties are idempotent on the "server" side like the real service.
#[derive(Default)]
pub struct ScriptedService {
    pub phase: Option<RemotePhase>,
    pub questions: Option<Vec<Question>>,
    pub participants: Option<Vec<Participant>>,
    pub remote_timeouts: Mutex<HashSet<usize>>,
    pub penalties: Mutex<HashSet<(SessionId, usize)>>,
    pub penalty_calls: AtomicUsize,
    pub penalty_offline: AtomicBool,
    pub penalty_delay: Mutex<Option<Duration>>,
    pub submissions: Mutex<Vec<SubmissionBatch>>,
    pub failing_submissions: AtomicUsize,
    pub completion: Mutex<VecDeque<Result<CompletionStatus, ServiceError>>>,
    pub completion_calls: AtomicUsize,
    pub timer_starts: Mutex<Vec<usize>>,
}

impl ScriptedService {
    pub fn offline() -> Self {
        Self::default()
    }

    pub fn with_participants(mut self, ids: &[&str]) -> Self {
        self.participants = Some(
            ids.iter()
                .map(|id| Participant::new(ParticipantId::new(*id).unwrap(), id.to_uppercase()))
                .collect(),
        );
        self
    }

    pub fn with_questions(mut self, questions: Vec<Question>) -> Self {
        self.questions = Some(questions);
        self
    }

    pub fn with_completion(self, statuses: Vec<Result<CompletionStatus, ServiceError>>) -> Self {
        *self.completion.lock().unwrap() = statuses.into();
        self
    }

    pub fn time_out_remotely(&self, index: usize) {
        self.remote_timeouts.lock().unwrap().insert(index);
    }

    /// Make every penalty request take `delay` before it answers
    pub fn delay_penalties(&self, delay: Duration) {
        *self.penalty_delay.lock().unwrap() = Some(delay);
    }

    pub fn fail_next_submissions(&self, count: usize) {
        self.failing_submissions.store(count, Ordering::SeqCst);
    }

    pub fn penalty_count(&self) -> usize {
        self.penalties.lock().unwrap().len()
    }

    pub fn submitted(&self) -> Vec<SubmissionBatch> {
        self.submissions.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionService for ScriptedService {
    async fn get_phase(&self, _session: &SessionId) -> Result<RemotePhase, ServiceError> {
        self.phase.clone().ok_or_else(offline)
    }

    async fn get_questions(
        &self,
        _level: &str,
        _session: &SessionId,
    ) -> Result<Vec<Question>, ServiceError> {
        self.questions.clone().ok_or_else(offline)
    }

    async fn get_participants(&self, _session: &SessionId) -> Result<Vec<Participant>, ServiceError> {
        self.participants.clone().ok_or_else(offline)
    }

    async fn start_question_timer(
        &self,
        _session: &SessionId,
        question_index: usize,
    ) -> Result<(), ServiceError> {
        self.timer_starts.lock().unwrap().push(question_index);
        Ok(())
    }

    async fn check_question_timeout(
        &self,
        _session: &SessionId,
        question_index: usize,
    ) -> Result<bool, ServiceError> {
        Ok(self.remote_timeouts.lock().unwrap().contains(&question_index))
    }

    async fn apply_question_penalty(
        &self,
        session: &SessionId,
        question_index: usize,
        _student: &StudentId,
    ) -> Result<PenaltyReceipt, ServiceError> {
        self.penalty_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.penalty_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.penalty_offline.load(Ordering::SeqCst) {
            return Err(offline());
        }
        let newly_applied = self
            .penalties
            .lock()
            .unwrap()
            .insert((session.clone(), question_index));
        Ok(PenaltyReceipt { newly_applied })
    }

    async fn submit_survey_batch(&self, batch: &SubmissionBatch) -> Result<(), ServiceError> {
        let failing = self.failing_submissions.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_submissions.store(failing - 1, Ordering::SeqCst);
            return Err(ServiceError::Status {
                status: 503,
                message: "unavailable".to_string(),
            });
        }
        self.submissions.lock().unwrap().push(batch.clone());
        Ok(())
    }

    async fn get_completion_status(
        &self,
        _session: &SessionId,
    ) -> Result<CompletionStatus, ServiceError> {
        self.completion_calls.fetch_add(1, Ordering::SeqCst);
        let mut queue = self.completion.lock().unwrap();
        match queue.len() {
            0 => Err(offline()),
            1 => queue[0].clone(),
            _ => queue.pop_front().unwrap_or_else(|| Err(offline())),
        }
    }
}

/// Notifier that records what the student would have seen
#[derive(Default)]
pub struct RecordingNotifier {
    pub penalties: Mutex<Vec<PenaltyRecord>>,
    pub acknowledgements: Mutex<Vec<usize>>,
    pub rejections: Mutex<Vec<RankingError>>,
    pub confirmed: Mutex<Vec<(usize, bool, bool)>>,
    pub submission_failures: Mutex<Vec<usize>>,
    pub started: Mutex<Vec<usize>>,
    pub transitions: Mutex<Vec<PhaseTransition>>,
    pub progress: AtomicUsize,
    pub ready: AtomicUsize,
    pub fallback: AtomicBool,
}

impl RecordingNotifier {
    pub fn penalty_notices(&self) -> usize {
        self.penalties.lock().unwrap().len()
    }
}

impl SurveyNotifier for RecordingNotifier {
    fn on_phase_change(&self, transition: &PhaseTransition) {
        self.transitions.lock().unwrap().push(*transition);
    }

    fn on_questions_fallback(&self) {
        self.fallback.store(true, Ordering::SeqCst);
    }

    fn on_question_start(&self, index: usize, _total: usize, _question: &Question) {
        self.started.lock().unwrap().push(index);
    }

    fn on_penalty_applied(&self, record: &PenaltyRecord) {
        self.penalties.lock().unwrap().push(record.clone());
    }

    fn on_acknowledgement_required(&self, index: usize) {
        self.acknowledgements.lock().unwrap().push(index);
    }

    fn on_ranking_rejected(&self, error: &RankingError) {
        self.rejections.lock().unwrap().push(error.clone());
    }

    fn on_question_confirmed(&self, index: usize, complete: bool, skipped: bool) {
        self.confirmed.lock().unwrap().push((index, complete, skipped));
    }

    fn on_submission_failed(&self, index: usize, _error: &ServiceError) {
        self.submission_failures.lock().unwrap().push(index);
    }

    fn on_completion_progress(&self, _status: &CompletionStatus) {
        self.progress.fetch_add(1, Ordering::SeqCst);
    }

    fn on_results_ready(&self, _status: &CompletionStatus) {
        self.ready.fetch_add(1, Ordering::SeqCst);
    }
}
