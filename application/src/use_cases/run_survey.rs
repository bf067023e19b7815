//! Run Survey use case
//!
//! Drives the ranking survey for one student:
//!
//! 1. Load the group and the question bank (fallback set when unusable)
//! 2. Order the questions with the student's seed
//! 3. For each question: start its timers, apply commands to the ranking
//!    board, penalize on timeout or skip, submit the batch, move on
//! 4. After the final batch, wait for the group to finish
//!
//! A question only moves forward once its batch was delivered. When the
//! submission fails the survey stays on that question; confirming it again
//! resends the recorded batch.

use crate::config::SessionTiming;
use crate::ports::event_logger::{NoSessionEventLogger, SessionEvent, SessionEventLogger};
use crate::ports::notifier::{NoSurveyNotifier, SurveyNotifier};
use crate::ports::session_service::SessionService;
use crate::use_cases::completion_monitor::CompletionMonitor;
use crate::use_cases::penalty_escalator::{PenaltyEscalator, QuestionEvent, QuestionTimers};
use crate::use_cases::submission::{SubmissionCoordinator, SubmitError};
use huddle_domain::{
    CompletionStatus, ConfirmOutcome, DomainError, NextStep, Participant, ParticipantId, Question,
    QuestionOrder, QuestionSet, RankSlot, RankingBoard, RankingError, RankingSelection, SessionId,
    StudentId, SubmissionBatch, SubmissionStatus,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Errors that end a survey run
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SurveyError {
    #[error("Survey cancelled")]
    Cancelled,

    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Student input while the survey is running
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurveyCommand {
    Select {
        slot: RankSlot,
        participant: ParticipantId,
    },
    Clear {
        slot: RankSlot,
    },
    Confirm {
        acknowledge_penalty: bool,
    },
    Back,
    GoTo(usize),
    /// Redisplay the viewed question
    Show,
    /// Leave the session (already confirmed)
    Leave,
}

/// How a survey run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurveyOutcome {
    /// Everyone finished; results are ready
    Completed(CompletionStatus),
    /// The student left before the group finished
    Left { question_index: usize },
}

/// Input for the RunSurvey use case
#[derive(Debug, Clone)]
pub struct RunSurveyInput {
    pub session_id: SessionId,
    pub student_id: StudentId,
    /// Student level used to filter the question bank
    pub level: String,
}

impl RunSurveyInput {
    pub fn new(session_id: SessionId, student_id: StudentId, level: impl Into<String>) -> Self {
        Self {
            session_id,
            student_id,
            level: level.into(),
        }
    }
}

/// Use case for running the ranking survey
pub struct RunSurveyUseCase<S: SessionService + 'static> {
    service: Arc<S>,
    timing: SessionTiming,
    notifier: Arc<dyn SurveyNotifier>,
    logger: Arc<dyn SessionEventLogger>,
}

impl<S: SessionService + 'static> RunSurveyUseCase<S> {
    pub fn new(service: Arc<S>, timing: SessionTiming) -> Self {
        Self {
            service,
            timing,
            notifier: Arc::new(NoSurveyNotifier),
            logger: Arc::new(NoSessionEventLogger),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn SurveyNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_event_logger(mut self, logger: Arc<dyn SessionEventLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Run the survey until the group finishes, the student leaves, or
    /// `cancel` fires.
    ///
    /// A closed command channel counts as leaving.
    pub async fn execute(
        &self,
        input: RunSurveyInput,
        commands: &mut mpsc::UnboundedReceiver<SurveyCommand>,
        cancel: &CancellationToken,
    ) -> Result<SurveyOutcome, SurveyError> {
        let candidates = self.load_candidates(&input).await;
        let questions = self.load_questions(&input).await;
        let order = QuestionOrder::generate(&input.student_id, &input.session_id, &questions);
        let ordered: Vec<Question> = order.resolve(&questions).into_iter().cloned().collect();

        info!(
            "Survey for {} in {}: {} questions, {} candidates (seed {})",
            input.student_id,
            input.session_id,
            ordered.len(),
            candidates.len(),
            order.seed()
        );

        self.notifier.on_survey_ready(&candidates, ordered.len());

        let escalator = PenaltyEscalator::new(
            Arc::clone(&self.service),
            input.session_id.clone(),
            input.student_id.clone(),
            &self.timing,
            Arc::clone(&self.notifier),
            Arc::clone(&self.logger),
        );
        let (events_tx, mut events) = mpsc::unbounded_channel();

        let mut run = SurveyRun {
            board: RankingBoard::new(candidates, order.len()),
            submissions: SubmissionCoordinator::new(
                Arc::clone(&self.service),
                Arc::clone(&self.notifier),
                Arc::clone(&self.logger),
            ),
            notifier: Arc::clone(&self.notifier),
            logger: Arc::clone(&self.logger),
            session_id: input.session_id.clone(),
            student_id: input.student_id.clone(),
            escalator,
            events_tx,
            timers: None,
            order,
            questions: ordered,
        };

        run.start_question(0).await;

        loop {
            let step = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    run.stop_timers();
                    return Err(SurveyError::Cancelled);
                }
                command = commands.recv() => match command {
                    Some(command) => run.handle_command(command).await?,
                    None => Step::Leave,
                },
                Some(event) = events.recv() => run.handle_event(event).await?,
            };

            match step {
                Step::Continue => {}
                Step::Leave => {
                    run.stop_timers();
                    let question_index = run.board.active_index();
                    info!("Student left the survey at question {}", question_index);
                    return Ok(SurveyOutcome::Left { question_index });
                }
                Step::AwaitQuorum => break,
            }
        }

        run.stop_timers();
        let monitor = CompletionMonitor::new(
            Arc::clone(&self.service),
            Arc::clone(&self.notifier),
            Arc::clone(&self.logger),
            self.timing.completion_poll_interval,
        );
        let wait = monitor.wait_until_ready(&input.session_id, cancel);
        tokio::pin!(wait);
        let mut penalty_retry = tokio::time::interval(self.timing.completion_poll_interval);
        penalty_retry.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                result = &mut wait => {
                    if run.escalator.has_pending() {
                        run.escalator.retry_pending().await;
                    }
                    return result.map(SurveyOutcome::Completed);
                }
                _ = penalty_retry.tick(), if run.escalator.has_pending() => {
                    let owed = run.escalator.retry_pending().await;
                    debug!("{} penalties still owed while waiting", owed);
                }
                command = commands.recv() => match command {
                    Some(SurveyCommand::Leave) | None => {
                        return Ok(SurveyOutcome::Left {
                            question_index: run.board.active_index(),
                        });
                    }
                    Some(SurveyCommand::Show) => run.show(),
                    Some(other) => debug!("Ignoring {:?} while waiting for the group", other),
                },
            }
        }
    }

    async fn load_candidates(&self, input: &RunSurveyInput) -> Vec<Participant> {
        match self.service.get_participants(&input.session_id).await {
            Ok(participants) => participants
                .into_iter()
                .filter(|p| !p.id.is_student(&input.student_id))
                .collect(),
            Err(e) => {
                warn!("Could not load participants, nothing to rank: {}", e);
                Vec::new()
            }
        }
    }

    async fn load_questions(&self, input: &RunSurveyInput) -> QuestionSet {
        let set = match self
            .service
            .get_questions(&input.level, &input.session_id)
            .await
        {
            Ok(questions) => QuestionSet::validated(questions, &input.level),
            Err(e) => {
                warn!("Could not load questions: {}", e);
                QuestionSet::fallback()
            }
        };
        if set.is_fallback() {
            warn!("Using the built-in question set");
            self.notifier.on_questions_fallback();
        }
        set
    }
}

enum Step {
    Continue,
    AwaitQuorum,
    Leave,
}

/// Mutable state of one survey run
struct SurveyRun<S: SessionService + 'static> {
    board: RankingBoard,
    submissions: SubmissionCoordinator<S>,
    escalator: PenaltyEscalator<S>,
    notifier: Arc<dyn SurveyNotifier>,
    logger: Arc<dyn SessionEventLogger>,
    session_id: SessionId,
    student_id: StudentId,
    events_tx: mpsc::UnboundedSender<QuestionEvent>,
    timers: Option<QuestionTimers>,
    order: QuestionOrder,
    questions: Vec<Question>,
}

impl<S: SessionService + 'static> SurveyRun<S> {
    async fn start_question(&mut self, index: usize) {
        self.stop_timers();
        if self.escalator.has_pending() {
            let owed = self.escalator.retry_pending().await;
            if owed > 0 {
                warn!("{} earlier penalties could not be applied yet", owed);
            }
        }
        if let Some(question) = self.questions.get(index) {
            self.notifier
                .on_question_start(index, self.questions.len(), question);
        }
        self.timers = Some(
            self.escalator
                .start_question(index, self.events_tx.clone())
                .await,
        );
    }

    fn stop_timers(&mut self) {
        if let Some(timers) = self.timers.take() {
            timers.cancel();
        }
    }

    fn show(&self) {
        if let Some(question) = self.board.viewing() {
            self.notifier.on_selection(
                self.board.viewing_index(),
                question.selection(),
                question.is_confirmed(),
            );
        }
    }

    async fn handle_command(&mut self, command: SurveyCommand) -> Result<Step, SurveyError> {
        match command {
            SurveyCommand::Select { slot, participant } => {
                let result = self.board.select(slot, participant);
                self.report(result);
            }
            SurveyCommand::Clear { slot } => {
                let result = self.board.clear(slot).map(|_| ());
                self.report(result);
            }
            SurveyCommand::Back => {
                let result = self.board.back();
                self.report(result);
            }
            SurveyCommand::GoTo(index) => {
                let result = self.board.go_to(index);
                self.report(result);
            }
            SurveyCommand::Show => self.show(),
            SurveyCommand::Leave => return Ok(Step::Leave),
            SurveyCommand::Confirm {
                acknowledge_penalty,
            } => match self.board.confirm(acknowledge_penalty) {
                Ok(ConfirmOutcome::NeedsAcknowledgement { index }) => {
                    self.notifier.on_acknowledgement_required(index);
                }
                Ok(ConfirmOutcome::Confirmed {
                    index,
                    selection,
                    skipped,
                    complete,
                }) => {
                    return self
                        .finish_question(index, &selection, skipped, complete)
                        .await;
                }
                Err(RankingError::AlreadyConfirmed { index })
                    if self.submissions.status(index) == Some(SubmissionStatus::Failed) =>
                {
                    return Ok(self.retry_submission(index).await);
                }
                Err(e) => self.notifier.on_ranking_rejected(&e),
            },
        }
        Ok(Step::Continue)
    }

    fn report(&self, result: Result<(), RankingError>) {
        match result {
            Ok(()) => self.show(),
            Err(e) => {
                debug!("Ranking rejected: {}", e);
                self.notifier.on_ranking_rejected(&e);
            }
        }
    }

    async fn handle_event(&mut self, event: QuestionEvent) -> Result<Step, SurveyError> {
        if event.index() != self.board.active_index() {
            debug!("Ignoring stale event for question {}", event.index());
            return Ok(Step::Continue);
        }

        match event {
            QuestionEvent::Tick {
                index,
                remaining_seconds,
            } => {
                self.notifier.on_question_tick(index, remaining_seconds);
                Ok(Step::Continue)
            }
            QuestionEvent::TimedOut { index, source } => {
                info!("Question {} timed out ({:?})", index, source);
                // The loop that reported the timeout has already tried;
                // a repeat is a no-op unless that attempt failed.
                self.escalator.apply(index).await;
                match self.board.confirm_on_timeout(index) {
                    Ok(ConfirmOutcome::Confirmed {
                        index,
                        selection,
                        skipped,
                        complete,
                    }) => {
                        self.finish_question_after_penalty(index, &selection, skipped, complete)
                            .await
                    }
                    Ok(ConfirmOutcome::NeedsAcknowledgement { .. }) => Ok(Step::Continue),
                    Err(e) => {
                        debug!("Timeout for question {} ignored: {}", index, e);
                        Ok(Step::Continue)
                    }
                }
            }
        }
    }

    /// Penalize a skipped question, then submit and move on
    async fn finish_question(
        &mut self,
        index: usize,
        selection: &RankingSelection,
        skipped: bool,
        complete: bool,
    ) -> Result<Step, SurveyError> {
        if skipped {
            self.escalator.apply(index).await;
        }
        self.finish_question_after_penalty(index, selection, skipped, complete)
            .await
    }

    async fn finish_question_after_penalty(
        &mut self,
        index: usize,
        selection: &RankingSelection,
        skipped: bool,
        complete: bool,
    ) -> Result<Step, SurveyError> {
        self.stop_timers();
        self.notifier.on_question_confirmed(index, complete, skipped);
        self.logger.log(SessionEvent::new(
            "question_confirmed",
            serde_json::json!({
                "session_id": self.session_id,
                "question_index": index,
                "choices": selection.count(),
                "skipped": skipped,
                "complete": complete,
            }),
        ));

        let batch = SubmissionBatch::new(
            self.session_id.clone(),
            self.student_id.clone(),
            &self.order,
            index,
            selection,
        )?;
        match self.submissions.submit(batch).await {
            Ok(_) => Ok(self.advance().await),
            Err(_) => Ok(Step::Continue),
        }
    }

    async fn retry_submission(&mut self, index: usize) -> Step {
        info!("Retrying submission for question {}", index);
        match self.submissions.retry(index).await {
            Ok(_) => self.advance().await,
            Err(SubmitError::NothingToRetry(index)) => {
                debug!("No batch recorded for question {}", index);
                Step::Continue
            }
            Err(SubmitError::Service(_)) => Step::Continue,
        }
    }

    async fn advance(&mut self) -> Step {
        match self.board.advance() {
            Some(NextStep::Question(next)) => {
                self.start_question(next).await;
                Step::Continue
            }
            Some(NextStep::AwaitQuorum)
                if self.board.all_confirmed() && self.submissions.final_sent() =>
            {
                info!("All questions submitted, waiting for the group");
                Step::AwaitQuorum
            }
            Some(NextStep::AwaitQuorum) => {
                warn!("Final batch not delivered yet, staying on the last question");
                Step::Continue
            }
            None => Step::Continue,
        }
    }
}
