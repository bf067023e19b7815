//! Run Session use case
//!
//! Orchestrates a whole session for one student: enter (or resume) the
//! phase clock, count down preparation and discussion, run the survey, then
//! close the session once the group has finished.

use crate::config::SessionTiming;
use crate::ports::event_logger::{NoSessionEventLogger, SessionEvent, SessionEventLogger};
use crate::ports::notifier::{NoSurveyNotifier, SurveyNotifier};
use crate::ports::session_service::SessionService;
use crate::ports::state_store::SessionStateStore;
use crate::use_cases::completion_monitor::CompletionMonitor;
use crate::use_cases::phase_clock::{ClockEvent, PhaseClock};
use crate::use_cases::run_survey::{
    RunSurveyInput, RunSurveyUseCase, SurveyCommand, SurveyError, SurveyOutcome,
};
use huddle_domain::{CompletionStatus, Phase, PhaseTransition};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// How a session run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Group finished; local state was cleared
    Completed(CompletionStatus),
    /// Student left; local state is kept so a restart resumes
    Left { phase: Phase },
}

/// Use case for running a full session
pub struct RunSessionUseCase<S: SessionService + 'static, T: SessionStateStore + 'static> {
    service: Arc<S>,
    store: Arc<T>,
    timing: SessionTiming,
    notifier: Arc<dyn SurveyNotifier>,
    logger: Arc<dyn SessionEventLogger>,
}

impl<S: SessionService + 'static, T: SessionStateStore + 'static> RunSessionUseCase<S, T> {
    pub fn new(service: Arc<S>, store: Arc<T>, timing: SessionTiming) -> Self {
        Self {
            service,
            store,
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

    pub async fn execute(
        &self,
        input: RunSurveyInput,
        commands: &mut mpsc::UnboundedReceiver<SurveyCommand>,
        cancel: &CancellationToken,
    ) -> Result<SessionOutcome, SurveyError> {
        let clock = PhaseClock::enter(
            self.service.as_ref(),
            Arc::clone(&self.store),
            input.session_id.clone(),
            self.timing.phases,
        )
        .await;
        let restored = clock.restored();
        self.notifier.on_clock_restored(&restored);
        self.logger.log(SessionEvent::new(
            "session_entered",
            serde_json::json!({
                "session_id": input.session_id,
                "student_id": input.student_id,
                "phase": restored.phase.as_str(),
                "remaining_seconds": restored.remaining_seconds,
                "source": format!("{:?}", restored.source),
            }),
        ));

        if restored.phase.is_timed() {
            if let Some(outcome) = self.count_down(&clock, commands, cancel).await? {
                return Ok(outcome);
            }
        }

        let status = if clock.phase().is_terminal() {
            info!("Session {} already closed, fetching results", input.session_id);
            CompletionMonitor::new(
                Arc::clone(&self.service),
                Arc::clone(&self.notifier),
                Arc::clone(&self.logger),
                self.timing.completion_poll_interval,
            )
            .wait_until_ready(&input.session_id, cancel)
            .await?
        } else {
            let survey = RunSurveyUseCase::new(Arc::clone(&self.service), self.timing.clone())
                .with_notifier(Arc::clone(&self.notifier))
                .with_event_logger(Arc::clone(&self.logger));
            match survey.execute(input, commands, cancel).await? {
                SurveyOutcome::Completed(status) => status,
                SurveyOutcome::Left { .. } => {
                    return Ok(SessionOutcome::Left {
                        phase: clock.phase(),
                    });
                }
            }
        };

        if let Some(transition) = clock.advance_to(Phase::Done) {
            self.report_transition(&clock, &transition);
        }
        clock.finish();
        Ok(SessionOutcome::Completed(status))
    }

    /// Run the local countdown until the survey opens.
    ///
    /// Returns an outcome only when the student left early.
    async fn count_down(
        &self,
        clock: &PhaseClock<T>,
        commands: &mut mpsc::UnboundedReceiver<SurveyCommand>,
        cancel: &CancellationToken,
    ) -> Result<Option<SessionOutcome>, SurveyError> {
        let (tx, mut events) = mpsc::unbounded_channel();
        let countdown = clock.start(tx);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    countdown.cancel();
                    return Err(SurveyError::Cancelled);
                }
                command = commands.recv() => match command {
                    Some(SurveyCommand::Leave) | None => {
                        countdown.cancel();
                        let phase = clock.phase();
                        info!("Student left during {}", phase);
                        return Ok(Some(SessionOutcome::Left { phase }));
                    }
                    Some(other) => debug!("Ignoring {:?} before the survey", other),
                },
                event = events.recv() => match event {
                    Some(ClockEvent::Tick { phase, remaining_seconds }) => {
                        self.notifier.on_clock_tick(phase, remaining_seconds);
                    }
                    Some(ClockEvent::PhaseComplete(transition)) => {
                        self.report_transition(clock, &transition);
                        if !transition.to.is_timed() {
                            countdown.cancel();
                            return Ok(None);
                        }
                    }
                    // Countdown loop ended on its own
                    None => return Ok(None),
                },
            }
        }
    }

    fn report_transition(&self, clock: &PhaseClock<T>, transition: &PhaseTransition) {
        info!("Phase changed: {} -> {}", transition.from, transition.to);
        self.notifier.on_phase_change(transition);
        self.logger.log(SessionEvent::new(
            "phase_change",
            serde_json::json!({
                "session_id": clock.session_id(),
                "from": transition.from.as_str(),
                "to": transition.to.as_str(),
            }),
        ));
    }
}
