//! Penalty escalator use case
//!
//! Watches the active survey question with two independent loops and
//! penalizes it exactly once when time runs out:
//!
//! ```text
//!  1s local countdown ──► reaches 0 ──┐
//!                                     ├──► apply(question) ──► ledger claim ──► service
//!  ~5s remote timeout poll ──► true ──┘                          (first wins)
//! ```
//!
//! Both loops may fire for the same question; the ledger and the service's
//! own idempotency make the second call a no-op.
//!
//! The service request runs on its own task. A caller that is cancelled
//! mid-request (a timer stopped by a question change) never aborts it, and
//! every other caller for the same question waits for that one result.
//! Requests that fail on transport stay pending until [`retry_pending`]
//! gets them through.
//!
//! [`retry_pending`]: PenaltyEscalator::retry_pending

use crate::config::SessionTiming;
use crate::ports::event_logger::{SessionEvent, SessionEventLogger};
use crate::ports::notifier::SurveyNotifier;
use crate::ports::session_service::{ServiceError, SessionService};
use crate::timer::TimerHandle;
use huddle_domain::{PenaltyClaim, PenaltyLedger, PenaltyRecord, SessionId, StudentId};
use std::collections::{BTreeSet, HashMap};
use std::ops::ControlFlow;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Which signal noticed the timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutSource {
    LocalCountdown,
    RemotePoll,
}

/// Events from the per-question loops, tagged with their question index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionEvent {
    Tick { index: usize, remaining_seconds: u64 },
    TimedOut { index: usize, source: TimeoutSource },
}

impl QuestionEvent {
    pub fn index(&self) -> usize {
        match self {
            QuestionEvent::Tick { index, .. } | QuestionEvent::TimedOut { index, .. } => *index,
        }
    }
}

/// Result of an apply request
#[derive(Debug, Clone, PartialEq)]
pub enum PenaltyOutcome {
    /// Newly recorded; the notice has been raised
    Applied(PenaltyRecord),
    /// Recorded earlier, in flight, or already held by the service
    AlreadyApplied,
    /// Service unreachable; nothing recorded, a later signal may retry
    Failed(ServiceError),
}

/// The two loops watching one question
///
/// Dropping the pair cancels both loops.
#[derive(Debug)]
pub struct QuestionTimers {
    index: usize,
    countdown: TimerHandle,
    poll: TimerHandle,
}

impl QuestionTimers {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn cancel(&self) {
        self.countdown.cancel();
        self.poll.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.countdown.is_cancelled() && self.poll.is_cancelled()
    }
}

/// Resolves once the request for a question has settled
type Settled = watch::Receiver<Option<PenaltyOutcome>>;

struct PenaltyState {
    ledger: PenaltyLedger,
    in_flight: HashMap<usize, Settled>,
    /// Questions whose penalty failed on transport and is still owed
    pending: BTreeSet<usize>,
}

pub struct PenaltyEscalator<S: SessionService + 'static> {
    service: Arc<S>,
    session_id: SessionId,
    student_id: StudentId,
    state: Arc<Mutex<PenaltyState>>,
    notifier: Arc<dyn SurveyNotifier>,
    logger: Arc<dyn SessionEventLogger>,
    question_seconds: u64,
    poll_interval: Duration,
}

impl<S: SessionService + 'static> Clone for PenaltyEscalator<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            session_id: self.session_id.clone(),
            student_id: self.student_id.clone(),
            state: Arc::clone(&self.state),
            notifier: Arc::clone(&self.notifier),
            logger: Arc::clone(&self.logger),
            question_seconds: self.question_seconds,
            poll_interval: self.poll_interval,
        }
    }
}

impl<S: SessionService + 'static> PenaltyEscalator<S> {
    pub fn new(
        service: Arc<S>,
        session_id: SessionId,
        student_id: StudentId,
        timing: &SessionTiming,
        notifier: Arc<dyn SurveyNotifier>,
        logger: Arc<dyn SessionEventLogger>,
    ) -> Self {
        Self {
            service,
            session_id,
            student_id,
            state: Arc::new(Mutex::new(PenaltyState {
                ledger: PenaltyLedger::new(timing.penalty_points),
                in_flight: HashMap::new(),
                pending: BTreeSet::new(),
            })),
            notifier,
            logger,
            question_seconds: timing.question_seconds,
            poll_interval: timing.timeout_poll_interval,
        }
    }

    fn state(&self) -> MutexGuard<'_, PenaltyState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_applied(&self, question_index: usize) -> bool {
        self.state().ledger.is_applied(&self.session_id, question_index)
    }

    /// Total deduction this client has seen for the session
    pub fn total_points(&self) -> f64 {
        self.state().ledger.total_points(&self.session_id)
    }

    pub fn has_pending(&self) -> bool {
        !self.state().pending.is_empty()
    }

    /// Apply the penalty for a question. Safe to call any number of times.
    ///
    /// Only the caller that started the request sees `Applied`; callers
    /// that joined an in-flight request get `AlreadyApplied` on success.
    pub async fn apply(&self, question_index: usize) -> PenaltyOutcome {
        let (mut settled, started_here) = {
            let mut state = self.state();
            match state.ledger.claim(&self.session_id, question_index) {
                PenaltyClaim::AlreadyApplied => {
                    debug!("Penalty for question {} already applied", question_index);
                    return PenaltyOutcome::AlreadyApplied;
                }
                PenaltyClaim::InFlight => match state.in_flight.get(&question_index) {
                    Some(settled) => (settled.clone(), false),
                    None => return PenaltyOutcome::AlreadyApplied,
                },
                PenaltyClaim::Claimed => {
                    let (tx, rx) = watch::channel(None);
                    state.in_flight.insert(question_index, rx.clone());
                    self.spawn_request(question_index, tx);
                    (rx, true)
                }
            }
        };

        let outcome = settled
            .wait_for(Option::is_some)
            .await
            .ok()
            .and_then(|value| (*value).clone())
            .unwrap_or_else(|| {
                PenaltyOutcome::Failed(ServiceError::Other(
                    "penalty request ended without a result".to_string(),
                ))
            });

        match outcome {
            PenaltyOutcome::Applied(_) if !started_here => PenaltyOutcome::AlreadyApplied,
            outcome => outcome,
        }
    }

    /// Send the request on a task of its own so dropping the caller cannot
    /// abort it halfway
    fn spawn_request(&self, question_index: usize, settled: watch::Sender<Option<PenaltyOutcome>>) {
        let escalator = self.clone();
        tokio::spawn(async move {
            let outcome = escalator.request(question_index).await;
            settled.send_replace(Some(outcome));
        });
    }

    async fn request(&self, question_index: usize) -> PenaltyOutcome {
        let result = self
            .service
            .apply_question_penalty(&self.session_id, question_index, &self.student_id)
            .await;

        let mut state = self.state();
        state.in_flight.remove(&question_index);
        match result {
            Ok(receipt) => {
                state.pending.remove(&question_index);
                let record = state.ledger.complete(&self.session_id, question_index);
                drop(state);
                if !receipt.newly_applied {
                    debug!(
                        "Service already held the penalty for question {}",
                        question_index
                    );
                    return PenaltyOutcome::AlreadyApplied;
                }
                info!(
                    "Penalty of {} applied for question {}",
                    record.points, question_index
                );
                self.notifier.on_penalty_applied(&record);
                self.logger.log(SessionEvent::new(
                    "penalty_applied",
                    serde_json::json!({
                        "session_id": record.session_id,
                        "question_index": record.question_index,
                        "points": record.points,
                    }),
                ));
                PenaltyOutcome::Applied(record)
            }
            Err(e) => {
                state.ledger.abandon(&self.session_id, question_index);
                state.pending.insert(question_index);
                drop(state);
                warn!("Could not apply penalty for question {}: {}", question_index, e);
                PenaltyOutcome::Failed(e)
            }
        }
    }

    /// Retry every penalty that failed on transport. Returns how many are
    /// still owed afterwards.
    pub async fn retry_pending(&self) -> usize {
        let owed: Vec<usize> = self.state().pending.iter().copied().collect();
        for question_index in owed {
            debug!("Retrying penalty for question {}", question_index);
            self.apply(question_index).await;
        }
        self.state().pending.len()
    }

    /// Start watching a question.
    ///
    /// Starts the remote question timer (failure only degrades to the local
    /// countdown) and spawns the countdown and timeout-poll loops. Both loops
    /// stop after reporting a timeout.
    pub async fn start_question(
        &self,
        question_index: usize,
        events: mpsc::UnboundedSender<QuestionEvent>,
    ) -> QuestionTimers {
        if let Err(e) = self
            .service
            .start_question_timer(&self.session_id, question_index)
            .await
        {
            warn!(
                "Remote timer for question {} not started, counting locally: {}",
                question_index, e
            );
        }

        QuestionTimers {
            index: question_index,
            countdown: self.spawn_countdown(question_index, events.clone()),
            poll: self.spawn_timeout_poll(question_index, events),
        }
    }

    fn spawn_countdown(
        &self,
        index: usize,
        events: mpsc::UnboundedSender<QuestionEvent>,
    ) -> TimerHandle {
        let escalator = self.clone();
        let mut remaining = self.question_seconds;

        TimerHandle::every("question-countdown", Duration::from_secs(1), move || {
            remaining = remaining.saturating_sub(1);
            let remaining_seconds = remaining;
            let escalator = escalator.clone();
            let events = events.clone();
            async move {
                let tick = QuestionEvent::Tick {
                    index,
                    remaining_seconds,
                };
                if events.send(tick).is_err() {
                    return ControlFlow::Break(());
                }
                if remaining_seconds > 0 {
                    return ControlFlow::Continue(());
                }
                escalator.apply(index).await;
                let _ = events.send(QuestionEvent::TimedOut {
                    index,
                    source: TimeoutSource::LocalCountdown,
                });
                ControlFlow::Break(())
            }
        })
    }

    fn spawn_timeout_poll(
        &self,
        index: usize,
        events: mpsc::UnboundedSender<QuestionEvent>,
    ) -> TimerHandle {
        let escalator = self.clone();

        TimerHandle::every("timeout-poll", self.poll_interval, move || {
            let escalator = escalator.clone();
            let events = events.clone();
            async move {
                let timed_out = escalator
                    .service
                    .check_question_timeout(&escalator.session_id, index)
                    .await;
                match timed_out {
                    Ok(true) => {
                        escalator.apply(index).await;
                        let _ = events.send(QuestionEvent::TimedOut {
                            index,
                            source: TimeoutSource::RemotePoll,
                        });
                        ControlFlow::Break(())
                    }
                    Ok(false) => ControlFlow::Continue(()),
                    Err(e) => {
                        debug!("Timeout poll for question {} failed: {}", index, e);
                        ControlFlow::Continue(())
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::event_logger::NoSessionEventLogger;
    use crate::use_cases::test_support::{RecordingNotifier, ScriptedService};
    use std::sync::atomic::Ordering;

    fn escalator(
        service: &Arc<ScriptedService>,
        notifier: &Arc<RecordingNotifier>,
        question_seconds: u64,
    ) -> PenaltyEscalator<ScriptedService> {
        PenaltyEscalator::new(
            Arc::clone(service),
            SessionId::new("sess1").unwrap(),
            StudentId::new("alice").unwrap(),
            &SessionTiming::default().with_question_seconds(question_seconds),
            Arc::clone(notifier) as Arc<dyn SurveyNotifier>,
            Arc::new(NoSessionEventLogger),
        )
    }

    #[tokio::test]
    async fn test_double_apply_records_one_penalty_and_one_notice() {
        let service = Arc::new(ScriptedService::offline());
        let notifier = Arc::new(RecordingNotifier::default());
        let esc = escalator(&service, &notifier, 60);

        assert!(matches!(esc.apply(0).await, PenaltyOutcome::Applied(_)));
        assert_eq!(esc.apply(0).await, PenaltyOutcome::AlreadyApplied);

        assert_eq!(service.penalty_count(), 1);
        assert_eq!(service.penalty_calls.load(Ordering::SeqCst), 1);
        assert_eq!(notifier.penalty_notices(), 1);
        assert_eq!(esc.total_points(), 0.5);
    }

    #[tokio::test]
    async fn test_concurrent_signals_apply_once() {
        let service = Arc::new(ScriptedService::offline());
        let notifier = Arc::new(RecordingNotifier::default());
        let esc = escalator(&service, &notifier, 60);

        let (a, b) = tokio::join!(esc.apply(1), esc.apply(1));
        let applied = [a, b]
            .iter()
            .filter(|o| matches!(o, PenaltyOutcome::Applied(_)))
            .count();

        assert_eq!(applied, 1);
        assert_eq!(service.penalty_count(), 1);
        assert_eq!(notifier.penalty_notices(), 1);
    }

    #[tokio::test]
    async fn test_fresh_client_does_not_repeat_notice() {
        let service = Arc::new(ScriptedService::offline());
        let first_notifier = Arc::new(RecordingNotifier::default());
        escalator(&service, &first_notifier, 60).apply(2).await;

        // Restarted client: empty ledger, the service remembers
        let second_notifier = Arc::new(RecordingNotifier::default());
        let restarted = escalator(&service, &second_notifier, 60);
        assert_eq!(restarted.apply(2).await, PenaltyOutcome::AlreadyApplied);
        assert!(restarted.is_applied(2));

        assert_eq!(service.penalty_count(), 1);
        assert_eq!(first_notifier.penalty_notices(), 1);
        assert_eq!(second_notifier.penalty_notices(), 0);
    }

    #[tokio::test]
    async fn test_transport_failure_allows_retry() {
        let service = Arc::new(ScriptedService::offline());
        service.penalty_offline.store(true, Ordering::SeqCst);
        let notifier = Arc::new(RecordingNotifier::default());
        let esc = escalator(&service, &notifier, 60);

        assert!(matches!(esc.apply(0).await, PenaltyOutcome::Failed(_)));
        assert!(!esc.is_applied(0));
        assert_eq!(notifier.penalty_notices(), 0);

        service.penalty_offline.store(false, Ordering::SeqCst);
        assert!(matches!(esc.apply(0).await, PenaltyOutcome::Applied(_)));
        assert_eq!(notifier.penalty_notices(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_caller_does_not_abort_request() {
        let service = Arc::new(ScriptedService::offline());
        service.delay_penalties(Duration::from_secs(2));
        let notifier = Arc::new(RecordingNotifier::default());
        let esc = escalator(&service, &notifier, 60);

        let first = esc.clone();
        let caller = tokio::spawn(async move { first.apply(0).await });
        tokio::time::sleep(Duration::from_millis(500)).await;
        caller.abort();

        // A second signal joins the request still running in the background
        assert_eq!(esc.apply(0).await, PenaltyOutcome::AlreadyApplied);
        assert!(esc.is_applied(0));
        assert_eq!(service.penalty_count(), 1);
        assert_eq!(service.penalty_calls.load(Ordering::SeqCst), 1);
        assert_eq!(notifier.penalty_notices(), 1);
    }

    #[tokio::test]
    async fn test_failed_penalties_stay_pending_until_retried() {
        let service = Arc::new(ScriptedService::offline());
        service.penalty_offline.store(true, Ordering::SeqCst);
        let notifier = Arc::new(RecordingNotifier::default());
        let esc = escalator(&service, &notifier, 60);

        esc.apply(0).await;
        esc.apply(2).await;
        assert!(esc.has_pending());
        assert_eq!(esc.retry_pending().await, 2);

        service.penalty_offline.store(false, Ordering::SeqCst);
        assert_eq!(esc.retry_pending().await, 0);
        assert!(!esc.has_pending());
        assert!(esc.is_applied(0) && esc.is_applied(2));
        assert_eq!(notifier.penalty_notices(), 2);
        assert_eq!(esc.total_points(), 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_local_countdown_times_out_and_penalizes() {
        let service = Arc::new(ScriptedService::offline());
        let notifier = Arc::new(RecordingNotifier::default());
        let esc = escalator(&service, &notifier, 3);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let _timers = esc.start_question(0, tx).await;

        let mut ticks = Vec::new();
        let timed_out = loop {
            match rx.recv().await.unwrap() {
                QuestionEvent::Tick {
                    remaining_seconds, ..
                } => ticks.push(remaining_seconds),
                QuestionEvent::TimedOut { index, source } => break (index, source),
            }
        };

        assert_eq!(ticks, vec![2, 1, 0]);
        assert_eq!(timed_out, (0, TimeoutSource::LocalCountdown));
        assert_eq!(service.penalty_count(), 1);
        assert_eq!(notifier.penalty_notices(), 1);
        assert_eq!(*service.timer_starts.lock().unwrap(), vec![0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_poll_and_countdown_race_to_one_penalty() {
        let service = Arc::new(ScriptedService::offline());
        service.time_out_remotely(0);
        let notifier = Arc::new(RecordingNotifier::default());
        // Countdown and 5s poll both reach the question at t=5s
        let esc = escalator(&service, &notifier, 5);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let _timers = esc.start_question(0, tx).await;

        let mut timeouts = 0;
        while let Some(event) = rx.recv().await {
            if matches!(event, QuestionEvent::TimedOut { .. }) {
                timeouts += 1;
                if timeouts == 2 {
                    break;
                }
            }
        }

        assert_eq!(service.penalty_count(), 1);
        assert_eq!(notifier.penalty_notices(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_timers_never_penalize() {
        let service = Arc::new(ScriptedService::offline());
        service.time_out_remotely(0);
        let notifier = Arc::new(RecordingNotifier::default());
        let esc = escalator(&service, &notifier, 3);
        let (tx, _rx) = mpsc::unbounded_channel();

        let timers = esc.start_question(0, tx).await;
        timers.cancel();
        assert!(timers.is_cancelled());
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert_eq!(service.penalty_count(), 0);
        assert_eq!(notifier.penalty_notices(), 0);
    }
}
