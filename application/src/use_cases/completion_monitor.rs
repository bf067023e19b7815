//! Completion monitor
//!
//! After the final batch is delivered the student waits for the rest of the
//! group. The monitor polls the completion endpoint until the quorum rule
//! holds: at least two participants and all of them finished.

use crate::ports::event_logger::{SessionEvent, SessionEventLogger};
use crate::ports::notifier::SurveyNotifier;
use crate::ports::session_service::SessionService;
use crate::use_cases::run_survey::SurveyError;
use huddle_domain::{CompletionStatus, SessionId};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct CompletionMonitor<S: SessionService + ?Sized> {
    service: Arc<S>,
    notifier: Arc<dyn SurveyNotifier>,
    logger: Arc<dyn SessionEventLogger>,
    poll_interval: Duration,
}

impl<S: SessionService + ?Sized> CompletionMonitor<S> {
    pub fn new(
        service: Arc<S>,
        notifier: Arc<dyn SurveyNotifier>,
        logger: Arc<dyn SessionEventLogger>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            service,
            notifier,
            logger,
            poll_interval,
        }
    }

    /// Poll until results are ready or `cancel` fires.
    ///
    /// The first poll happens immediately. Unreachable service responses are
    /// skipped; the wait never gives up on its own.
    pub async fn wait_until_ready(
        &self,
        session_id: &SessionId,
        cancel: &CancellationToken,
    ) -> Result<CompletionStatus, SurveyError> {
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(SurveyError::Cancelled),
                _ = interval.tick() => {}
            }

            let status = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(SurveyError::Cancelled),
                status = self.service.get_completion_status(session_id) => status,
            };

            match status {
                Ok(status) if status.is_ready() => {
                    info!(
                        "All {} participants finished session {}",
                        status.total, session_id
                    );
                    self.notifier.on_results_ready(&status);
                    self.logger.log(SessionEvent::new(
                        "results_ready",
                        serde_json::json!({
                            "session_id": session_id,
                            "completed": status.completed,
                            "total": status.total,
                        }),
                    ));
                    return Ok(status);
                }
                Ok(status) => {
                    debug!(
                        "Waiting for group: {}/{} finished",
                        status.completed, status.total
                    );
                    self.notifier.on_completion_progress(&status);
                }
                Err(e) => warn!("Completion status unavailable: {}", e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::event_logger::NoSessionEventLogger;
    use crate::ports::session_service::ServiceError;
    use crate::use_cases::test_support::{RecordingNotifier, ScriptedService};
    use std::sync::atomic::Ordering;

    fn monitor(
        service: &Arc<ScriptedService>,
        notifier: &Arc<RecordingNotifier>,
    ) -> CompletionMonitor<ScriptedService> {
        CompletionMonitor::new(
            Arc::clone(service),
            Arc::clone(notifier) as Arc<dyn SurveyNotifier>,
            Arc::new(NoSessionEventLogger),
            Duration::from_secs(3),
        )
    }

    fn sess() -> SessionId {
        SessionId::new("sess1").unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_polling_once_ready() {
        let service = Arc::new(ScriptedService::offline().with_completion(vec![
            Ok(CompletionStatus::new(1, 3, false)),
            Err(ServiceError::Timeout),
            Ok(CompletionStatus::new(2, 3, false)),
            Ok(CompletionStatus::new(3, 3, true)),
        ]));
        let notifier = Arc::new(RecordingNotifier::default());

        let status = monitor(&service, &notifier)
            .wait_until_ready(&sess(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(status, CompletionStatus::new(3, 3, true));
        assert_eq!(service.completion_calls.load(Ordering::SeqCst), 4);
        assert_eq!(notifier.progress.load(Ordering::SeqCst), 2);
        assert_eq!(notifier.ready.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(service.completion_calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_participant_keeps_waiting() {
        let service = Arc::new(
            ScriptedService::offline().with_completion(vec![Ok(CompletionStatus::new(1, 1, true))]),
        );
        let notifier = Arc::new(RecordingNotifier::default());
        let cancel = CancellationToken::new();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(10)).await;
            canceller.cancel();
        });

        let result = monitor(&service, &notifier)
            .wait_until_ready(&sess(), &cancel)
            .await;

        assert_eq!(result, Err(SurveyError::Cancelled));
        // t = 0, 3, 6, 9
        assert_eq!(service.completion_calls.load(Ordering::SeqCst), 4);
        assert_eq!(notifier.ready.load(Ordering::SeqCst), 0);
    }
}
