//! Cancellable periodic timers
//!
//! Every local interval (phase countdown, question countdown, timeout poll)
//! is owned through a [`TimerHandle`]. Cancelling the handle, or dropping
//! it, stops the loop before its next callback, so a timer can never outlive
//! the question or screen that started it.

use std::future::Future;
use std::ops::ControlFlow;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Owner of one periodic background loop
#[derive(Debug)]
pub struct TimerHandle {
    name: &'static str,
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl TimerHandle {
    /// Run `callback` every `period`, first after one full period.
    ///
    /// The loop ends when the callback returns [`ControlFlow::Break`] or the
    /// handle is cancelled. A callback in progress is abandoned on cancel.
    pub fn every<F, Fut>(name: &'static str, period: Duration, mut callback: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ControlFlow<()>> + Send + 'static,
    {
        let token = CancellationToken::new();
        let cancelled = token.clone();

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => break,
                    _ = interval.tick() => {}
                }

                let flow = tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => break,
                    flow = callback() => flow,
                };
                if flow.is_break() {
                    break;
                }
            }
            trace!(timer = name, "timer loop stopped");
        });

        Self {
            name,
            token,
            task: Some(task),
        }
    }

    /// Stop the loop. Idempotent.
    pub fn cancel(&self) {
        if !self.token.is_cancelled() {
            trace!(timer = self.name, "timer cancelled");
        }
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Whether the loop has exited (cancelled or finished on its own)
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(|t| t.is_finished())
    }

    /// Wait for the loop to exit without cancelling it
    pub async fn join(mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
