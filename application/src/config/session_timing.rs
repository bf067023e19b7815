//! Session timing: countdowns, poll intervals and penalty size.
//!
//! [`SessionTiming`] groups the static parameters that drive the phase
//! clock, the penalty escalator and the completion monitor. Infrastructure
//! builds it from the config file; tests build it directly.

use huddle_domain::{DEFAULT_PENALTY_POINTS, PhaseDurations};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTiming {
    /// Preparation and discussion countdown lengths.
    pub phases: PhaseDurations,
    /// Countdown per survey question, in seconds.
    pub question_seconds: u64,
    /// How often the remote question timeout is polled.
    pub timeout_poll_interval: Duration,
    /// How often group completion is polled after the final submission.
    pub completion_poll_interval: Duration,
    /// Flat deduction per timed-out or skipped question.
    pub penalty_points: f64,
}

impl Default for SessionTiming {
    fn default() -> Self {
        Self {
            phases: PhaseDurations::default(),
            question_seconds: 90,
            timeout_poll_interval: Duration::from_secs(5),
            completion_poll_interval: Duration::from_secs(3),
            penalty_points: DEFAULT_PENALTY_POINTS,
        }
    }
}

impl SessionTiming {
    // ==================== Builder Methods ====================

    pub fn with_phases(mut self, phases: PhaseDurations) -> Self {
        self.phases = phases;
        self
    }

    pub fn with_question_seconds(mut self, seconds: u64) -> Self {
        self.question_seconds = seconds;
        self
    }

    pub fn with_timeout_poll_interval(mut self, interval: Duration) -> Self {
        self.timeout_poll_interval = interval;
        self
    }

    pub fn with_completion_poll_interval(mut self, interval: Duration) -> Self {
        self.completion_poll_interval = interval;
        self
    }

    pub fn with_penalty_points(mut self, points: f64) -> Self {
        self.penalty_points = points;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let timing = SessionTiming::default();
        assert_eq!(timing.question_seconds, 90);
        assert_eq!(timing.timeout_poll_interval, Duration::from_secs(5));
        assert_eq!(timing.completion_poll_interval, Duration::from_secs(3));
        assert_eq!(timing.penalty_points, 0.5);
    }

    #[test]
    fn test_builder() {
        let timing = SessionTiming::default()
            .with_question_seconds(30)
            .with_penalty_points(1.0)
            .with_completion_poll_interval(Duration::from_millis(500));

        assert_eq!(timing.question_seconds, 30);
        assert_eq!(timing.penalty_points, 1.0);
        assert_eq!(timing.completion_poll_interval, Duration::from_millis(500));
    }
}
