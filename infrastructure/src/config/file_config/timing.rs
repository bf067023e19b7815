//! Timing configuration from TOML (`[timing]` section)

use super::{ConfigIssue, Severity};
use huddle_application::SessionTiming;
use huddle_domain::{DEFAULT_PENALTY_POINTS, PhaseDurations};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Raw timing configuration from TOML
///
/// All durations are whole seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileTimingConfig {
    pub prep_seconds: u64,
    pub discussion_seconds: u64,
    pub question_seconds: u64,
    pub timeout_poll_seconds: u64,
    pub completion_poll_seconds: u64,
    /// Flat deduction per timed-out or skipped question
    pub penalty_points: f64,
}

impl Default for FileTimingConfig {
    fn default() -> Self {
        let phases = PhaseDurations::default();
        Self {
            prep_seconds: phases.prep_seconds,
            discussion_seconds: phases.discussion_seconds,
            question_seconds: 90,
            timeout_poll_seconds: 5,
            completion_poll_seconds: 3,
            penalty_points: DEFAULT_PENALTY_POINTS,
        }
    }
}

impl FileTimingConfig {
    pub fn to_session_timing(&self) -> SessionTiming {
        SessionTiming::default()
            .with_phases(PhaseDurations {
                prep_seconds: self.prep_seconds,
                discussion_seconds: self.discussion_seconds,
            })
            .with_question_seconds(self.question_seconds)
            .with_timeout_poll_interval(Duration::from_secs(self.timeout_poll_seconds))
            .with_completion_poll_interval(Duration::from_secs(self.completion_poll_seconds))
            .with_penalty_points(self.penalty_points)
    }

    pub(super) fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        for (field, value) in [
            ("timing.prep_seconds", self.prep_seconds),
            ("timing.discussion_seconds", self.discussion_seconds),
            ("timing.question_seconds", self.question_seconds),
            ("timing.timeout_poll_seconds", self.timeout_poll_seconds),
            ("timing.completion_poll_seconds", self.completion_poll_seconds),
        ] {
            if value == 0 {
                issues.push(ConfigIssue::new(
                    Severity::Error,
                    field,
                    format!("{} must be greater than 0", field),
                ));
            }
        }

        if !self.penalty_points.is_finite() || self.penalty_points <= 0.0 {
            issues.push(ConfigIssue::new(
                Severity::Error,
                "timing.penalty_points",
                format!(
                    "timing.penalty_points must be a positive number, got {}",
                    self.penalty_points
                ),
            ));
        }

        if self.question_seconds > 0 && self.timeout_poll_seconds > self.question_seconds {
            issues.push(ConfigIssue::new(
                Severity::Warning,
                "timing.timeout_poll_seconds",
                format!(
                    "timing.timeout_poll_seconds ({}) is longer than a question ({}s); \
                     remote timeouts will only be noticed by the local countdown",
                    self.timeout_poll_seconds, self.question_seconds
                ),
            ));
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_session_timing() {
        let timing = FileTimingConfig {
            prep_seconds: 60,
            question_seconds: 45,
            penalty_points: 1.0,
            ..Default::default()
        }
        .to_session_timing();

        assert_eq!(timing.phases.prep_seconds, 60);
        assert_eq!(timing.phases.discussion_seconds, 600);
        assert_eq!(timing.question_seconds, 45);
        assert_eq!(timing.timeout_poll_interval, Duration::from_secs(5));
        assert_eq!(timing.completion_poll_interval, Duration::from_secs(3));
        assert_eq!(timing.penalty_points, 1.0);
    }

    #[test]
    fn test_zero_durations_are_errors() {
        let config = FileTimingConfig {
            prep_seconds: 0,
            completion_poll_seconds: 0,
            ..Default::default()
        };
        let fields: Vec<_> = config.validate().into_iter().map(|i| i.field).collect();
        assert_eq!(
            fields,
            vec!["timing.prep_seconds", "timing.completion_poll_seconds"]
        );
    }

    #[test]
    fn test_penalty_must_be_positive() {
        let config = FileTimingConfig {
            penalty_points: 0.0,
            ..Default::default()
        };
        let issues = config.validate();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Error);
        assert_eq!(issues[0].field, "timing.penalty_points");
    }

    #[test]
    fn test_slow_poll_is_a_warning() {
        let config = FileTimingConfig {
            question_seconds: 10,
            timeout_poll_seconds: 20,
            ..Default::default()
        };
        let issues = config.validate();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Warning);
    }
}
