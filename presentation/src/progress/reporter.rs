//! Live console reporting for a running session

use crate::output::console::ConsoleFormatter;
use colored::Colorize;
use huddle_application::{ServiceError, SurveyNotifier};
use huddle_domain::{
    ClockSource, ClockState, CompletionStatus, Participant, ParticipantId, PenaltyRecord, Phase,
    PhaseTransition, Question, RankingError, RankingSelection,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Prints session events and keeps a countdown line at the bottom
pub struct ConsoleReporter {
    quiet: bool,
    countdown: Mutex<Option<ProgressBar>>,
    names: Mutex<HashMap<ParticipantId, String>>,
    question_count: Mutex<usize>,
    last_progress: Mutex<Option<CompletionStatus>>,
}

impl ConsoleReporter {
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            countdown: Mutex::new(None),
            names: Mutex::new(HashMap::new()),
            question_count: Mutex::new(0),
            last_progress: Mutex::new(None),
        }
    }

    fn countdown_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {prefix:.bold.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
        mutex.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Print above the countdown line without tearing it
    fn println(&self, text: impl AsRef<str>) {
        match Self::lock(&self.countdown).as_ref() {
            Some(bar) => bar.suspend(|| println!("{}", text.as_ref())),
            None => println!("{}", text.as_ref()),
        }
    }

    fn start_countdown(&self, prefix: String, remaining_seconds: Option<u64>) {
        self.stop_countdown();
        if self.quiet {
            return;
        }
        let bar = ProgressBar::new_spinner();
        bar.set_style(Self::countdown_style());
        bar.set_prefix(prefix);
        if let Some(seconds) = remaining_seconds {
            bar.set_message(ConsoleFormatter::clock(seconds));
        }
        bar.enable_steady_tick(Duration::from_millis(250));
        *Self::lock(&self.countdown) = Some(bar);
    }

    fn update_countdown(&self, remaining_seconds: u64) {
        if let Some(bar) = Self::lock(&self.countdown).as_ref() {
            let text = ConsoleFormatter::clock(remaining_seconds);
            if remaining_seconds <= 10 {
                bar.set_message(text.red().bold().to_string());
            } else {
                bar.set_message(text);
            }
        }
    }

    fn stop_countdown(&self) {
        if let Some(bar) = Self::lock(&self.countdown).take() {
            bar.finish_and_clear();
        }
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new(false)
    }
}

impl SurveyNotifier for ConsoleReporter {
    fn on_clock_restored(&self, state: &ClockState) {
        let note = match state.source {
            ClockSource::Remote => "",
            ClockSource::Local => " (offline, resumed from last run)",
            ClockSource::Default => " (offline)",
        };
        self.println(format!(
            "{} {}{}",
            "Phase:".cyan().bold(),
            state.phase.display_name(),
            note.dimmed()
        ));
        if state.phase.is_timed() {
            self.start_countdown(
                state.phase.display_name().to_string(),
                Some(state.remaining_seconds),
            );
        }
    }

    fn on_clock_tick(&self, _phase: Phase, remaining_seconds: u64) {
        self.update_countdown(remaining_seconds);
    }

    fn on_phase_change(&self, transition: &PhaseTransition) {
        self.stop_countdown();
        self.println(format!(
            "\n{}",
            ConsoleFormatter::header(&format!(
                "{} → {}",
                transition.from.display_name(),
                transition.to.display_name()
            ))
        ));
    }

    fn on_questions_fallback(&self) {
        self.println(
            "Could not load this session's questions; using the standard set."
                .yellow()
                .to_string(),
        );
    }

    fn on_survey_ready(&self, candidates: &[Participant], question_count: usize) {
        *Self::lock(&self.names) = candidates
            .iter()
            .map(|p| (p.id.clone(), p.name.clone()))
            .collect();
        *Self::lock(&self.question_count) = question_count;
        self.println(ConsoleFormatter::candidates(candidates));
        self.println("Type 'help' for commands.".dimmed().to_string());
    }

    fn on_question_start(&self, index: usize, total: usize, question: &Question) {
        self.stop_countdown();
        self.println(ConsoleFormatter::question(index, total, question));
        self.start_countdown(format!("Question {}", index + 1), None);
    }

    fn on_question_tick(&self, _index: usize, remaining_seconds: u64) {
        self.update_countdown(remaining_seconds);
    }

    fn on_selection(&self, index: usize, selection: &RankingSelection, locked: bool) {
        let text = {
            let names = Self::lock(&self.names);
            ConsoleFormatter::selection(index, selection, &names, locked)
        };
        self.println(text.trim_end());
    }

    fn on_penalty_applied(&self, record: &PenaltyRecord) {
        self.println(format!(
            "{} -{} points for question {}",
            "Penalty:".red().bold(),
            record.points,
            record.question_index + 1
        ));
    }

    fn on_acknowledgement_required(&self, index: usize) {
        self.println(format!(
            "{} Question {} has no rankings. Type 'skip' to confirm anyway (penalty).",
            "!".yellow().bold(),
            index + 1
        ));
    }

    fn on_ranking_rejected(&self, error: &RankingError) {
        self.println(error.to_string().red().to_string());
    }

    fn on_question_confirmed(&self, index: usize, complete: bool, skipped: bool) {
        let status = if skipped {
            "skipped".yellow()
        } else if complete {
            "confirmed".green()
        } else {
            "confirmed (partial)".yellow()
        };
        self.println(format!("{} Question {} {}", "v".green(), index + 1, status));

        let total = *Self::lock(&self.question_count);
        if total > 0 && index + 1 == total {
            self.stop_countdown();
        }
    }

    fn on_submission_failed(&self, index: usize, error: &ServiceError) {
        self.println(format!(
            "{} Could not send question {}: {}. Type 'ok' to retry.",
            "x".red(),
            index + 1,
            error
        ));
    }

    fn on_completion_progress(&self, status: &CompletionStatus) {
        let mut last = Self::lock(&self.last_progress);
        if last.as_ref() == Some(status) {
            return;
        }
        *last = Some(*status);
        drop(last);
        self.println(ConsoleFormatter::completion_progress(status).dimmed().to_string());
    }

    fn on_results_ready(&self, _status: &CompletionStatus) {
        self.stop_countdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_reporter_has_no_countdown() {
        let reporter = ConsoleReporter::new(true);
        reporter.on_clock_restored(&ClockState {
            phase: Phase::Discussion,
            remaining_seconds: 42,
            source: ClockSource::Local,
        });
        assert!(ConsoleReporter::lock(&reporter.countdown).is_none());
    }

    #[test]
    fn test_phase_change_clears_countdown() {
        let reporter = ConsoleReporter::new(false);
        reporter.on_clock_restored(&ClockState {
            phase: Phase::Prep,
            remaining_seconds: 5,
            source: ClockSource::Remote,
        });
        assert!(ConsoleReporter::lock(&reporter.countdown).is_some());

        reporter.on_phase_change(&PhaseTransition {
            from: Phase::Prep,
            to: Phase::Discussion,
        });
        assert!(ConsoleReporter::lock(&reporter.countdown).is_none());
    }

    #[test]
    fn test_survey_ready_records_names() {
        let reporter = ConsoleReporter::new(true);
        let bob = Participant::new(ParticipantId::new("bob").unwrap(), "Bob");
        reporter.on_survey_ready(&[bob], 3);

        let names = ConsoleReporter::lock(&reporter.names);
        assert_eq!(
            names.get(&ParticipantId::new("bob").unwrap()).map(String::as_str),
            Some("Bob")
        );
        assert_eq!(*ConsoleReporter::lock(&reporter.question_count), 3);
    }

    #[test]
    fn test_repeated_progress_is_collapsed() {
        let reporter = ConsoleReporter::new(true);
        let status = CompletionStatus::new(1, 3, false);
        reporter.on_completion_progress(&status);
        reporter.on_completion_progress(&status);
        assert_eq!(*ConsoleReporter::lock(&reporter.last_progress), Some(status));
    }
}
