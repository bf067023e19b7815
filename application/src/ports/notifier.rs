//! Survey notification port
//!
//! Defines the interface for surfacing session progress to the student:
//! countdowns, phase changes, penalty notices, rejected inputs and the
//! completion wait.

use crate::ports::session_service::ServiceError;
use huddle_domain::{
    ClockState, CompletionStatus, Participant, Phase, PhaseTransition, PenaltyRecord, Question,
    RankingError, RankingSelection,
};

/// Callback for user-visible session events
///
/// Implementations live in the presentation layer. Every method has a
/// no-op default so adapters only implement what they display.
pub trait SurveyNotifier: Send + Sync {
    /// Clock positioned after (re)entering a session
    fn on_clock_restored(&self, _state: &ClockState) {}

    /// One second of the phase countdown elapsed
    fn on_clock_tick(&self, _phase: Phase, _remaining_seconds: u64) {}

    /// Session moved to a new phase
    fn on_phase_change(&self, _transition: &PhaseTransition) {}

    /// The service had no usable questions; the built-in set is used
    fn on_questions_fallback(&self) {}

    /// Survey loaded: who can be ranked and how many questions follow
    fn on_survey_ready(&self, _candidates: &[Participant], _question_count: usize) {}

    /// A question became active
    fn on_question_start(&self, _index: usize, _total: usize, _question: &Question) {}

    /// One second of the question countdown elapsed
    fn on_question_tick(&self, _index: usize, _remaining_seconds: u64) {}

    /// Current selection of the viewed question changed or was requested
    fn on_selection(&self, _index: usize, _selection: &RankingSelection, _locked: bool) {}

    /// A penalty was newly applied (called exactly once per question)
    fn on_penalty_applied(&self, _record: &PenaltyRecord) {}

    /// Confirming with nothing selected needs explicit acknowledgement
    fn on_acknowledgement_required(&self, _index: usize) {}

    /// A ranking operation was rejected by the engine
    fn on_ranking_rejected(&self, _error: &RankingError) {}

    /// A question was locked
    fn on_question_confirmed(&self, _index: usize, _complete: bool, _skipped: bool) {}

    /// A question's batch could not be delivered
    fn on_submission_failed(&self, _index: usize, _error: &ServiceError) {}

    /// Latest completion status while waiting for the group
    fn on_completion_progress(&self, _status: &CompletionStatus) {}

    /// Everyone finished; results can be shown
    fn on_results_ready(&self, _status: &CompletionStatus) {}
}

/// No-op notifier for when nothing should be displayed
pub struct NoSurveyNotifier;

impl SurveyNotifier for NoSurveyNotifier {}
