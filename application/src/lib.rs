//! Application layer for huddle
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod timer;
pub mod use_cases;

// Re-export commonly used types
pub use config::SessionTiming;
pub use ports::{
    event_logger::{NoSessionEventLogger, SessionEvent, SessionEventLogger},
    notifier::{NoSurveyNotifier, SurveyNotifier},
    session_service::{PenaltyReceipt, ServiceError, SessionService},
    state_store::{MemoryStateStore, SessionStateStore, StoreError},
};
pub use timer::TimerHandle;
pub use use_cases::completion_monitor::CompletionMonitor;
pub use use_cases::penalty_escalator::{
    PenaltyEscalator, PenaltyOutcome, QuestionEvent, QuestionTimers, TimeoutSource,
};
pub use use_cases::phase_clock::{ClockEvent, PhaseClock};
pub use use_cases::run_session::{RunSessionUseCase, SessionOutcome};
pub use use_cases::run_survey::{
    RunSurveyInput, RunSurveyUseCase, SurveyCommand, SurveyError, SurveyOutcome,
};
pub use use_cases::submission::{SubmissionCoordinator, SubmitError, SubmitOutcome};
