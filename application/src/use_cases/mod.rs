//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod completion_monitor;
pub mod penalty_escalator;
pub mod phase_clock;
pub mod run_session;
pub mod run_survey;
pub mod submission;

#[cfg(test)]
pub(crate) mod test_support;
