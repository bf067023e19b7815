//! Survey question domain.
//!
//! - [`entities::Question`]: a ranking prompt shown during the survey
//! - [`entities::QuestionSet`]: validated questions with the built-in fallback
//! - [`sequencer::QuestionOrder`]: per-student deterministic ordering

pub mod entities;
pub mod sequencer;

pub use entities::{FALLBACK_QUESTION_COUNT, Question, QuestionSet};
pub use sequencer::{QuestionOrder, seed_hash, shuffle_with_seed};
