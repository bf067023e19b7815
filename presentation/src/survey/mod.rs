//! Interactive survey input
//!
//! Turns typed lines into [`SurveyCommand`](huddle_application::SurveyCommand)s
//! for the session runner.

pub mod input;
pub mod parser;

pub use input::{InputReader, spawn_stdin_reader};
pub use parser::{InputAction, ParseError, parse_input};
