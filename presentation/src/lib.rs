//! Presentation layer for huddle
//!
//! This crate contains the CLI definition, console output, the live
//! session reporter and the survey command reader.

pub mod cli;
pub mod output;
pub mod progress;
pub mod survey;

// Re-export commonly used types
pub use cli::commands::Cli;
pub use output::console::ConsoleFormatter;
pub use progress::reporter::ConsoleReporter;
pub use survey::{InputAction, InputReader, ParseError, parse_input, spawn_stdin_reader};
