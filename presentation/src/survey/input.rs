//! Line-based survey input
//!
//! Reading runs on a dedicated OS thread: a blocked `read_line` must never
//! hold up runtime shutdown.

use super::parser::{HELP, InputAction, parse_input};
use colored::Colorize;
use huddle_application::SurveyCommand;
use std::io::{self, BufRead, Write};
use std::thread::JoinHandle;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

/// Reads commands from `input`, echoing prompts and errors to `output`
pub struct InputReader<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> InputReader<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn read_line(&mut self) -> Option<String> {
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(line),
            Err(e) => {
                debug!("Input closed: {}", e);
                None
            }
        }
    }

    fn confirm_leave(&mut self) -> bool {
        let _ = write!(self.output, "{} ", "Leave the session? [y/N]".yellow());
        let _ = self.output.flush();
        self.read_line()
            .map(|answer| matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
            .unwrap_or(true)
    }

    /// Forward commands until input ends, the student leaves or the
    /// receiver is gone. Dropping `tx` on return reads as leaving.
    pub fn run(mut self, tx: UnboundedSender<SurveyCommand>) {
        while let Some(line) = self.read_line() {
            let command = match parse_input(&line) {
                Ok(InputAction::Command(command)) => command,
                Ok(InputAction::Help) => {
                    let _ = writeln!(self.output, "{}", HELP);
                    continue;
                }
                Ok(InputAction::RequestLeave) => {
                    if !self.confirm_leave() {
                        continue;
                    }
                    SurveyCommand::Leave
                }
                Err(e) => {
                    let _ = writeln!(self.output, "{}", e.to_string().red());
                    continue;
                }
            };

            let leaving = command == SurveyCommand::Leave;
            if tx.send(command).is_err() || leaving {
                break;
            }
        }
    }
}

/// Read commands from stdin on a background thread
pub fn spawn_stdin_reader(tx: UnboundedSender<SurveyCommand>) -> io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("survey-input".to_string())
        .spawn(move || InputReader::new(io::stdin().lock(), io::stderr()).run(tx))
}
