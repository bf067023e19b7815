//! Console formatting for session screens

use colored::Colorize;
use huddle_application::SessionOutcome;
use huddle_domain::{
    CompletionStatus, Participant, ParticipantId, QUORUM_MIN_PARTICIPANTS, Question, RankSlot,
    RankingSelection,
};
use std::collections::HashMap;

/// Formats session state for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// `mm:ss`
    pub fn clock(seconds: u64) -> String {
        format!("{:02}:{:02}", seconds / 60, seconds % 60)
    }

    pub fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{}\n{}", line.cyan(), title.cyan().bold(), line.cyan())
    }

    pub fn question(index: usize, total: usize, question: &Question) -> String {
        format!(
            "\n{} {}\n",
            format!("Question {}/{}:", index + 1, total).cyan().bold(),
            question.text
        )
    }

    /// Who can be ranked, as `id (name)` pairs
    pub fn candidates(candidates: &[Participant]) -> String {
        if candidates.is_empty() {
            return "Nobody else to rank in this session.".dimmed().to_string();
        }
        let list = candidates
            .iter()
            .map(|p| {
                if p.name.is_empty() {
                    p.id.to_string()
                } else {
                    format!("{} ({})", p.id, p.name)
                }
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!("{} {}", "Rank from:".cyan().bold(), list)
    }

    pub fn selection(
        index: usize,
        selection: &RankingSelection,
        names: &HashMap<ParticipantId, String>,
        locked: bool,
    ) -> String {
        let mut output = String::new();
        let title = format!("Question {}", index + 1);
        if locked {
            output.push_str(&format!("{} {}\n", title.bold(), "(confirmed)".green()));
        } else {
            output.push_str(&format!("{}\n", title.bold()));
        }
        for slot in RankSlot::ALL {
            let entry = match selection.get(slot) {
                Some(id) => match names.get(id) {
                    Some(name) if !name.is_empty() => format!("{} ({})", name, id),
                    _ => id.to_string(),
                },
                None => "-".dimmed().to_string(),
            };
            output.push_str(&format!("  {}  {}\n", slot.label().yellow(), entry));
        }
        output
    }

    pub fn completion_progress(status: &CompletionStatus) -> String {
        if status.is_gathering() {
            return format!(
                "Waiting for classmates to join ({} so far, results need at least {})",
                status.total, QUORUM_MIN_PARTICIPANTS
            );
        }
        format!(
            "Waiting for the group: {}/{} finished, {} to go",
            status.completed,
            status.total,
            status.outstanding()
        )
    }

    pub fn outcome(outcome: &SessionOutcome) -> String {
        match outcome {
            SessionOutcome::Completed(status) => format!(
                "{}\n{} {} of {} participants finished.",
                Self::header("Results are ready"),
                "Done:".green().bold(),
                status.completed,
                status.total
            ),
            SessionOutcome::Left { phase } => format!(
                "{} during {}. Run the same command again to resume.",
                "Left the session".yellow().bold(),
                phase.display_name()
            ),
        }
    }
}
