//! Survey command parser

use huddle_application::SurveyCommand;
use huddle_domain::{ParticipantId, RankSlot};
use thiserror::Error;

/// What a typed line asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputAction {
    Command(SurveyCommand),
    /// Wants to leave; must be confirmed before sending
    RequestLeave,
    Help,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unknown command '{0}' (type 'help' for a list)")]
    UnknownCommand(String),

    #[error("Rank must be 1, 2 or 3, got '{0}'")]
    InvalidRank(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("Question number must be 1 or more, got '{0}'")]
    InvalidQuestion(String),
}

pub const HELP: &str = "\
  <rank> <id>      rank a participant (rank is 1, 2 or 3)
  clear <rank>     empty a rank
  confirm, ok      lock the current question
  skip             lock it without rankings (penalty)
  back, b          previous question
  go <n>           jump to question n
  show             redisplay the current question
  leave, quit, q   leave the session
  help, ?          this list";

fn parse_slot(raw: &str) -> Result<RankSlot, ParseError> {
    let trimmed = raw.trim_end_matches(['.', ')']);
    let number = trimmed
        .parse::<u8>()
        .map_err(|_| ParseError::InvalidRank(raw.to_string()))?;
    RankSlot::try_from(number).map_err(|_| ParseError::InvalidRank(raw.to_string()))
}

fn parse_select(slot: &str, participant: Option<&str>) -> Result<InputAction, ParseError> {
    let slot = parse_slot(slot)?;
    let participant = participant
        .and_then(|p| ParticipantId::new(p).ok())
        .ok_or(ParseError::Usage("<rank> <participant id>"))?;
    Ok(InputAction::Command(SurveyCommand::Select { slot, participant }))
}

/// Parse one input line
///
/// An empty line redisplays the current question.
pub fn parse_input(line: &str) -> Result<InputAction, ParseError> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some((head, args)) = words.split_first() else {
        return Ok(InputAction::Command(SurveyCommand::Show));
    };

    let command = match (head.to_ascii_lowercase().as_str(), args) {
        ("rank", [slot, participant]) => return parse_select(slot, Some(*participant)),
        ("rank", [pair]) => {
            let (slot, participant) = pair
                .split_once(':')
                .ok_or(ParseError::Usage("rank <n> <participant id>"))?;
            return parse_select(slot, Some(participant));
        }
        ("rank", _) => return Err(ParseError::Usage("rank <n> <participant id>")),
        ("clear" | "c", [slot]) => SurveyCommand::Clear {
            slot: parse_slot(slot)?,
        },
        ("clear" | "c", _) => return Err(ParseError::Usage("clear <rank>")),
        ("confirm" | "ok", []) => SurveyCommand::Confirm {
            acknowledge_penalty: false,
        },
        ("skip", []) => SurveyCommand::Confirm {
            acknowledge_penalty: true,
        },
        ("back" | "b", []) => SurveyCommand::Back,
        ("go" | "goto", [raw]) => {
            let number = raw
                .parse::<usize>()
                .ok()
                .filter(|n| *n >= 1)
                .ok_or_else(|| ParseError::InvalidQuestion(raw.to_string()))?;
            SurveyCommand::GoTo(number - 1)
        }
        ("go" | "goto", _) => return Err(ParseError::Usage("go <question number>")),
        ("show" | "s", []) => SurveyCommand::Show,
        ("leave" | "quit" | "exit" | "q", []) => return Ok(InputAction::RequestLeave),
        ("help" | "?" | "h", []) => return Ok(InputAction::Help),
        (other, rest) if other.starts_with(|c: char| c.is_ascii_digit()) => {
            return match rest {
                [participant] => parse_select(other, Some(*participant)),
                [] => parse_select(other, None),
                _ => Err(ParseError::Usage("<rank> <participant id>")),
            };
        }
        (
            "confirm" | "ok" | "skip" | "back" | "b" | "show" | "s" | "leave" | "quit" | "exit"
            | "q" | "help" | "?" | "h",
            _,
        ) => return Err(ParseError::Usage("one command per line")),
        (other, _) => return Err(ParseError::UnknownCommand(other.to_string())),
    };
    Ok(InputAction::Command(command))
}
