//! Session phase value object

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

/// Phase of a discussion session
///
/// Sessions move strictly forward: `prep → discussion → survey → done`.
/// Only `prep` and `discussion` are bounded by the session clock; the survey
/// is timed per question by the penalty escalator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Students read the topic and prepare
    #[serde(alias = "preparation")]
    Prep,
    /// Open group discussion
    Discussion,
    /// Peer-ranking survey
    Survey,
    /// Session finished
    Done,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Prep => "prep",
            Phase::Discussion => "discussion",
            Phase::Survey => "survey",
            Phase::Done => "done",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Phase::Prep => "Preparation",
            Phase::Discussion => "Discussion",
            Phase::Survey => "Peer Ranking",
            Phase::Done => "Done",
        }
    }

    /// The phase that follows this one, if any
    pub fn next(&self) -> Option<Phase> {
        match self {
            Phase::Prep => Some(Phase::Discussion),
            Phase::Discussion => Some(Phase::Survey),
            Phase::Survey => Some(Phase::Done),
            Phase::Done => None,
        }
    }

    /// Whether the session clock counts this phase down
    pub fn is_timed(&self) -> bool {
        matches!(self, Phase::Prep | Phase::Discussion)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Done)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl std::str::FromStr for Phase {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "prep" | "preparation" => Ok(Phase::Prep),
            "discussion" | "discuss" => Ok(Phase::Discussion),
            "survey" | "ranking" => Ok(Phase::Survey),
            "done" | "completed" | "finished" => Ok(Phase::Done),
            other => Err(DomainError::UnknownPhase(other.to_string())),
        }
    }
}

/// Full countdown length of each timed phase, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseDurations {
    pub prep_seconds: u64,
    pub discussion_seconds: u64,
}

impl Default for PhaseDurations {
    fn default() -> Self {
        Self {
            prep_seconds: 5 * 60,
            discussion_seconds: 10 * 60,
        }
    }
}

impl PhaseDurations {
    /// Countdown length when entering `phase` fresh (0 for untimed phases)
    pub fn full_duration(&self, phase: Phase) -> u64 {
        match phase {
            Phase::Prep => self.prep_seconds,
            Phase::Discussion => self.discussion_seconds,
            Phase::Survey | Phase::Done => 0,
        }
    }
}
