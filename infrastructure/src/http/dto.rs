//! Wire shapes of the session service
//!
//! The service is not consistent about response envelopes, so every shape is
//! accepted here and normalized into domain types before anything else sees
//! it:
//!
//! - a bare value or `{"data": value}`
//! - question and participant lists bare or wrapped (`questions`, `participants`)
//! - end times as RFC 3339 strings or epoch milliseconds
//! - phase names in any case, `preparation` for `prep`

use super::error::{HttpServiceError, Result};
use chrono::{DateTime, Utc};
use huddle_domain::{
    CompletionStatus, Participant, ParticipantId, Phase, Question, RemotePhase,
};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

/// Parse a response body, accepting a `{"data": …}` envelope.
///
/// An empty body parses as `null`.
pub(crate) fn parse_body<T: DeserializeOwned>(raw: &str) -> Result<T> {
    let trimmed = raw.trim();
    let value: Value = if trimmed.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(trimmed).map_err(|e| HttpServiceError::ParseError {
            error: e.to_string(),
            raw: raw.to_string(),
        })?
    };
    let value = unwrap_envelope(value);
    serde_json::from_value(value).map_err(|e| HttpServiceError::ParseError {
        error: e.to_string(),
        raw: raw.to_string(),
    })
}

fn unwrap_envelope(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Either a bare list or an object holding the list under one key
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ListDto {
    Bare(Vec<Value>),
    Questions { questions: Vec<Value> },
    Participants { participants: Vec<Value> },
}

impl ListDto {
    fn into_items(self) -> Vec<Value> {
        match self {
            ListDto::Bare(items)
            | ListDto::Questions { questions: items }
            | ListDto::Participants {
                participants: items,
            } => items,
        }
    }
}

/// String or numeric identifier
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IdDto {
    Text(String),
    Number(i64),
}

impl IdDto {
    fn into_string(self) -> String {
        match self {
            IdDto::Text(s) => s,
            IdDto::Number(n) => n.to_string(),
        }
    }
}

fn default_weight() -> f64 {
    1.0
}

#[derive(Debug, Deserialize)]
struct QuestionDto {
    id: IdDto,
    #[serde(alias = "question")]
    text: String,
    #[serde(default = "default_weight")]
    weight: f64,
    #[serde(default)]
    levels: Vec<String>,
}

/// Questions that could be decoded; the rest are skipped.
///
/// Semantic validation (blank text, level filter, duplicates) happens in the
/// domain.
pub(crate) fn questions_from(list: ListDto) -> Vec<Question> {
    list.into_items()
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<QuestionDto>(item) {
            Ok(dto) => {
                Some(Question::new(dto.id.into_string(), dto.text, dto.weight).with_levels(dto.levels))
            }
            Err(e) => {
                debug!("Skipping undecodable question: {}", e);
                None
            }
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct ParticipantDto {
    #[serde(alias = "studentId", alias = "participantId")]
    id: IdDto,
    #[serde(default, alias = "displayName")]
    name: String,
}

pub(crate) fn participants_from(list: ListDto) -> Vec<Participant> {
    list.into_items()
        .into_iter()
        .filter_map(|item| {
            let dto = serde_json::from_value::<ParticipantDto>(item)
                .map_err(|e| debug!("Skipping undecodable participant: {}", e))
                .ok()?;
            let id = ParticipantId::new(dto.id.into_string())
                .map_err(|e| debug!("Skipping participant: {}", e))
                .ok()?;
            Some(Participant::new(id, dto.name))
        })
        .collect()
}

/// End time as RFC 3339 text or epoch milliseconds
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EndTimeDto {
    Millis(i64),
    Text(String),
}

impl EndTimeDto {
    fn to_utc(&self) -> Option<DateTime<Utc>> {
        match self {
            EndTimeDto::Millis(ms) => DateTime::from_timestamp_millis(*ms),
            EndTimeDto::Text(s) => DateTime::parse_from_rfc3339(s.trim())
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                .or_else(|| s.trim().parse::<i64>().ok().and_then(DateTime::from_timestamp_millis)),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PhaseDto {
    #[serde(alias = "currentPhase", alias = "status")]
    phase: String,
    #[serde(default, alias = "end_time", alias = "phaseEndTime")]
    end_time: Option<EndTimeDto>,
}

impl PhaseDto {
    pub(crate) fn into_remote(self) -> Result<RemotePhase> {
        let phase: Phase = self
            .phase
            .parse()
            .map_err(|e: huddle_domain::DomainError| {
                HttpServiceError::UnexpectedResponse(e.to_string())
            })?;
        let end_time = match &self.end_time {
            Some(raw) => {
                let parsed = raw.to_utc();
                if parsed.is_none() {
                    debug!("Ignoring unreadable end time {:?}", raw);
                }
                parsed
            }
            None => None,
        };
        Ok(RemotePhase::new(phase, end_time))
    }
}

/// Timeout check: a bare boolean or an object with a flag
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum TimeoutDto {
    Flag(bool),
    Object {
        #[serde(alias = "isTimedOut", alias = "timedOut")]
        timed_out: bool,
    },
}

impl TimeoutDto {
    pub(crate) fn is_timed_out(&self) -> bool {
        match self {
            TimeoutDto::Flag(flag) | TimeoutDto::Object { timed_out: flag } => *flag,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Penalty answer; an empty body means applied
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PenaltyDto {
    #[serde(default = "default_true")]
    pub applied: bool,
    #[serde(default, alias = "already_applied")]
    pub already_applied: bool,
}

impl Default for PenaltyDto {
    fn default() -> Self {
        Self {
            applied: true,
            already_applied: false,
        }
    }
}

impl PenaltyDto {
    pub(crate) fn newly_applied(&self) -> bool {
        self.applied && !self.already_applied
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct CompletionDto {
    #[serde(alias = "completedCount")]
    completed: u32,
    #[serde(alias = "totalCount", alias = "totalParticipants")]
    total: u32,
    #[serde(alias = "all_completed")]
    all_completed: bool,
}

impl From<CompletionDto> for CompletionStatus {
    fn from(dto: CompletionDto) -> Self {
        CompletionStatus::new(dto.completed, dto.total, dto.all_completed)
    }
}
