//! Question entities

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Number of questions in the built-in fallback set
pub const FALLBACK_QUESTION_COUNT: usize = 3;

/// A survey question (Value Object)
///
/// Immutable once fetched and shared read-only by every participant of a
/// level. An empty `levels` list means the question applies to all levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub text: String,
    pub weight: f64,
    #[serde(default)]
    pub levels: Vec<String>,
}

impl Question {
    pub fn new(id: impl Into<String>, text: impl Into<String>, weight: f64) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            weight,
            levels: Vec::new(),
        }
    }

    pub fn with_levels(mut self, levels: Vec<String>) -> Self {
        self.levels = levels;
        self
    }

    /// Whether the question carries everything the survey needs
    pub fn is_well_formed(&self) -> bool {
        !self.id.trim().is_empty()
            && !self.text.trim().is_empty()
            && self.weight.is_finite()
            && self.weight >= 0.0
    }

    pub fn applies_to(&self, level: &str) -> bool {
        self.levels.is_empty() || self.levels.iter().any(|l| l.eq_ignore_ascii_case(level))
    }
}

/// The questions a survey runs on, after validation
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionSet {
    questions: Vec<Question>,
    is_fallback: bool,
}

impl QuestionSet {
    /// Validate fetched questions for `level`.
    ///
    /// Malformed entries, entries for other levels and duplicate ids are
    /// dropped. If nothing usable remains the fallback set is returned, so
    /// the survey never stalls on a bad question bank.
    pub fn validated(questions: Vec<Question>, level: &str) -> Self {
        let mut seen = HashSet::new();
        let usable: Vec<Question> = questions
            .into_iter()
            .filter(|q| q.is_well_formed() && q.applies_to(level))
            .filter(|q| seen.insert(q.id.clone()))
            .collect();

        if usable.is_empty() {
            Self::fallback()
        } else {
            Self {
                questions: usable,
                is_fallback: false,
            }
        }
    }

    /// Built-in three-question set
    pub fn fallback() -> Self {
        Self {
            questions: vec![
                Question::new(
                    "fallback-1",
                    "Who contributed the most relevant ideas to the discussion?",
                    1.0,
                ),
                Question::new(
                    "fallback-2",
                    "Who best built on or responded to other participants' points?",
                    1.0,
                ),
                Question::new(
                    "fallback-3",
                    "Who communicated their position most clearly?",
                    1.0,
                ),
            ],
            is_fallback: true,
        }
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn is_fallback(&self) -> bool {
        self.is_fallback
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }
}
