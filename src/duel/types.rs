//! Core identifier and quiz content types.

use derive_getters::Getters;
use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

/// Participant identifier.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Display, From, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    /// Creates a player id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PlayerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Round identifier.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    From,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct RoundId(u64);

impl RoundId {
    /// Creates a round id.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

/// Question identifier, unique across the whole quiz.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    From,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct QuestionId(u64);

impl QuestionId {
    /// Creates a question id.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

/// A single quiz question.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct Question {
    /// Question id.
    id: QuestionId,
    /// Points won on a correct answer and lost on a wrong one.
    points: u32,
    /// Reference answer text.
    answer: String,
    /// Capture window override; falls back to the quiz-wide limit.
    capture_time_limit: Option<std::time::Duration>,
    /// Answer window override; falls back to the quiz-wide limit.
    answer_time_limit: Option<std::time::Duration>,
}

impl Question {
    /// Creates a question that uses the quiz-wide time limits.
    pub fn new(id: u64, points: u32, answer: impl Into<String>) -> Self {
        Self {
            id: QuestionId(id),
            points,
            answer: answer.into(),
            capture_time_limit: None,
            answer_time_limit: None,
        }
    }

    /// Overrides the capture window for this question.
    pub fn with_capture_time_limit(mut self, limit: std::time::Duration) -> Self {
        self.capture_time_limit = Some(limit);
        self
    }

    /// Overrides the answer window for this question.
    pub fn with_answer_time_limit(mut self, limit: std::time::Duration) -> Self {
        self.answer_time_limit = Some(limit);
        self
    }

    /// Checks a submitted answer against the reference answer.
    ///
    /// Comparison ignores case and surrounding whitespace.
    pub fn is_correct(&self, submitted: &str) -> bool {
        submitted.trim().to_lowercase() == self.answer.trim().to_lowercase()
    }
}

/// An ordered group of questions.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct Round {
    /// Round id.
    id: RoundId,
    /// Questions in presentation order.
    questions: Vec<Question>,
}

impl Round {
    /// Creates a round.
    pub fn new(id: u64, questions: Vec<Question>) -> Self {
        Self {
            id: RoundId(id),
            questions,
        }
    }

    /// Looks up a question in this round.
    pub fn question(&self, id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_comparison_ignores_case() {
        let question = Question::new(1, 100, "Paris");
        assert!(question.is_correct("paris"));
        assert!(question.is_correct("PARIS"));
        assert!(question.is_correct("  Paris "));
        assert!(!question.is_correct("Lyon"));
    }

    #[test]
    fn test_round_lookup() {
        let round = Round::new(1, vec![Question::new(1, 100, "a"), Question::new(2, 200, "b")]);
        assert_eq!(*round.question(QuestionId::new(2)).map(|q| q.points()).unwrap(), 200);
        assert!(round.question(QuestionId::new(3)).is_none());
    }
}
