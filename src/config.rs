//! Quiz file loading.
//!
//! A quiz file is TOML: an optional default roster, quiz-wide timing and
//! the rounds with their questions. Resolving a quiz against a roster
//! yields validated [`Settings`].

use crate::duel::{PlayerId, Question, Round, Settings, TimeLimits};
use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Quiz file contents.
#[derive(Debug, Clone, Getters, Serialize, Deserialize)]
pub struct QuizConfig {
    /// Roster used when none is given explicitly.
    #[serde(default)]
    players: Vec<String>,

    /// Quiz-wide windows.
    #[serde(default)]
    timing: TimingConfig,

    /// Rounds in play order.
    #[serde(default)]
    rounds: Vec<RoundConfig>,
}

/// Quiz-wide capture and answer windows, in seconds.
#[derive(Debug, Clone, Copy, Getters, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Capture window.
    #[serde(default = "default_capture_secs")]
    capture_secs: u64,

    /// Answer window.
    #[serde(default = "default_answer_secs")]
    answer_secs: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            capture_secs: default_capture_secs(),
            answer_secs: default_answer_secs(),
        }
    }
}

fn default_capture_secs() -> u64 {
    crate::duel::DEFAULT_CAPTURE_TIME_LIMIT.as_secs()
}

fn default_answer_secs() -> u64 {
    crate::duel::DEFAULT_ANSWER_TIME_LIMIT.as_secs()
}

/// One round of the quiz file.
#[derive(Debug, Clone, Getters, Serialize, Deserialize)]
pub struct RoundConfig {
    /// Round id.
    id: u64,

    /// Questions in presentation order.
    #[serde(default)]
    questions: Vec<QuestionConfig>,
}

/// One question of the quiz file.
#[derive(Debug, Clone, Getters, Serialize, Deserialize)]
pub struct QuestionConfig {
    /// Question id, unique across the quiz.
    id: u64,

    /// Points at stake.
    points: u32,

    /// Reference answer.
    answer: String,

    /// Capture window override in seconds.
    capture_secs: Option<u64>,

    /// Answer window override in seconds.
    answer_secs: Option<u64>,
}

impl QuizConfig {
    /// Loads a quiz from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading quiz from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read quiz file: {}", e)))?;
        Self::from_toml_str(&content)
    }

    /// Parses a quiz from TOML text.
    #[instrument(skip(content))]
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ConfigError::new(format!("Failed to parse quiz: {}", e)))?;
        info!(
            rounds = config.rounds.len(),
            players = config.players.len(),
            "Quiz loaded"
        );
        Ok(config)
    }

    /// Resolves the quiz into session settings.
    ///
    /// Uses `roster` when non-empty, otherwise the file's own roster.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] wrapping the settings validation failure.
    #[instrument(skip(self, roster))]
    pub fn resolve(&self, roster: &[String]) -> Result<Settings, ConfigError> {
        let names = if roster.is_empty() {
            self.players.as_slice()
        } else {
            roster
        };
        let players = names.iter().map(PlayerId::new).collect();

        let rounds = self
            .rounds
            .iter()
            .map(|round| {
                let questions = round.questions.iter().map(QuestionConfig::to_question).collect();
                Round::new(round.id, questions)
            })
            .collect();

        let limits = TimeLimits::new(
            Duration::from_secs(self.timing.capture_secs),
            Duration::from_secs(self.timing.answer_secs),
        );

        Settings::resolve(players, rounds, limits)
            .map_err(|e| ConfigError::new(format!("Invalid quiz: {}", e)))
    }
}

impl QuestionConfig {
    fn to_question(&self) -> Question {
        let mut question = Question::new(self.id, self.points, self.answer.clone());
        if let Some(secs) = self.capture_secs {
            question = question.with_capture_time_limit(Duration::from_secs(secs));
        }
        if let Some(secs) = self.answer_secs {
            question = question.with_answer_time_limit(Duration::from_secs(secs));
        }
        question
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUIZ: &str = r#"
players = ["alice", "bob"]

[timing]
capture_secs = 5

[[rounds]]
id = 1

[[rounds.questions]]
id = 1
points = 100
answer = "Paris"

[[rounds.questions]]
id = 2
points = 200
answer = "Rome"
answer_secs = 45
"#;

    #[test]
    fn test_parse_and_resolve_with_file_roster() {
        let config = QuizConfig::from_toml_str(QUIZ).unwrap();
        let settings = config.resolve(&[]).unwrap();
        assert_eq!(settings.players().len(), 2);
        assert_eq!(settings.question_count(), 2);
        assert_eq!(*settings.time_limits().capture(), Duration::from_secs(5));
        assert_eq!(
            *settings.time_limits().answer(),
            crate::duel::DEFAULT_ANSWER_TIME_LIMIT
        );
    }

    #[test]
    fn test_explicit_roster_wins() {
        let config = QuizConfig::from_toml_str(QUIZ).unwrap();
        let settings = config
            .resolve(&["x".to_string(), "y".to_string(), "z".to_string()])
            .unwrap();
        assert_eq!(settings.players()[2], PlayerId::from("z"));
    }

    #[test]
    fn test_question_override_is_applied() {
        let config = QuizConfig::from_toml_str(QUIZ).unwrap();
        let settings = config.resolve(&[]).unwrap();
        let question = settings.question(crate::duel::QuestionId::new(2)).unwrap();
        assert_eq!(settings.answer_time_limit(question), Duration::from_secs(45));
    }

    #[test]
    fn test_malformed_toml_is_rejected() {
        let err = QuizConfig::from_toml_str("rounds = 3").unwrap_err();
        assert!(err.message.contains("Failed to parse quiz"));
    }

    #[test]
    fn test_empty_quiz_is_rejected_at_resolve() {
        let config = QuizConfig::from_toml_str("players = [\"a\"]").unwrap();
        let err = config.resolve(&[]).unwrap_err();
        assert!(err.message.contains("no rounds"));
    }
}
