//! Immutable per-session configuration and the resolver that builds it.

use super::types::{PlayerId, Question, QuestionId, Round, RoundId};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Default capture window.
pub const DEFAULT_CAPTURE_TIME_LIMIT: Duration = Duration::from_secs(10);

/// Default answer window.
pub const DEFAULT_ANSWER_TIME_LIMIT: Duration = Duration::from_secs(20);

/// Quiz-wide capture and answer windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct TimeLimits {
    /// How long players have to capture a selected question.
    capture: Duration,
    /// How long the capturing player has to answer.
    answer: Duration,
}

impl TimeLimits {
    /// Creates time limits.
    pub fn new(capture: Duration, answer: Duration) -> Self {
        Self { capture, answer }
    }
}

impl Default for TimeLimits {
    fn default() -> Self {
        Self::new(DEFAULT_CAPTURE_TIME_LIMIT, DEFAULT_ANSWER_TIME_LIMIT)
    }
}

/// Reasons a roster/quiz combination cannot start a session.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum SettingsError {
    /// No players were supplied.
    #[display("Roster is empty")]
    EmptyRoster,

    /// A player appears twice in the roster.
    #[display("Player {} appears more than once in the roster", _0)]
    DuplicatePlayer(PlayerId),

    /// The quiz has no rounds.
    #[display("Quiz has no rounds")]
    NoRounds,

    /// Two rounds share an id.
    #[display("Round {} appears more than once", _0)]
    DuplicateRound(RoundId),

    /// A round has no questions.
    #[display("Round {} has no questions", _0)]
    EmptyRound(RoundId),

    /// A question is worth zero points.
    #[display("Question {} must be worth a positive number of points", _0)]
    NonPositivePoints(QuestionId),

    /// Two questions share an id.
    #[display("Question {} appears more than once", _0)]
    DuplicateQuestion(QuestionId),

    /// A capture or answer window is zero.
    #[display("Time limits must be non-zero")]
    ZeroTimeLimit,
}

impl std::error::Error for SettingsError {}

/// Immutable configuration for one duel.
///
/// Deserialized settings go through the same validation as
/// [`Settings::resolve`].
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
#[serde(try_from = "UnresolvedSettings")]
pub struct Settings {
    /// Participants in turn order.
    players: Vec<PlayerId>,
    /// Rounds in play order.
    rounds: Vec<Round>,
    /// Quiz-wide windows.
    time_limits: TimeLimits,
}

/// Wire form of [`Settings`] before validation.
#[derive(Deserialize)]
struct UnresolvedSettings {
    players: Vec<PlayerId>,
    rounds: Vec<Round>,
    time_limits: TimeLimits,
}

impl TryFrom<UnresolvedSettings> for Settings {
    type Error = SettingsError;

    fn try_from(raw: UnresolvedSettings) -> Result<Self, Self::Error> {
        Settings::resolve(raw.players, raw.rounds, raw.time_limits)
    }
}

impl Settings {
    /// Resolves a roster, quiz content and timing into validated settings.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] if the roster is empty or repeats a player,
    /// the quiz has no rounds, a round is empty, a question is worth zero
    /// points, ids collide, or a window is zero.
    #[instrument(skip_all, fields(players = players.len(), rounds = rounds.len()))]
    pub fn resolve(
        players: Vec<PlayerId>,
        rounds: Vec<Round>,
        time_limits: TimeLimits,
    ) -> Result<Self, SettingsError> {
        let settings = Self {
            players,
            rounds,
            time_limits,
        };
        settings.validate().inspect_err(|e| {
            warn!(error = %e, "Rejected session settings");
        })?;
        debug!(
            questions = settings.question_count(),
            "Settings resolved"
        );
        Ok(settings)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.players.is_empty() {
            return Err(SettingsError::EmptyRoster);
        }
        let mut seen_players = HashSet::new();
        for player in &self.players {
            if !seen_players.insert(player) {
                return Err(SettingsError::DuplicatePlayer(player.clone()));
            }
        }

        if self.rounds.is_empty() {
            return Err(SettingsError::NoRounds);
        }
        if self.time_limits.capture.is_zero() || self.time_limits.answer.is_zero() {
            return Err(SettingsError::ZeroTimeLimit);
        }

        let mut seen_rounds = HashSet::new();
        let mut seen_questions = HashSet::new();
        for round in &self.rounds {
            if !seen_rounds.insert(*round.id()) {
                return Err(SettingsError::DuplicateRound(*round.id()));
            }
            if round.questions().is_empty() {
                return Err(SettingsError::EmptyRound(*round.id()));
            }
            for question in round.questions() {
                if *question.points() == 0 {
                    return Err(SettingsError::NonPositivePoints(*question.id()));
                }
                if !seen_questions.insert(*question.id()) {
                    return Err(SettingsError::DuplicateQuestion(*question.id()));
                }
                let zero_override = [question.capture_time_limit(), question.answer_time_limit()]
                    .into_iter()
                    .any(|limit| limit.is_some_and(|d| d.is_zero()));
                if zero_override {
                    return Err(SettingsError::ZeroTimeLimit);
                }
            }
        }
        Ok(())
    }

    /// Returns true if the player is in the roster.
    pub fn has_player(&self, player: &PlayerId) -> bool {
        self.players.contains(player)
    }

    /// Returns the roster entry after `player`, wrapping around.
    ///
    /// Falls back to the first roster entry for unknown players, and to
    /// `player` itself if the roster is empty.
    pub fn next_player(&self, player: &PlayerId) -> PlayerId {
        self.players
            .iter()
            .position(|p| p == player)
            .and_then(|idx| self.players.get(idx + 1))
            .or_else(|| self.players.first())
            .cloned()
            .unwrap_or_else(|| player.clone())
    }

    /// Looks up a round by id.
    pub fn round(&self, id: RoundId) -> Option<&Round> {
        self.rounds.iter().find(|r| *r.id() == id)
    }

    /// Returns the first round's id, or round 0 if there are no rounds.
    pub fn first_round_id(&self) -> RoundId {
        self.rounds
            .first()
            .map_or(RoundId::new(0), |round| *round.id())
    }

    /// Looks up a question in any round.
    pub fn question(&self, id: QuestionId) -> Option<&Question> {
        self.rounds.iter().find_map(|r| r.question(id))
    }

    /// Total number of questions across all rounds.
    pub fn question_count(&self) -> usize {
        self.rounds.iter().map(|r| r.questions().len()).sum()
    }

    /// Effective capture window for a question.
    pub fn capture_time_limit(&self, question: &Question) -> Duration {
        question
            .capture_time_limit()
            .unwrap_or(self.time_limits.capture)
    }

    /// Effective answer window for a question.
    pub fn answer_time_limit(&self, question: &Question) -> Duration {
        question
            .answer_time_limit()
            .unwrap_or(self.time_limits.answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Vec<PlayerId> {
        vec!["alice".into(), "bob".into(), "carol".into()]
    }

    fn rounds() -> Vec<Round> {
        vec![Round::new(1, vec![Question::new(1, 100, "Paris")])]
    }

    #[test]
    fn test_resolve_valid_settings() {
        let settings = Settings::resolve(roster(), rounds(), TimeLimits::default()).unwrap();
        assert_eq!(settings.question_count(), 1);
        assert_eq!(settings.first_round_id(), RoundId::new(1));
    }

    #[test]
    fn test_empty_roster_rejected() {
        let result = Settings::resolve(vec![], rounds(), TimeLimits::default());
        assert_eq!(result, Err(SettingsError::EmptyRoster));
    }

    #[test]
    fn test_duplicate_player_rejected() {
        let players = vec!["alice".into(), "alice".into()];
        let result = Settings::resolve(players, rounds(), TimeLimits::default());
        assert!(matches!(result, Err(SettingsError::DuplicatePlayer(_))));
    }

    #[test]
    fn test_empty_round_rejected() {
        let rounds = vec![Round::new(7, vec![])];
        let result = Settings::resolve(roster(), rounds, TimeLimits::default());
        assert_eq!(result, Err(SettingsError::EmptyRound(RoundId::new(7))));
    }

    #[test]
    fn test_zero_points_rejected() {
        let rounds = vec![Round::new(1, vec![Question::new(9, 0, "x")])];
        let result = Settings::resolve(roster(), rounds, TimeLimits::default());
        assert_eq!(result, Err(SettingsError::NonPositivePoints(QuestionId::new(9))));
    }

    #[test]
    fn test_duplicate_question_across_rounds_rejected() {
        let rounds = vec![
            Round::new(1, vec![Question::new(1, 100, "a")]),
            Round::new(2, vec![Question::new(1, 200, "b")]),
        ];
        let result = Settings::resolve(roster(), rounds, TimeLimits::default());
        assert!(matches!(result, Err(SettingsError::DuplicateQuestion(_))));
    }

    #[test]
    fn test_zero_time_limit_rejected() {
        let limits = TimeLimits::new(Duration::ZERO, Duration::from_secs(5));
        let result = Settings::resolve(roster(), rounds(), limits);
        assert_eq!(result, Err(SettingsError::ZeroTimeLimit));
    }

    #[test]
    fn test_next_player_wraps() {
        let settings = Settings::resolve(roster(), rounds(), TimeLimits::default()).unwrap();
        assert_eq!(settings.next_player(&"alice".into()), PlayerId::from("bob"));
        assert_eq!(settings.next_player(&"carol".into()), PlayerId::from("alice"));
    }

    #[test]
    fn test_question_override_wins() {
        let question = Question::new(1, 100, "a").with_capture_time_limit(Duration::from_secs(3));
        let settings = Settings::resolve(
            roster(),
            vec![Round::new(1, vec![question.clone()])],
            TimeLimits::default(),
        )
        .unwrap();
        assert_eq!(settings.capture_time_limit(&question), Duration::from_secs(3));
        assert_eq!(settings.answer_time_limit(&question), DEFAULT_ANSWER_TIME_LIMIT);
    }

    #[test]
    fn test_deserialized_settings_are_validated() {
        let json = r#"{
            "players": [],
            "rounds": [],
            "time_limits": {
                "capture": { "secs": 10, "nanos": 0 },
                "answer": { "secs": 20, "nanos": 0 }
            }
        }"#;
        let err = serde_json::from_str::<Settings>(json).unwrap_err();
        assert!(err.to_string().contains("Roster is empty"));
    }

    #[test]
    fn test_valid_settings_survive_serde() {
        let settings = Settings::resolve(roster(), rounds(), TimeLimits::default()).unwrap();
        let json = serde_json::to_string(&settings).unwrap();
        let restored: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, settings);
    }

    #[test]
    fn test_next_player_for_unknown_player_is_first() {
        let settings = Settings::resolve(roster(), rounds(), TimeLimits::default()).unwrap();
        assert_eq!(settings.next_player(&"mallory".into()), PlayerId::from("alice"));
    }
}
