//! First-class actions and the errors they can raise.
//!
//! Actions are plain data: they can be scripted, logged and replayed
//! independently of the engine that applies them.

use super::phase::Phase;
use super::types::{PlayerId, QuestionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Anything a player or the timer can do to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    /// Grant selection privilege to the first player.
    SelectFirstPlayer {
        /// Player who selects first.
        player: PlayerId,
    },
    /// The active player opens a question.
    SelectQuestion {
        /// Acting player.
        player: PlayerId,
        /// Question to open.
        question: QuestionId,
    },
    /// A player buzzes in on the open question.
    CaptureQuestion {
        /// Acting player.
        player: PlayerId,
    },
    /// The capturing player answers.
    Answer {
        /// Acting player.
        player: PlayerId,
        /// Submitted answer text.
        text: String,
    },
    /// Time moved on; enforce elapsed deadlines.
    Tick,
}

impl Action {
    /// Returns the acting player, if the action has one.
    pub fn player(&self) -> Option<&PlayerId> {
        match self {
            Action::SelectFirstPlayer { player }
            | Action::SelectQuestion { player, .. }
            | Action::CaptureQuestion { player }
            | Action::Answer { player, .. } => Some(player),
            Action::Tick => None,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::SelectFirstPlayer { player } => write!(f, "{} goes first", player),
            Action::SelectQuestion { player, question } => {
                write!(f, "{} selects question {}", player, question)
            }
            Action::CaptureQuestion { player } => write!(f, "{} captures", player),
            Action::Answer { player, text } => write!(f, "{} answers {:?}", player, text),
            Action::Tick => write!(f, "tick"),
        }
    }
}

/// An action together with the instant it arrived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedAction {
    /// Arrival instant.
    pub at: DateTime<Utc>,
    /// The action.
    pub action: Action,
}

impl TimedAction {
    /// Pairs an action with its arrival instant.
    pub fn new(at: DateTime<Utc>, action: Action) -> Self {
        Self { at, action }
    }
}

/// Reasons an action is rejected. The session is left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum TransitionError {
    /// The action is not allowed in the current phase.
    #[display("Action not allowed while {}", _0)]
    InvalidPhase(Phase),

    /// Only the active player may select a question.
    #[display("It's not {}'s turn to select", _0)]
    NotActivePlayer(PlayerId),

    /// Only the capturing player may answer.
    #[display("{} has not captured this question", _0)]
    NotCapturingPlayer(PlayerId),

    /// The player is not on the roster.
    #[display("Unknown player {}", _0)]
    UnknownPlayer(PlayerId),

    /// The question is not part of the current round.
    #[display("Question {} is not in the current round", _0)]
    UnknownQuestion(QuestionId),

    /// The question was already resolved.
    #[display("Question {} has already been answered", _0)]
    QuestionAlreadyAnswered(QuestionId),

    /// The capture window closed.
    #[display("Capture window has expired")]
    CaptureWindowExpired,

    /// The answer window closed.
    #[display("Answer window has expired")]
    AnswerWindowExpired,

    /// Another player already holds the question.
    #[display("Question already captured by {}", _0)]
    AlreadyCaptured(PlayerId),

    /// The player already used their single attempt on this question.
    #[display("{} has already attempted this question", _0)]
    AlreadyAttempted(PlayerId),

    /// A postcondition failed after applying the action.
    #[display("Invariant violation: {}", _0)]
    InvariantViolation(String),
}

impl std::error::Error for TransitionError {}
