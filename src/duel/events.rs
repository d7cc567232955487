//! Domain events and the event extractor.
//!
//! Each transition branch records what it did as [`GameEvent`]s on the new
//! snapshot. The extractor turns those into immutable [`EventRecord`]s
//! stamped with the snapshot's version and timestamp, ready to be appended
//! to a durable log.

use super::state::SessionState;
use super::types::{PlayerId, QuestionId, RoundId};
use chrono::{DateTime, Utc};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// Which window ran out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutWindow {
    /// Nobody captured in time.
    Capture,
    /// The capturing player did not answer in time.
    Answer,
}

/// Something that happened in a duel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    /// Selection privilege was granted to the first player.
    FirstPlayerSelected {
        /// First player.
        player: PlayerId,
    },
    /// A question was opened for capture.
    QuestionSelected {
        /// Selecting player.
        player: PlayerId,
        /// Round the question belongs to.
        round: RoundId,
        /// Opened question.
        question: QuestionId,
    },
    /// A player won the capture race.
    QuestionCaptured {
        /// Capturing player.
        player: PlayerId,
        /// Captured question.
        question: QuestionId,
    },
    /// The capturing player answered.
    AnswerSubmitted {
        /// Answering player.
        player: PlayerId,
        /// Answered question.
        question: QuestionId,
        /// Submitted text.
        answer: String,
        /// Whether the answer matched.
        correct: bool,
        /// Score change applied to the player.
        score_delta: i64,
        /// Whether the question is now resolved.
        question_closed: bool,
    },
    /// A capture or answer window expired.
    QuestionTimedOut {
        /// Question in play.
        question: QuestionId,
        /// Expired window.
        window: TimeoutWindow,
        /// Capturing player, for answer timeouts.
        player: Option<PlayerId>,
        /// Score change applied to `player`.
        score_delta: i64,
        /// Whether the question is now resolved.
        question_closed: bool,
    },
    /// Every question has been resolved.
    GameCompleted {
        /// Final scores.
        scores: BTreeMap<PlayerId, i64>,
    },
}

impl GameEvent {
    /// Short name of the event kind.
    pub fn kind(&self) -> &'static str {
        match self {
            GameEvent::FirstPlayerSelected { .. } => "first_player_selected",
            GameEvent::QuestionSelected { .. } => "question_selected",
            GameEvent::QuestionCaptured { .. } => "question_captured",
            GameEvent::AnswerSubmitted { .. } => "answer_submitted",
            GameEvent::QuestionTimedOut { .. } => "question_timed_out",
            GameEvent::GameCompleted { .. } => "game_completed",
        }
    }
}

/// An event stamped for the append-only log.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct EventRecord {
    /// State version the event produced.
    version: u64,
    /// Position within the transition's events.
    index: usize,
    /// When the transition happened.
    occurred_at: Option<DateTime<Utc>>,
    /// The event itself.
    event: GameEvent,
}

/// Derives the ordered events produced by the transition `old` → `new`.
///
/// Returns nothing when `new` is not a later version of `old`, which is
/// the case for no-op ticks and rejected actions.
#[instrument(skip_all, fields(from = old.version(), to = new.version()))]
pub fn extract_events(old: &SessionState, new: &SessionState) -> Vec<EventRecord> {
    if new.version() <= old.version() {
        debug!("No transition, no events");
        return Vec::new();
    }

    let records: Vec<_> = new
        .pending_events()
        .iter()
        .enumerate()
        .map(|(index, event)| EventRecord {
            version: *new.version(),
            index,
            occurred_at: *new.updated_at(),
            event: event.clone(),
        })
        .collect();

    debug!(
        count = records.len(),
        kinds = ?records.iter().map(|r| r.event.kind()).collect::<Vec<_>>(),
        "Extracted events"
    );
    records
}
