//! Versioned session snapshot.

use super::events::GameEvent;
use super::phase::Phase;
use super::types::{PlayerId, QuestionId, RoundId};
use chrono::{DateTime, Utc};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, instrument};

/// Snapshot of a duel's progress.
///
/// Values are never mutated in place by callers: the engine clones the
/// current snapshot, changes the clone and hands it back. `version`
/// increases by one per successful transition.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct SessionState {
    /// Number of transitions applied so far.
    version: u64,
    /// Current stage.
    phase: Phase,
    /// Player with selection privilege.
    active_player: Option<PlayerId>,
    /// Round questions are currently drawn from.
    current_round: RoundId,
    /// Question in play.
    current_question: Option<QuestionId>,
    /// Capture window end, only while `AwaitingCapture`.
    capture_deadline: Option<DateTime<Utc>>,
    /// Answer window end, only while `AwaitingAnswer`.
    answer_deadline: Option<DateTime<Utc>>,
    /// Player holding the current question, only while `AwaitingAnswer`.
    captured_by: Option<PlayerId>,
    /// Players who have used their attempt on the current question.
    attempted_by: BTreeSet<PlayerId>,
    /// Resolved questions. Only ever grows.
    answered_questions: BTreeSet<QuestionId>,
    /// Score per roster member.
    player_scores: BTreeMap<PlayerId, i64>,
    /// Events produced by the last transition.
    pending_events: Vec<GameEvent>,
    /// Instant of the last transition, if any.
    updated_at: Option<DateTime<Utc>>,
}

impl SessionState {
    /// Creates the state of a freshly started duel.
    #[instrument(skip(player_ids), fields(players = player_ids.len(), %first_round))]
    pub fn initial(player_ids: &[PlayerId], first_round: RoundId) -> Self {
        info!("Creating initial session state");
        Self {
            version: 0,
            phase: Phase::AwaitingFirstPlayer,
            active_player: None,
            current_round: first_round,
            current_question: None,
            capture_deadline: None,
            answer_deadline: None,
            captured_by: None,
            attempted_by: BTreeSet::new(),
            answered_questions: BTreeSet::new(),
            player_scores: player_ids.iter().map(|p| (p.clone(), 0)).collect(),
            pending_events: Vec::new(),
            updated_at: None,
        }
    }

    /// Returns a player's score, if they are on the roster.
    pub fn score(&self, player: &PlayerId) -> Option<i64> {
        self.player_scores.get(player).copied()
    }

    /// Sum of all scores.
    pub fn total_score(&self) -> i64 {
        self.player_scores.values().sum()
    }

    /// Returns true if the question has been resolved.
    pub fn is_answered(&self, question: QuestionId) -> bool {
        self.answered_questions.contains(&question)
    }

    /// Returns true if the player already used their attempt on the open question.
    pub fn has_attempted(&self, player: &PlayerId) -> bool {
        self.attempted_by.contains(player)
    }

    /// Drains the events produced by the last transition.
    pub fn take_pending_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.pending_events)
    }

    // ─────────────────────────────────────────────────────────────
    //  Engine-only mutation
    // ─────────────────────────────────────────────────────────────

    /// Starts a new transition: bumps the version and clears stale events.
    pub(super) fn begin_transition(&mut self, now: DateTime<Utc>) {
        self.version += 1;
        self.pending_events.clear();
        self.updated_at = Some(now);
    }

    pub(super) fn push_event(&mut self, event: GameEvent) {
        self.pending_events.push(event);
    }

    pub(super) fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    pub(super) fn set_active_player(&mut self, player: PlayerId) {
        self.active_player = Some(player);
    }

    pub(super) fn set_current_round(&mut self, round: RoundId) {
        self.current_round = round;
    }

    /// Opens a question for capture.
    pub(super) fn open_question(&mut self, question: QuestionId, deadline: DateTime<Utc>) {
        self.current_question = Some(question);
        self.attempted_by.clear();
        self.reopen_capture(deadline);
    }

    /// Returns the open question to the capture race with a fresh window.
    pub(super) fn reopen_capture(&mut self, deadline: DateTime<Utc>) {
        self.captured_by = None;
        self.answer_deadline = None;
        self.capture_deadline = Some(deadline);
        self.phase = Phase::AwaitingCapture;
    }

    /// Hands the open question to a player.
    pub(super) fn capture(&mut self, player: PlayerId, deadline: DateTime<Utc>) {
        self.attempted_by.insert(player.clone());
        self.captured_by = Some(player);
        self.capture_deadline = None;
        self.answer_deadline = Some(deadline);
        self.phase = Phase::AwaitingAnswer;
    }

    /// Marks the open question resolved and clears all question fields.
    pub(super) fn close_question(&mut self) -> Option<QuestionId> {
        let question = self.current_question.take();
        if let Some(id) = question {
            self.answered_questions.insert(id);
        }
        self.captured_by = None;
        self.capture_deadline = None;
        self.answer_deadline = None;
        self.attempted_by.clear();
        question
    }

    /// Adds `delta` to a roster member's score. Unknown players are ignored.
    pub(super) fn adjust_score(&mut self, player: &PlayerId, delta: i64) {
        if let Some(score) = self.player_scores.get_mut(player) {
            *score += delta;
        }
    }

    #[cfg(test)]
    pub(crate) fn corrupt_phase_for_test(&mut self, phase: Phase) {
        self.phase = phase;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let players = vec![PlayerId::from("a"), PlayerId::from("b")];
        let state = SessionState::initial(&players, RoundId::new(1));
        assert_eq!(*state.phase(), Phase::AwaitingFirstPlayer);
        assert_eq!(*state.version(), 0);
        assert!(state.active_player().is_none());
        assert!(state.current_question().is_none());
        assert_eq!(state.score(&"a".into()), Some(0));
        assert_eq!(state.score(&"b".into()), Some(0));
        assert_eq!(state.score(&"c".into()), None);
        assert!(state.answered_questions().is_empty());
    }

    #[test]
    fn test_snapshot_serializes() {
        let players = vec![PlayerId::from("a")];
        let state = SessionState::initial(&players, RoundId::new(3));
        let json = serde_json::to_string(&state).unwrap();
        let back: SessionState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}
