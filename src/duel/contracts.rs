//! Contract-based validation for duel transitions.
//!
//! Contracts define correctness through preconditions and postconditions:
//! `{P(state, action)} action {Q(before, after)}`.

use super::action::{Action, TimedAction, TransitionError};
use super::invariants::{DuelInvariants, InvariantSet, SessionView};
use super::phase::Phase;
use super::types::{PlayerId, QuestionId};
use chrono::{DateTime, Utc};
use tracing::{instrument, warn};

// ─────────────────────────────────────────────────────────────
//  Contract Trait
// ─────────────────────────────────────────────────────────────

/// A contract defines preconditions and postconditions for state transitions.
pub trait Contract<S, A> {
    /// Checks preconditions before applying the action.
    fn pre(state: &S, action: &A) -> Result<(), TransitionError>;

    /// Checks postconditions after applying the action.
    fn post(before: &S, after: &S) -> Result<(), TransitionError>;
}

// ─────────────────────────────────────────────────────────────
//  Preconditions
// ─────────────────────────────────────────────────────────────

/// Precondition: the session is in the expected phase.
pub struct InPhase;

impl InPhase {
    #[instrument(skip(view))]
    pub fn check(expected: Phase, view: &SessionView<'_>) -> Result<(), TransitionError> {
        let actual = *view.state.phase();
        if actual == expected {
            Ok(())
        } else {
            Err(TransitionError::InvalidPhase(actual))
        }
    }
}

/// Precondition: the player is on the roster.
pub struct KnownPlayer;

impl KnownPlayer {
    #[instrument(skip(view))]
    pub fn check(player: &PlayerId, view: &SessionView<'_>) -> Result<(), TransitionError> {
        if view.settings.has_player(player) {
            Ok(())
        } else {
            Err(TransitionError::UnknownPlayer(player.clone()))
        }
    }
}

/// Precondition: the player holds selection privilege.
pub struct ActivePlayer;

impl ActivePlayer {
    #[instrument(skip(view))]
    pub fn check(player: &PlayerId, view: &SessionView<'_>) -> Result<(), TransitionError> {
        if view.state.active_player().as_ref() == Some(player) {
            Ok(())
        } else {
            Err(TransitionError::NotActivePlayer(player.clone()))
        }
    }
}

/// Precondition: the question exists in the current round and is unresolved.
pub struct SelectableQuestion;

impl SelectableQuestion {
    #[instrument(skip(view))]
    pub fn check(question: QuestionId, view: &SessionView<'_>) -> Result<(), TransitionError> {
        let in_round = view
            .settings
            .round(*view.state.current_round())
            .and_then(|round| round.question(question))
            .is_some();
        if !in_round {
            return Err(TransitionError::UnknownQuestion(question));
        }
        if view.state.is_answered(question) {
            return Err(TransitionError::QuestionAlreadyAnswered(question));
        }
        Ok(())
    }
}

/// Precondition: the open question can still be captured.
///
/// A question held by someone reports `AlreadyCaptured` rather than a
/// phase error, so late buzzers learn who won the race.
pub struct CaptureOpen;

impl CaptureOpen {
    #[instrument(skip(view))]
    pub fn check(now: DateTime<Utc>, view: &SessionView<'_>) -> Result<(), TransitionError> {
        let state = view.state;
        match state.phase() {
            Phase::AwaitingCapture => {}
            Phase::AwaitingAnswer => {
                let holder = state.captured_by().clone().ok_or_else(|| {
                    TransitionError::InvariantViolation(
                        "AwaitingAnswer without a capturing player".to_string(),
                    )
                })?;
                return Err(TransitionError::AlreadyCaptured(holder));
            }
            other => return Err(TransitionError::InvalidPhase(*other)),
        }
        match state.capture_deadline() {
            Some(deadline) if now < *deadline => Ok(()),
            _ => Err(TransitionError::CaptureWindowExpired),
        }
    }
}

/// Precondition: the player has not yet used their attempt on this question.
pub struct FirstAttempt;

impl FirstAttempt {
    #[instrument(skip(view))]
    pub fn check(player: &PlayerId, view: &SessionView<'_>) -> Result<(), TransitionError> {
        if view.state.has_attempted(player) {
            Err(TransitionError::AlreadyAttempted(player.clone()))
        } else {
            Ok(())
        }
    }
}

/// Precondition: the player holds the open question.
pub struct CapturingPlayer;

impl CapturingPlayer {
    #[instrument(skip(view))]
    pub fn check(player: &PlayerId, view: &SessionView<'_>) -> Result<(), TransitionError> {
        if view.state.captured_by().as_ref() == Some(player) {
            Ok(())
        } else {
            Err(TransitionError::NotCapturingPlayer(player.clone()))
        }
    }
}

/// Precondition: the answer window is still open.
pub struct AnswerOpen;

impl AnswerOpen {
    #[instrument(skip(view))]
    pub fn check(now: DateTime<Utc>, view: &SessionView<'_>) -> Result<(), TransitionError> {
        match view.state.answer_deadline() {
            Some(deadline) if now < *deadline => Ok(()),
            _ => Err(TransitionError::AnswerWindowExpired),
        }
    }
}

// ─────────────────────────────────────────────────────────────
//  Composite preconditions, one per action
// ─────────────────────────────────────────────────────────────

/// Legal first-player selection.
pub struct LegalFirstPlayer;

impl LegalFirstPlayer {
    /// Validates all preconditions for `select_first_player`.
    pub fn check(player: &PlayerId, view: &SessionView<'_>) -> Result<(), TransitionError> {
        InPhase::check(Phase::AwaitingFirstPlayer, view)?;
        KnownPlayer::check(player, view)?;
        Ok(())
    }
}

/// Legal question selection.
pub struct LegalSelection;

impl LegalSelection {
    /// Validates all preconditions for `select_question`.
    pub fn check(
        player: &PlayerId,
        question: QuestionId,
        view: &SessionView<'_>,
    ) -> Result<(), TransitionError> {
        InPhase::check(Phase::AwaitingSelection, view)?;
        ActivePlayer::check(player, view)?;
        SelectableQuestion::check(question, view)?;
        Ok(())
    }
}

/// Legal capture.
pub struct LegalCapture;

impl LegalCapture {
    /// Validates all preconditions for `capture_question`.
    pub fn check(
        player: &PlayerId,
        now: DateTime<Utc>,
        view: &SessionView<'_>,
    ) -> Result<(), TransitionError> {
        CaptureOpen::check(now, view)?;
        KnownPlayer::check(player, view)?;
        FirstAttempt::check(player, view)?;
        Ok(())
    }
}

/// Legal answer.
pub struct LegalAnswer;

impl LegalAnswer {
    /// Validates all preconditions for `answer`.
    pub fn check(
        player: &PlayerId,
        now: DateTime<Utc>,
        view: &SessionView<'_>,
    ) -> Result<(), TransitionError> {
        InPhase::check(Phase::AwaitingAnswer, view)?;
        CapturingPlayer::check(player, view)?;
        AnswerOpen::check(now, view)?;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────
//  Action Contract (Pre + Post)
// ─────────────────────────────────────────────────────────────

/// Contract for every duel action.
///
/// Preconditions: the per-action composite checks above. `Tick` has none.
///
/// Postconditions:
/// - all [`DuelInvariants`] hold on the new snapshot
/// - the answered set only grows
/// - the score table keys are unchanged
/// - the version advanced by at most one
pub struct ActionContract;

impl<'a> Contract<SessionView<'a>, TimedAction> for ActionContract {
    fn pre(view: &SessionView<'a>, timed: &TimedAction) -> Result<(), TransitionError> {
        match &timed.action {
            Action::SelectFirstPlayer { player } => LegalFirstPlayer::check(player, view),
            Action::SelectQuestion { player, question } => {
                LegalSelection::check(player, *question, view)
            }
            Action::CaptureQuestion { player } => LegalCapture::check(player, timed.at, view),
            Action::Answer { player, .. } => LegalAnswer::check(player, timed.at, view),
            Action::Tick => Ok(()),
        }
    }

    fn post(before: &SessionView<'a>, after: &SessionView<'a>) -> Result<(), TransitionError> {
        let mut problems = Vec::new();

        if let Err(violations) = DuelInvariants::check_all(after) {
            problems.extend(violations.into_iter().map(|v| v.description));
        }
        if !before
            .state
            .answered_questions()
            .is_subset(after.state.answered_questions())
        {
            problems.push("Answered questions only grow".to_string());
        }
        let keys_before: Vec<_> = before.state.player_scores().keys().collect();
        let keys_after: Vec<_> = after.state.player_scores().keys().collect();
        if keys_before != keys_after {
            problems.push("Score table keys never change".to_string());
        }
        if after.state.version().saturating_sub(*before.state.version()) > 1 {
            problems.push("Version advances one step per transition".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            warn!(?problems, "Postcondition failed");
            Err(TransitionError::InvariantViolation(format!(
                "Postcondition failed: {}",
                problems.join("; ")
            )))
        }
    }
}
