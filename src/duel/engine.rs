//! Transition engine for quiz duels.
//!
//! Every operation takes the current snapshot by reference and returns a new
//! one; the input is never modified. Rejected actions return an error and
//! the caller keeps its old snapshot. Transition branches record what they
//! did as pending events on the new snapshot for the extractor to pick up.
//!
//! Contract enforcement:
//! - Preconditions checked always
//! - Postconditions checked in debug builds only

use super::action::{Action, TimedAction, TransitionError};
use super::contracts::{LegalAnswer, LegalCapture, LegalFirstPlayer, LegalSelection};
use super::events::{EventRecord, GameEvent, TimeoutWindow, extract_events};
use super::invariants::SessionView;
use super::phase::Phase;
use super::settings::Settings;
use super::state::SessionState;
use super::types::{PlayerId, Question, QuestionId};
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

#[cfg(debug_assertions)]
use super::contracts::{ActionContract, Contract};

// ─────────────────────────────────────────────────────────────
//  Construction
// ─────────────────────────────────────────────────────────────

/// Creates the initial snapshot for a session: roster from the settings,
/// first round selected, everyone at zero.
#[instrument(skip(settings))]
pub fn create_initial_state(settings: &Settings) -> SessionState {
    SessionState::initial(settings.players(), settings.first_round_id())
}

// ─────────────────────────────────────────────────────────────
//  Player actions
// ─────────────────────────────────────────────────────────────

/// Grants selection privilege to the first player.
///
/// # Errors
///
/// `InvalidPhase` outside `AwaitingFirstPlayer`, `UnknownPlayer` for
/// players not on the roster.
#[instrument(skip(state, settings), fields(version = state.version()))]
pub fn select_first_player(
    player: &PlayerId,
    state: &SessionState,
    settings: &Settings,
    now: DateTime<Utc>,
) -> Result<SessionState, TransitionError> {
    LegalFirstPlayer::check(player, &SessionView::new(state, settings))
        .inspect_err(|e| warn!(error = %e, "Rejected first-player selection"))?;

    let mut next = state.clone();
    next.begin_transition(now);
    next.set_active_player(player.clone());
    next.set_phase(Phase::AwaitingSelection);
    next.push_event(GameEvent::FirstPlayerSelected {
        player: player.clone(),
    });

    info!(%player, "First player selected");
    finish(state, next, settings)
}

/// Opens a question from the current round for capture.
///
/// # Errors
///
/// `InvalidPhase` outside `AwaitingSelection`, `NotActivePlayer`,
/// `UnknownQuestion` if the question is not in the current round,
/// `QuestionAlreadyAnswered`.
#[instrument(skip(state, settings), fields(version = state.version()))]
pub fn select_question(
    player: &PlayerId,
    question: QuestionId,
    state: &SessionState,
    settings: &Settings,
    now: DateTime<Utc>,
) -> Result<SessionState, TransitionError> {
    LegalSelection::check(player, question, &SessionView::new(state, settings))
        .inspect_err(|e| warn!(error = %e, "Rejected question selection"))?;
    let limit = settings.capture_time_limit(lookup(settings, question)?);

    let mut next = state.clone();
    next.begin_transition(now);
    next.open_question(question, deadline(now, limit));
    next.push_event(GameEvent::QuestionSelected {
        player: player.clone(),
        round: *state.current_round(),
        question,
    });

    info!(%player, %question, capture_deadline = ?next.capture_deadline(), "Question selected");
    finish(state, next, settings)
}

/// Claims the open question. The first legal call wins the race.
///
/// # Errors
///
/// `AlreadyCaptured` once someone holds the question, `InvalidPhase` when
/// no question is open, `UnknownPlayer`, `CaptureWindowExpired` at or after
/// the deadline, `AlreadyAttempted` for players who already had their turn
/// at this question.
#[instrument(skip(state, settings), fields(version = state.version()))]
pub fn capture_question(
    player: &PlayerId,
    state: &SessionState,
    settings: &Settings,
    now: DateTime<Utc>,
) -> Result<SessionState, TransitionError> {
    LegalCapture::check(player, now, &SessionView::new(state, settings))
        .inspect_err(|e| warn!(error = %e, "Rejected capture"))?;
    let question = open_question(state, settings)?;
    let limit = settings.answer_time_limit(question);

    let mut next = state.clone();
    next.begin_transition(now);
    next.capture(player.clone(), deadline(now, limit));
    next.push_event(GameEvent::QuestionCaptured {
        player: player.clone(),
        question: *question.id(),
    });

    info!(%player, question = %question.id(), answer_deadline = ?next.answer_deadline(), "Question captured");
    finish(state, next, settings)
}

/// Adjudicates the capturing player's answer.
///
/// A correct answer wins the question's points and passes selection to
/// the next player in the roster. A wrong answer costs the points and
/// reopens the question to players who have not tried it yet; once every
/// player has tried, the question closes unresolved and the last wrong
/// answer costs nothing.
///
/// # Errors
///
/// `InvalidPhase` outside `AwaitingAnswer`, `NotCapturingPlayer`,
/// `AnswerWindowExpired` at or after the deadline.
#[instrument(skip(state, settings, text), fields(version = state.version()))]
pub fn answer(
    player: &PlayerId,
    text: &str,
    state: &SessionState,
    settings: &Settings,
    now: DateTime<Utc>,
) -> Result<SessionState, TransitionError> {
    LegalAnswer::check(player, now, &SessionView::new(state, settings))
        .inspect_err(|e| warn!(error = %e, "Rejected answer"))?;
    let question = open_question(state, settings)?;

    let mut next = state.clone();
    next.begin_transition(now);

    let correct = question.is_correct(text);
    let (score_delta, question_closed) = if correct {
        let points = points(question);
        next.adjust_score(player, points);
        (points, true)
    } else {
        penalize(&mut next, settings, player, question)
    };
    next.push_event(GameEvent::AnswerSubmitted {
        player: player.clone(),
        question: *question.id(),
        answer: text.to_string(),
        correct,
        score_delta,
        question_closed,
    });
    info!(%player, question = %question.id(), correct, score_delta, question_closed, "Answer adjudicated");

    after_attempt(&mut next, settings, player, question, question_closed, now);
    finish(state, next, settings)
}

// ─────────────────────────────────────────────────────────────
//  Timer
// ─────────────────────────────────────────────────────────────

/// Enforces elapsed deadlines. Never fails.
///
/// Returns an identical snapshot when no deadline has elapsed, so it is
/// safe to call at any cadence.
#[instrument(skip(state, settings), fields(version = state.version(), phase = %state.phase()))]
pub fn tick(state: &SessionState, settings: &Settings, now: DateTime<Utc>) -> SessionState {
    let elapsed = |deadline: &Option<DateTime<Utc>>| deadline.is_some_and(|d| now >= d);

    if state.phase().is_terminal() {
        debug!("Duel complete, nothing to enforce");
        return state.clone();
    }

    let next = match state.phase() {
        Phase::AwaitingCapture if elapsed(state.capture_deadline()) => {
            capture_timeout(state, settings, now)
        }
        Phase::AwaitingAnswer if elapsed(state.answer_deadline()) => {
            answer_timeout(state, settings, now)
        }
        _ => {
            debug!("No deadline elapsed");
            return state.clone();
        }
    };

    match next {
        Ok(next) => next,
        Err(e) => {
            // Only reachable with a snapshot that does not belong to `settings`.
            warn!(error = %e, "Tick could not resolve an elapsed deadline");
            state.clone()
        }
    }
}

fn capture_timeout(
    state: &SessionState,
    settings: &Settings,
    now: DateTime<Utc>,
) -> Result<SessionState, TransitionError> {
    let question = open_question(state, settings)?;
    let selector = state
        .active_player()
        .clone()
        .ok_or_else(|| TransitionError::InvariantViolation("no active player".to_string()))?;

    let mut next = state.clone();
    next.begin_transition(now);
    next.push_event(GameEvent::QuestionTimedOut {
        question: *question.id(),
        window: TimeoutWindow::Capture,
        player: None,
        score_delta: 0,
        question_closed: true,
    });
    info!(question = %question.id(), "Capture window expired, question unresolved");

    resolve(&mut next, settings, &selector);
    finish(state, next, settings)
}

fn answer_timeout(
    state: &SessionState,
    settings: &Settings,
    now: DateTime<Utc>,
) -> Result<SessionState, TransitionError> {
    let question = open_question(state, settings)?;
    let player = state.captured_by().clone().ok_or_else(|| {
        TransitionError::InvariantViolation("no capturing player".to_string())
    })?;

    let mut next = state.clone();
    next.begin_transition(now);
    let (score_delta, question_closed) = penalize(&mut next, settings, &player, question);
    next.push_event(GameEvent::QuestionTimedOut {
        question: *question.id(),
        window: TimeoutWindow::Answer,
        player: Some(player.clone()),
        score_delta,
        question_closed,
    });
    info!(%player, question = %question.id(), score_delta, question_closed, "Answer window expired");

    after_attempt(&mut next, settings, &player, question, question_closed, now);
    finish(state, next, settings)
}

// ─────────────────────────────────────────────────────────────
//  Dispatch and replay
// ─────────────────────────────────────────────────────────────

/// Applies any action at instant `now`.
///
/// # Errors
///
/// Whatever the specific operation returns. `Tick` never fails.
#[instrument(skip(state, settings), fields(%action))]
pub fn apply(
    action: &Action,
    state: &SessionState,
    settings: &Settings,
    now: DateTime<Utc>,
) -> Result<SessionState, TransitionError> {
    match action {
        Action::SelectFirstPlayer { player } => select_first_player(player, state, settings, now),
        Action::SelectQuestion { player, question } => {
            select_question(player, *question, state, settings, now)
        }
        Action::CaptureQuestion { player } => capture_question(player, state, settings, now),
        Action::Answer { player, text } => answer(player, text, state, settings, now),
        Action::Tick => Ok(tick(state, settings, now)),
    }
}

/// Replays timed actions from a fresh session.
///
/// Returns the final snapshot and every event the replay produced.
///
/// # Errors
///
/// Stops at the first rejected action.
#[instrument(skip_all, fields(steps = steps.len()))]
pub fn replay(
    settings: &Settings,
    steps: &[TimedAction],
) -> Result<(SessionState, Vec<EventRecord>), TransitionError> {
    let mut state = create_initial_state(settings);
    let mut log = Vec::new();

    for step in steps {
        let mut next = apply(&step.action, &state, settings, step.at)?;
        log.extend(extract_events(&state, &next));
        next.take_pending_events();
        state = next;
    }

    info!(version = state.version(), events = log.len(), "Replay finished");
    Ok((state, log))
}

// ─────────────────────────────────────────────────────────────
//  Helpers
// ─────────────────────────────────────────────────────────────

fn deadline(now: DateTime<Utc>, limit: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(limit)
        .ok()
        .and_then(|limit| now.checked_add_signed(limit))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn points(question: &Question) -> i64 {
    i64::from(*question.points())
}

fn lookup(settings: &Settings, id: QuestionId) -> Result<&Question, TransitionError> {
    settings
        .question(id)
        .ok_or(TransitionError::UnknownQuestion(id))
}

fn open_question<'s>(
    state: &SessionState,
    settings: &'s Settings,
) -> Result<&'s Question, TransitionError> {
    let id = state.current_question().ok_or_else(|| {
        TransitionError::InvariantViolation("no question in play".to_string())
    })?;
    lookup(settings, id)
}

/// Charges a failed attempt. Returns `(score_delta, question_closed)`.
///
/// The attempt has already been recorded at capture time, so once every
/// roster member appears in the attempted set nobody is left to reopen the
/// question for and it closes without a score change.
fn penalize(
    next: &mut SessionState,
    settings: &Settings,
    player: &PlayerId,
    question: &Question,
) -> (i64, bool) {
    let everyone_tried = settings.players().iter().all(|p| next.has_attempted(p));
    if everyone_tried {
        debug!(question = %question.id(), "Every player has attempted, closing unresolved");
        (0, true)
    } else {
        let penalty = -points(question);
        next.adjust_score(player, penalty);
        (penalty, false)
    }
}

/// Either closes the question and rotates selection past `player`, or
/// reopens the capture race with a fresh window.
fn after_attempt(
    next: &mut SessionState,
    settings: &Settings,
    player: &PlayerId,
    question: &Question,
    question_closed: bool,
    now: DateTime<Utc>,
) {
    if question_closed {
        resolve(next, settings, player);
    } else {
        let reopened = deadline(now, settings.capture_time_limit(question));
        next.reopen_capture(reopened);
        debug!(capture_deadline = %reopened, "Capture window reopened");
    }
}

/// Closes the open question, passes selection to the roster entry after
/// `rotate_from`, and either moves on to the next selection or completes
/// the duel.
fn resolve(next: &mut SessionState, settings: &Settings, rotate_from: &PlayerId) {
    next.close_question();
    next.set_active_player(settings.next_player(rotate_from));

    let pending_round = settings
        .rounds()
        .iter()
        .find(|round| round.questions().iter().any(|q| !next.is_answered(*q.id())));

    match pending_round {
        Some(round) => {
            if *round.id() != *next.current_round() {
                info!(round = %round.id(), "Advancing to next round");
                next.set_current_round(*round.id());
            }
            next.set_phase(Phase::AwaitingSelection);
        }
        None => {
            next.set_phase(Phase::Complete);
            next.push_event(GameEvent::GameCompleted {
                scores: next.player_scores().clone(),
            });
            info!(scores = ?next.player_scores(), "Duel complete");
        }
    }
}

/// Verifies postconditions in debug builds and hands back the new snapshot.
fn finish(
    before: &SessionState,
    after: SessionState,
    settings: &Settings,
) -> Result<SessionState, TransitionError> {
    #[cfg(debug_assertions)]
    ActionContract::post(
        &SessionView::new(before, settings),
        &SessionView::new(&after, settings),
    )?;
    #[cfg(not(debug_assertions))]
    let _ = (before, settings);

    Ok(after)
}
