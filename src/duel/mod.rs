//! Buzzer-style quiz duel core.
//!
//! Pure decision logic: settings and a snapshot go in, a new snapshot with
//! pending events comes out. Nothing in this module performs I/O or reads
//! the clock; callers pass the current instant explicitly.

mod action;
mod clock;
mod contracts;
mod engine;
mod events;
mod invariants;
mod phase;
mod scores;
mod settings;
mod state;
mod types;

#[cfg(test)]
mod test_support;

pub use action::{Action, TimedAction, TransitionError};
pub use clock::{Clock, ManualClock, SystemClock};
pub use contracts::{ActionContract, Contract};
pub use engine::{
    answer, apply, capture_question, create_initial_state, replay, select_first_player,
    select_question, tick,
};
pub use events::{EventRecord, GameEvent, TimeoutWindow, extract_events};
pub use invariants::{DuelInvariants, Invariant, InvariantSet, InvariantViolation, SessionView};
pub use phase::Phase;
pub use scores::{ScoreDelta, project_scores};
pub use settings::{
    DEFAULT_ANSWER_TIME_LIMIT, DEFAULT_CAPTURE_TIME_LIMIT, Settings, SettingsError, TimeLimits,
};
pub use state::SessionState;
pub use types::{PlayerId, Question, QuestionId, Round, RoundId};
