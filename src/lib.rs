//! Quiz Duel library - buzzer-style quiz sessions
//!
//! A duel is a small state machine: the active player selects a question,
//! every player races to capture it, and the capturing player answers
//! against a deadline. All decisions are pure functions over immutable
//! snapshots; the session layer persists them in memory.
//!
//! # Architecture
//!
//! - **Duel**: settings resolver, session state, transition engine, event
//!   extractor and score projector
//! - **Config**: TOML quiz files
//! - **Session**: in-memory session store applying actions at clock time
//! - **Ticker**: background deadline enforcement
//!
//! # Example
//!
//! ```no_run
//! use quiz_duel::{Action, QuizConfig, SessionManager};
//!
//! # fn example() -> anyhow::Result<()> {
//! let settings = QuizConfig::from_file("quiz.toml")?.resolve(&[])?;
//! let manager = SessionManager::new();
//! let id = manager.create_session(settings);
//! manager.apply(id, Action::SelectFirstPlayer { player: "alice".into() })?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod config;
mod duel;
mod script;
mod session;
mod ticker;

// Crate-level exports - Core
pub use duel::{
    Action, ActionContract, Clock, Contract, DEFAULT_ANSWER_TIME_LIMIT,
    DEFAULT_CAPTURE_TIME_LIMIT, DuelInvariants, EventRecord, GameEvent, Invariant, InvariantSet,
    InvariantViolation, ManualClock, Phase, PlayerId, Question, QuestionId, Round, RoundId,
    ScoreDelta, SessionState, SessionView, Settings, SettingsError, SystemClock, TimeLimits,
    TimedAction, TimeoutWindow, TransitionError, extract_events, project_scores,
};

/// Transition engine operations.
pub mod engine {
    pub use crate::duel::{
        answer, apply, capture_question, create_initial_state, replay, select_first_player,
        select_question, tick,
    };
}

// Crate-level exports - Configuration
pub use config::{ConfigError, QuestionConfig, QuizConfig, RoundConfig, TimingConfig};
pub use script::{ReplayScript, ScriptStep};

// Crate-level exports - Session management
pub use session::{SessionError, SessionId, SessionManager, TransitionOutcome};

// Crate-level exports - Background ticking
pub use ticker::spawn as spawn_ticker;
