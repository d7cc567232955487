//! Duel session management.
//!
//! Holds every live session in memory: its settings, current snapshot,
//! append-only event log and score rows. Each operation loads the session,
//! runs the pure engine at the clock's current instant and commits the
//! result.

use crate::duel::{
    self, Action, Clock, EventRecord, PlayerId, Round, ScoreDelta, SessionState, Settings,
    SettingsError, SystemClock, TimeLimits, TransitionError,
};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use tracing::{debug, info, instrument, warn};

/// Unique identifier for a duel session.
pub type SessionId = u64;

/// Reasons a session operation fails.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::From)]
pub enum SessionError {
    /// No session with this id.
    #[display("Session {} not found", _0)]
    #[from(skip)]
    NotFound(SessionId),

    /// The engine rejected the action.
    #[display("{}", _0)]
    Transition(TransitionError),

    /// The roster or quiz could not be resolved.
    #[display("{}", _0)]
    Settings(SettingsError),
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::NotFound(_) => None,
            SessionError::Transition(e) => Some(e),
            SessionError::Settings(e) => Some(e),
        }
    }
}

/// Result of a committed operation.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct TransitionOutcome {
    /// Snapshot after the operation.
    state: SessionState,
    /// Events appended to the log, in order.
    events: Vec<EventRecord>,
    /// Score rows that changed.
    score_deltas: Vec<ScoreDelta>,
}

impl TransitionOutcome {
    /// Returns true if the operation changed the session.
    pub fn is_transition(&self) -> bool {
        !self.events.is_empty()
    }
}

#[derive(Debug)]
struct DuelSession {
    settings: Arc<Settings>,
    state: SessionState,
    events: Vec<EventRecord>,
    scores: BTreeMap<PlayerId, i64>,
}

impl DuelSession {
    fn new(settings: Settings) -> Self {
        let state = duel::create_initial_state(&settings);
        let scores = state.player_scores().clone();
        Self {
            settings: Arc::new(settings),
            state,
            events: Vec::new(),
            scores,
        }
    }

    /// Runs `action` against the current snapshot and commits the result.
    fn commit(
        &mut self,
        action: &Action,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<TransitionOutcome, TransitionError> {
        let mut next = duel::apply(action, &self.state, &self.settings, now)?;
        let events = duel::extract_events(&self.state, &next);
        let score_deltas = duel::project_scores(&self.state, &next);
        next.take_pending_events();

        for delta in &score_deltas {
            self.scores.insert(delta.player().clone(), *delta.score());
        }
        self.events.extend(events.iter().cloned());
        self.state = next;

        Ok(TransitionOutcome {
            state: self.state.clone(),
            events,
            score_deltas,
        })
    }
}

/// Manages all duel sessions.
///
/// Cloning is cheap and clones share the same sessions. Operations on one
/// session are serialized; different sessions proceed independently.
#[derive(Debug, Clone)]
pub struct SessionManager {
    sessions: Arc<RwLock<HashMap<SessionId, Arc<Mutex<DuelSession>>>>>,
    next_id: Arc<AtomicU64>,
    clock: Arc<dyn Clock>,
}

impl SessionManager {
    /// Creates a session manager reading the system clock.
    #[instrument]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates a session manager reading `clock`.
    #[instrument]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        info!("Creating session manager");
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
            clock,
        }
    }

    /// Creates a session from resolved settings.
    #[instrument(skip(self, settings), fields(players = settings.players().len()))]
    pub fn create_session(&self, settings: Settings) -> SessionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let session = DuelSession::new(settings);
        self.sessions
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, Arc::new(Mutex::new(session)));
        info!(session_id = id, "Created new session");
        id
    }

    /// Resolves a roster and quiz, then creates a session.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Settings`] if resolution fails.
    #[instrument(skip(self, players, rounds))]
    pub fn start_session(
        &self,
        players: Vec<PlayerId>,
        rounds: Vec<Round>,
        time_limits: TimeLimits,
    ) -> Result<SessionId, SessionError> {
        let settings = Settings::resolve(players, rounds, time_limits)?;
        Ok(self.create_session(settings))
    }

    /// Applies an action to a session at the clock's current instant.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotFound`] for an unknown session and
    /// [`SessionError::Transition`] when the engine rejects the action.
    /// A rejected action leaves the session untouched.
    #[instrument(skip(self), fields(%action))]
    pub fn apply(
        &self,
        session_id: SessionId,
        action: Action,
    ) -> Result<TransitionOutcome, SessionError> {
        let session = self.session(session_id)?;
        let mut session = lock(&session);
        let now = self.clock.now();

        let outcome = session.commit(&action, now).inspect_err(|e| {
            warn!(session_id, player = ?action.player(), error = %e, "Action rejected");
        })?;

        info!(
            session_id,
            version = outcome.state.version(),
            phase = %outcome.state.phase(),
            events = outcome.events.len(),
            "Action applied"
        );
        Ok(outcome)
    }

    /// Enforces elapsed deadlines on one session.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotFound`] for an unknown session.
    #[instrument(skip(self))]
    pub fn tick(&self, session_id: SessionId) -> Result<TransitionOutcome, SessionError> {
        self.apply(session_id, Action::Tick)
    }

    /// Enforces elapsed deadlines on every session.
    ///
    /// Returns the ids of sessions that changed.
    #[instrument(skip(self))]
    pub fn tick_all(&self) -> Vec<SessionId> {
        let sessions: Vec<_> = self
            .sessions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(id, session)| (*id, Arc::clone(session)))
            .collect();

        let mut changed = Vec::new();
        for (id, session) in sessions {
            let mut session = lock(&session);
            let now = self.clock.now();
            match session.commit(&Action::Tick, now) {
                Ok(outcome) if outcome.is_transition() => {
                    info!(session_id = id, version = outcome.state.version(), "Deadline enforced");
                    changed.push(id);
                }
                Ok(_) => {}
                Err(e) => warn!(session_id = id, error = %e, "Tick failed"),
            }
        }
        changed.sort_unstable();
        debug!(changed = changed.len(), "Ticked all sessions");
        changed
    }

    /// Current snapshot of a session.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotFound`] for an unknown session.
    #[instrument(skip(self))]
    pub fn state(&self, session_id: SessionId) -> Result<SessionState, SessionError> {
        let session = self.session(session_id)?;
        let state = lock(&session).state.clone();
        Ok(state)
    }

    /// Settings a session was created with.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotFound`] for an unknown session.
    #[instrument(skip(self))]
    pub fn settings(&self, session_id: SessionId) -> Result<Arc<Settings>, SessionError> {
        let session = self.session(session_id)?;
        let settings = Arc::clone(&lock(&session).settings);
        Ok(settings)
    }

    /// Full event log of a session.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotFound`] for an unknown session.
    #[instrument(skip(self))]
    pub fn events(&self, session_id: SessionId) -> Result<Vec<EventRecord>, SessionError> {
        let session = self.session(session_id)?;
        let events = lock(&session).events.clone();
        Ok(events)
    }

    /// Score rows of a session.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotFound`] for an unknown session.
    #[instrument(skip(self))]
    pub fn scores(&self, session_id: SessionId) -> Result<BTreeMap<PlayerId, i64>, SessionError> {
        let session = self.session(session_id)?;
        let scores = lock(&session).scores.clone();
        Ok(scores)
    }

    /// Lists all session ids in creation order.
    #[instrument(skip(self))]
    pub fn list_sessions(&self) -> Vec<SessionId> {
        let mut ids: Vec<_> = self
            .sessions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .copied()
            .collect();
        ids.sort_unstable();
        debug!(count = ids.len(), "Listed sessions");
        ids
    }

    fn session(&self, session_id: SessionId) -> Result<Arc<Mutex<DuelSession>>, SessionError> {
        self.sessions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&session_id)
            .cloned()
            .ok_or_else(|| {
                debug!(session_id, "Session not found");
                SessionError::NotFound(session_id)
            })
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

fn lock(session: &Mutex<DuelSession>) -> MutexGuard<'_, DuelSession> {
    session.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duel::{ManualClock, Question, QuestionId};
    use chrono::DateTime;
    use std::time::Duration;

    fn manager() -> (SessionManager, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        ));
        (SessionManager::with_clock(clock.clone()), clock)
    }

    fn paris() -> Settings {
        Settings::resolve(
            vec!["alice".into(), "bob".into()],
            vec![Round::new(1, vec![Question::new(1, 100, "Paris")])],
            TimeLimits::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_session_ids_are_sequential() {
        let (manager, _) = manager();
        let a = manager.create_session(paris());
        let b = manager.create_session(paris());
        assert_eq!(b, a + 1);
        assert_eq!(manager.list_sessions(), vec![a, b]);
    }

    #[test]
    fn test_rejected_action_leaves_session_untouched() {
        let (manager, _) = manager();
        let id = manager.create_session(paris());
        let before = manager.state(id).unwrap();

        let err = manager
            .apply(id, Action::CaptureQuestion { player: "bob".into() })
            .unwrap_err();
        assert!(matches!(err, SessionError::Transition(_)));
        assert_eq!(manager.state(id).unwrap(), before);
        assert!(manager.events(id).unwrap().is_empty());
    }

    #[test]
    fn test_scores_follow_deltas() {
        let (manager, _) = manager();
        let id = manager.create_session(paris());
        manager
            .apply(id, Action::SelectFirstPlayer { player: "alice".into() })
            .unwrap();
        manager
            .apply(
                id,
                Action::SelectQuestion {
                    player: "alice".into(),
                    question: QuestionId::new(1),
                },
            )
            .unwrap();
        manager
            .apply(id, Action::CaptureQuestion { player: "bob".into() })
            .unwrap();
        let outcome = manager
            .apply(
                id,
                Action::Answer {
                    player: "bob".into(),
                    text: "Lyon".to_string(),
                },
            )
            .unwrap();

        assert_eq!(outcome.score_deltas().len(), 1);
        assert!(outcome.state().pending_events().is_empty());
        assert_eq!(manager.scores(id).unwrap()[&PlayerId::from("bob")], -100);
        assert_eq!(manager.events(id).unwrap().len(), 4);
    }

    #[test]
    fn test_tick_all_reports_changed_sessions() {
        let (manager, clock) = manager();
        let idle = manager.create_session(paris());
        let live = manager.create_session(paris());
        manager
            .apply(live, Action::SelectFirstPlayer { player: "alice".into() })
            .unwrap();
        manager
            .apply(
                live,
                Action::SelectQuestion {
                    player: "alice".into(),
                    question: QuestionId::new(1),
                },
            )
            .unwrap();

        assert!(manager.tick_all().is_empty());
        clock.advance(Duration::from_secs(10));
        assert_eq!(manager.tick_all(), vec![live]);
        assert_eq!(manager.state(idle).unwrap().version(), &0);
    }

    #[test]
    fn test_unknown_session() {
        let (manager, _) = manager();
        assert_eq!(manager.tick(42).unwrap_err(), SessionError::NotFound(42));
    }

    #[test]
    fn test_start_session_resolves_settings() {
        let (manager, _) = manager();
        let err = manager
            .start_session(Vec::new(), Vec::new(), TimeLimits::default())
            .unwrap_err();
        assert_eq!(err, SessionError::Settings(SettingsError::EmptyRoster));
    }

    #[test]
    fn test_stored_snapshot_has_no_pending_events() {
        let (manager, _) = manager();
        let id = manager.create_session(paris());
        manager
            .apply(id, Action::SelectFirstPlayer { player: "alice".into() })
            .unwrap();
        let outcome = manager
            .apply(
                id,
                Action::SelectQuestion {
                    player: "alice".into(),
                    question: QuestionId::new(1),
                },
            )
            .unwrap();

        assert_eq!(outcome.events().len(), 1);
        assert!(manager.state(id).unwrap().pending_events().is_empty());
        assert_eq!(manager.events(id).unwrap().len(), 2);
    }
}
