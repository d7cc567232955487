//! First-class invariants for quiz duels.
//!
//! Invariants are logical properties of a snapshot that must hold after
//! every transition. They are checked in debug builds and tested
//! independently.

pub mod completion;
pub mod phase_fields;
pub mod roster;

pub use completion::CompletionInvariant;
pub use phase_fields::PhaseFieldsInvariant;
pub use roster::{ActivePlayerInvariant, RosterScoresInvariant};

use super::settings::Settings;
use super::state::SessionState;

/// A logical property that must hold for a given state.
pub trait Invariant<S> {
    /// Checks if the invariant holds for the given state.
    fn holds(state: &S) -> bool;

    /// Human-readable description of the invariant.
    fn description() -> &'static str;
}

/// Violation of an invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantViolation {
    /// Description of the violated invariant.
    pub description: String,
}

impl InvariantViolation {
    /// Creates a new invariant violation.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }
}

/// A set of invariants that can be checked together.
///
/// Implementations are provided for tuples.
pub trait InvariantSet<S> {
    /// Checks all invariants in the set, collecting every violation.
    fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>>;
}

fn check<S, I: Invariant<S>>(state: &S, violations: &mut Vec<InvariantViolation>) {
    if !I::holds(state) {
        violations.push(InvariantViolation::new(I::description()));
    }
}

fn into_result(violations: Vec<InvariantViolation>) -> Result<(), Vec<InvariantViolation>> {
    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

impl<S, I1, I2> InvariantSet<S> for (I1, I2)
where
    I1: Invariant<S>,
    I2: Invariant<S>,
{
    fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>> {
        let mut violations = Vec::new();
        check::<S, I1>(state, &mut violations);
        check::<S, I2>(state, &mut violations);
        into_result(violations)
    }
}

impl<S, I1, I2, I3> InvariantSet<S> for (I1, I2, I3)
where
    I1: Invariant<S>,
    I2: Invariant<S>,
    I3: Invariant<S>,
{
    fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>> {
        let mut violations = Vec::new();
        check::<S, I1>(state, &mut violations);
        check::<S, I2>(state, &mut violations);
        check::<S, I3>(state, &mut violations);
        into_result(violations)
    }
}

impl<S, I1, I2, I3, I4> InvariantSet<S> for (I1, I2, I3, I4)
where
    I1: Invariant<S>,
    I2: Invariant<S>,
    I3: Invariant<S>,
    I4: Invariant<S>,
{
    fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>> {
        let mut violations = Vec::new();
        check::<S, I1>(state, &mut violations);
        check::<S, I2>(state, &mut violations);
        check::<S, I3>(state, &mut violations);
        check::<S, I4>(state, &mut violations);
        into_result(violations)
    }
}

/// A snapshot together with the settings it was produced under.
#[derive(Debug, Clone, Copy)]
pub struct SessionView<'a> {
    /// Snapshot under check.
    pub state: &'a SessionState,
    /// Settings the snapshot belongs to.
    pub settings: &'a Settings,
}

impl<'a> SessionView<'a> {
    /// Pairs a snapshot with its settings.
    pub fn new(state: &'a SessionState, settings: &'a Settings) -> Self {
        Self { state, settings }
    }
}

/// All duel invariants as a composable set.
pub type DuelInvariants = (
    PhaseFieldsInvariant,
    RosterScoresInvariant,
    ActivePlayerInvariant,
    CompletionInvariant,
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duel::engine;
    use crate::duel::phase::Phase;
    use crate::duel::types::QuestionId;
    use crate::duel::test_support::{paris_settings, t0};

    #[test]
    fn test_invariant_set_holds_for_initial_state() {
        let settings = paris_settings();
        let state = engine::create_initial_state(&settings);
        assert!(DuelInvariants::check_all(&SessionView::new(&state, &settings)).is_ok());
    }

    #[test]
    fn test_invariant_set_holds_mid_game() {
        let settings = paris_settings();
        let state = engine::create_initial_state(&settings);
        let state = engine::select_first_player(&"alice".into(), &state, &settings, t0()).unwrap();
        let state =
            engine::select_question(&"alice".into(), QuestionId::new(1), &state, &settings, t0()).unwrap();
        assert!(DuelInvariants::check_all(&SessionView::new(&state, &settings)).is_ok());
    }

    #[test]
    fn test_invariant_set_reports_every_violation() {
        let settings = paris_settings();
        let mut state = engine::create_initial_state(&settings);
        state.corrupt_phase_for_test(Phase::Complete);

        let violations =
            DuelInvariants::check_all(&SessionView::new(&state, &settings)).unwrap_err();
        assert_eq!(violations.len(), 2);
    }

    #[test]
    fn test_two_invariants_as_set() {
        let settings = paris_settings();
        let state = engine::create_initial_state(&settings);

        type TwoInvariants = (RosterScoresInvariant, ActivePlayerInvariant);
        assert!(TwoInvariants::check_all(&SessionView::new(&state, &settings)).is_ok());
    }
}
