//! Phase/field agreement: optional fields are present exactly when the phase says so.

use super::super::phase::Phase;
use super::{Invariant, SessionView};

/// Invariant: the phase determines which optional fields are set.
///
/// - an active player exists in every phase except `AwaitingFirstPlayer`
/// - a question is open only in `AwaitingCapture` and `AwaitingAnswer`
/// - a capture deadline exists only in `AwaitingCapture`
/// - `captured_by` and the answer deadline exist only in `AwaitingAnswer`
pub struct PhaseFieldsInvariant;

impl<'a> Invariant<SessionView<'a>> for PhaseFieldsInvariant {
    fn holds(view: &SessionView<'a>) -> bool {
        let state = view.state;
        let phase = *state.phase();

        let active_ok = state.active_player().is_some() != (phase == Phase::AwaitingFirstPlayer);
        let question_ok = state.current_question().is_some() == phase.has_open_question();
        let capture_ok = state.capture_deadline().is_some() == (phase == Phase::AwaitingCapture);
        let answer_ok = state.captured_by().is_some() == (phase == Phase::AwaitingAnswer)
            && state.answer_deadline().is_some() == (phase == Phase::AwaitingAnswer);
        let attempts_ok = phase.has_open_question() || state.attempted_by().is_empty();

        active_ok && question_ok && capture_ok && answer_ok && attempts_ok
    }

    fn description() -> &'static str {
        "Optional fields agree with the current phase"
    }
}
