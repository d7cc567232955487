//! Completion invariant: the duel is complete exactly when every question is resolved.

use super::super::phase::Phase;
use super::{Invariant, SessionView};

/// Invariant: `Complete` iff every quiz question is in the answered set,
/// and the answered set only contains quiz questions.
pub struct CompletionInvariant;

impl<'a> Invariant<SessionView<'a>> for CompletionInvariant {
    fn holds(view: &SessionView<'a>) -> bool {
        let answered = view.state.answered_questions();
        let known = answered
            .iter()
            .all(|id| view.settings.question(*id).is_some());
        let all_answered = answered.len() == view.settings.question_count();

        known && all_answered == (*view.state.phase() == Phase::Complete)
    }

    fn description() -> &'static str {
        "Duel is complete exactly when all questions are answered"
    }
}
