//! Roster invariants: scores and player references stay within the roster.

use super::{Invariant, SessionView};
use std::collections::BTreeSet;

/// Invariant: the score table covers exactly the roster.
pub struct RosterScoresInvariant;

impl<'a> Invariant<SessionView<'a>> for RosterScoresInvariant {
    fn holds(view: &SessionView<'a>) -> bool {
        let roster: BTreeSet<_> = view.settings.players().iter().collect();
        let scored: BTreeSet<_> = view.state.player_scores().keys().collect();
        roster == scored
    }

    fn description() -> &'static str {
        "Score table keys match the roster"
    }
}

/// Invariant: every player the state refers to is a roster member, and the
/// capturing player has been charged an attempt.
pub struct ActivePlayerInvariant;

impl<'a> Invariant<SessionView<'a>> for ActivePlayerInvariant {
    fn holds(view: &SessionView<'a>) -> bool {
        let state = view.state;
        let settings = view.settings;

        let active_ok = state
            .active_player()
            .as_ref()
            .is_none_or(|p| settings.has_player(p));
        let captured_ok = state
            .captured_by()
            .as_ref()
            .is_none_or(|p| settings.has_player(p) && state.has_attempted(p));
        let attempts_ok = state.attempted_by().iter().all(|p| settings.has_player(p));

        active_ok && captured_ok && attempts_ok
    }

    fn description() -> &'static str {
        "Active, capturing and attempting players are roster members"
    }
}
