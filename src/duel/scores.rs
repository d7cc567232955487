//! Score projector: which score rows a transition touched.

use super::state::SessionState;
use super::types::PlayerId;
use derive_getters::Getters;
use derive_new::new;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// New score for a player whose score changed.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize, new)]
pub struct ScoreDelta {
    /// Player whose row changed.
    player: PlayerId,
    /// Score after the transition.
    score: i64,
}

/// Lists every player whose score differs between `old` and `new`.
///
/// Players are listed in id order. Empty when no score changed.
#[instrument(skip_all, fields(from = old.version(), to = new.version()))]
pub fn project_scores(old: &SessionState, new: &SessionState) -> Vec<ScoreDelta> {
    let deltas: Vec<_> = new
        .player_scores()
        .iter()
        .filter(|(player, score)| old.score(player) != Some(**score))
        .map(|(player, score)| ScoreDelta::new(player.clone(), *score))
        .collect();
    debug!(changed = deltas.len(), "Projected score deltas");
    deltas
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duel::types::RoundId;

    #[test]
    fn test_unchanged_scores_project_nothing() {
        let players = vec![PlayerId::from("a"), PlayerId::from("b")];
        let state = SessionState::initial(&players, RoundId::new(1));
        assert!(project_scores(&state, &state.clone()).is_empty());
    }

    #[test]
    fn test_changed_score_is_projected() {
        let players = vec![PlayerId::from("a"), PlayerId::from("b")];
        let old = SessionState::initial(&players, RoundId::new(1));
        let mut new = old.clone();
        new.adjust_score(&"b".into(), -50);
        assert_eq!(
            project_scores(&old, &new),
            vec![ScoreDelta::new("b".into(), -50)]
        );
    }
}
