//! Session phases.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

/// Discrete stage of a duel.
///
/// Each phase fixes which optional state fields are present:
///
/// | Phase                 | question | capture deadline | captured by | answer deadline |
/// |-----------------------|----------|------------------|-------------|-----------------|
/// | `AwaitingFirstPlayer` | no       | no               | no          | no              |
/// | `AwaitingSelection`   | no       | no               | no          | no              |
/// | `AwaitingCapture`     | yes      | yes              | no          | no              |
/// | `AwaitingAnswer`      | yes      | no               | yes         | yes             |
/// | `Complete`            | no       | no               | no          | no              |
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize, Deserialize,
)]
pub enum Phase {
    /// Nobody has been given selection privilege yet.
    AwaitingFirstPlayer,
    /// The active player picks the next question.
    AwaitingSelection,
    /// A question is open and players race to capture it.
    AwaitingCapture,
    /// The capturing player must answer.
    AwaitingAnswer,
    /// Every question has been resolved.
    Complete,
}

impl Phase {
    /// Returns true if a question is currently in play.
    pub fn has_open_question(self) -> bool {
        matches!(self, Phase::AwaitingCapture | Phase::AwaitingAnswer)
    }

    /// Returns true once the duel is over.
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Complete)
    }
}
