use serde::{Deserialize, Serialize};

use crate::PlayerId;

/// Stage of the current player's turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Phase {
    /// Choosing an attack source, skipping, or waiting for a reinforcement trigger.
    SelectingAction,
    /// A source territory is selected and a target is pending.
    AwaitingAttackTarget,
    /// The current player must distribute their entitlement after a capture.
    ReinforcementPhase,
    /// Terminal: only one player still owns territory.
    GameEnded { winner: PlayerId },
}

impl Phase {
    pub fn is_over(self) -> bool {
        matches!(self, Phase::GameEnded { .. })
    }

    pub fn winner(self) -> Option<PlayerId> {
        match self {
            Phase::GameEnded { winner } => Some(winner),
            _ => None,
        }
    }
}
