use serde::{Deserialize, Serialize};

use crate::{AttackOutcome, Distribution, GameCommand, Intent, PlayerId, TerritoryId};

/// Something that already happened. Fully serializable.
///
/// Events describe history; they are not a source of truth for state. Observers that need the
/// current state read the published state slot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GameEvent {
    // Game flow
    GameStarted {
        first_player: PlayerId,
    },
    TurnStarted {
        player: PlayerId,
        turn: u32,
    },
    TurnSkipped {
        player: PlayerId,
    },
    GameEnded {
        winner: PlayerId,
    },

    // Selection
    TerritorySelected {
        territory: TerritoryId,
    },
    SelectionCancelled,

    // Combat
    AttackExecuted {
        source: TerritoryId,
        target: TerritoryId,
        outcome: AttackOutcome,
    },
    PlayerEliminated {
        player: PlayerId,
    },

    // Reinforcement
    ReinforcementPhaseStarted {
        player: PlayerId,
        entitlement: u32,
    },
    ReinforcementPhaseCompleted {
        player: PlayerId,
        #[serde(with = "crate::command::distribution_pairs")]
        distribution: Distribution,
    },

    // Bots
    BotDecisionMade {
        player: PlayerId,
        command: Intent,
    },

    // History
    CommandUndone {
        command: GameCommand,
    },
    CommandRedone {
        command: GameCommand,
    },
    RecordingLoaded {
        turn: u32,
    },
}
