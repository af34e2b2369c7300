use serde::{Deserialize, Serialize};

use crate::{Phase, PlayerId, TerritoryId};

/// Presentation-ready view of the match, derived from the game state and history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiState {
    pub turn: u32,
    pub current_player: PlayerId,
    pub current_is_bot: bool,
    pub phase: Phase,
    pub selected: Option<TerritoryId>,
    /// Own territories the current player may attack from.
    #[serde(default)]
    pub selectable_sources: Vec<TerritoryId>,
    /// Enemy territories reachable from the selection.
    #[serde(default)]
    pub attack_targets: Vec<TerritoryId>,
    /// Armies left to place while in the reinforcement phase.
    pub reinforcement_entitlement: Option<u32>,
    pub can_undo: bool,
    pub can_redo: bool,
    pub winner: Option<PlayerId>,
}
