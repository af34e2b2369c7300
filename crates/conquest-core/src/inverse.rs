use conquest_protocol::{Distribution, Phase, PlayerId, TerritoryId};
use serde::{Deserialize, Serialize};

use crate::{GameState, Territory};

/// Turn bookkeeping captured before a command runs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnFrame {
    pub current_player: PlayerId,
    pub turn: u32,
    pub phase: Phase,
    pub pending_selection: Option<TerritoryId>,
    /// Eliminated flag per player, by player id.
    pub eliminated: Vec<bool>,
}

impl TurnFrame {
    pub fn capture(state: &GameState) -> Self {
        Self {
            current_player: state.current_player(),
            turn: state.turn(),
            phase: state.phase(),
            pending_selection: state.pending_selection(),
            eliminated: state.players().iter().map(|p| p.eliminated).collect(),
        }
    }

    fn restore(&self, state: &mut GameState) {
        state.set_current_player(self.current_player);
        state.set_turn(self.turn);
        state.set_phase(self.phase);
        state.set_pending_selection(self.pending_selection);
        for (index, eliminated) in self.eliminated.iter().enumerate() {
            if let Some(player) = state.player_mut(PlayerId(index as u8)) {
                player.eliminated = *eliminated;
            }
        }
    }
}

/// Data that undoes one applied command exactly.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Inverse {
    /// Both territories as they were before the battle.
    Attack {
        source: Territory,
        target: Territory,
        frame: TurnFrame,
    },
    SkipTurn {
        frame: TurnFrame,
    },
    /// Armies to take back off each territory.
    DistributeReinforcements {
        #[serde(with = "conquest_protocol::distribution_pairs")]
        added: Distribution,
        frame: TurnFrame,
    },
}

impl Inverse {
    /// The state before the command, given the state right after it.
    pub fn revert(&self, state: &GameState) -> GameState {
        let mut prior = state.clone();
        match self {
            Inverse::Attack {
                source,
                target,
                frame,
            } => {
                for saved in [source, target] {
                    if let Some(territory) = prior.territory_mut(saved.id) {
                        *territory = saved.clone();
                    }
                }
                frame.restore(&mut prior);
            }
            Inverse::SkipTurn { frame } => frame.restore(&mut prior),
            Inverse::DistributeReinforcements { added, frame } => {
                for (id, armies) in added {
                    if let Some(territory) = prior.territory_mut(*id) {
                        debug_assert!(territory.armies >= *armies);
                        territory.armies = territory.armies.saturating_sub(*armies);
                    }
                }
                frame.restore(&mut prior);
            }
        }
        prior
    }
}
