use std::sync::Arc;

use conquest_protocol::{Phase, PlayerId, TerritoryId};
use serde::{Deserialize, Serialize};

use crate::{rules, GameMap, RulesConfig, StateError};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Territory {
    pub id: TerritoryId,
    /// `None` while unclaimed.
    pub owner: Option<PlayerId>,
    pub armies: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub is_bot: bool,
    #[serde(default)]
    pub eliminated: bool,
}

impl Player {
    pub fn human(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            is_bot: false,
            eliminated: false,
        }
    }

    pub fn bot(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            is_bot: true,
            ..Self::human(id, name)
        }
    }
}

/// Value snapshot of a match.
///
/// States are never edited in place once published: every transition clones the prior value
/// and returns a new one. The map is shared between versions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    map: Arc<GameMap>,
    rules: RulesConfig,
    /// Indexed by territory id.
    territories: Vec<Territory>,
    /// Indexed by player id; turn order is this order, skipping eliminated players.
    players: Vec<Player>,
    current_player: PlayerId,
    phase: Phase,
    pending_selection: Option<TerritoryId>,
    turn: u32,
}

impl GameState {
    /// Start a match. Players without territory start eliminated; the first remaining player
    /// moves first.
    pub fn new(
        map: Arc<GameMap>,
        mut players: Vec<Player>,
        territories: Vec<Territory>,
        rules: RulesConfig,
    ) -> Result<Self, StateError> {
        for player in players.iter_mut() {
            player.eliminated = !territories.iter().any(|t| t.owner == Some(player.id));
        }
        let current_player = players
            .iter()
            .find(|p| !p.eliminated)
            .map(|p| p.id)
            .ok_or(StateError::NotEnoughPlayers)?;

        let mut state = Self {
            map,
            rules,
            territories,
            players,
            current_player,
            phase: Phase::SelectingAction,
            pending_selection: None,
            turn: 1,
        };
        if state.alive_players().count() == 1 {
            state.phase = Phase::GameEnded {
                winner: current_player,
            };
        }
        state.validate()?;
        Ok(state)
    }

    pub fn with_rules(mut self, rules: RulesConfig) -> Self {
        self.rules = rules;
        self
    }

    pub fn map(&self) -> &GameMap {
        &self.map
    }

    pub fn rules(&self) -> &RulesConfig {
        &self.rules
    }

    pub fn territories(&self) -> &[Territory] {
        &self.territories
    }

    pub fn territory(&self, id: TerritoryId) -> Option<&Territory> {
        self.territories.get(id.index())
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(id.index())
    }

    pub fn current_player(&self) -> PlayerId {
        self.current_player
    }

    pub fn current(&self) -> Option<&Player> {
        self.player(self.current_player)
    }

    pub fn current_is_bot(&self) -> bool {
        self.current().is_some_and(|p| p.is_bot)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn pending_selection(&self) -> Option<TerritoryId> {
        self.pending_selection
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn is_over(&self) -> bool {
        self.phase.is_over()
    }

    pub fn winner(&self) -> Option<PlayerId> {
        self.phase.winner()
    }

    pub fn owned_by(&self, player: PlayerId) -> impl Iterator<Item = &Territory> + '_ {
        self.territories
            .iter()
            .filter(move |t| t.owner == Some(player))
    }

    pub fn territory_count(&self, player: PlayerId) -> usize {
        self.owned_by(player).count()
    }

    pub fn army_total(&self, player: PlayerId) -> u32 {
        self.owned_by(player).map(|t| t.armies).sum()
    }

    pub fn alive_players(&self) -> impl Iterator<Item = &Player> + '_ {
        self.players.iter().filter(|p| !p.eliminated)
    }

    /// The only player that owns territory, if exactly one does.
    pub fn sole_owner(&self) -> Option<PlayerId> {
        let mut owners = self.territories.iter().filter_map(|t| t.owner);
        let first = owners.next()?;
        owners.all(|owner| owner == first).then_some(first)
    }

    /// Reinforcement armies `player` may place right now.
    pub fn entitlement(&self, player: PlayerId) -> u32 {
        rules::entitlement(self, player)
    }

    /// Adjacent territories not owned by the owner of `source`.
    pub fn attack_targets(&self, source: TerritoryId) -> Vec<TerritoryId> {
        let Some(owner) = self.territory(source).and_then(|t| t.owner) else {
            return Vec::new();
        };
        self.map
            .neighbors(source)
            .filter(|id| self.territory(*id).is_some_and(|t| t.owner != Some(owner)))
            .collect()
    }

    /// An owned territory with at least two armies and an adjacent enemy.
    pub fn can_attack_from(&self, source: TerritoryId) -> bool {
        self.territory(source)
            .is_some_and(|t| t.owner.is_some() && t.armies >= 2)
            && !self.attack_targets(source).is_empty()
    }

    pub fn attack_sources(&self, player: PlayerId) -> Vec<TerritoryId> {
        self.owned_by(player)
            .map(|t| t.id)
            .filter(|id| self.can_attack_from(*id))
            .collect()
    }

    /// Check every snapshot invariant. Used on construction and before committing a loaded
    /// recording.
    pub fn validate(&self) -> Result<(), StateError> {
        if self.players.len() < 2 {
            return Err(StateError::NotEnoughPlayers);
        }
        for (index, player) in self.players.iter().enumerate() {
            if player.id.index() != index {
                return Err(StateError::PlayerIdMismatch {
                    index,
                    id: player.id,
                });
            }
        }

        if self.territories.len() != self.map.len() {
            return Err(StateError::TerritoryCountMismatch {
                expected: self.map.len(),
                found: self.territories.len(),
            });
        }
        for (index, territory) in self.territories.iter().enumerate() {
            if territory.id.index() != index {
                return Err(StateError::TerritoryIdMismatch {
                    index,
                    id: territory.id,
                });
            }
            let Some(owner) = territory.owner else {
                continue;
            };
            let Some(player) = self.player(owner) else {
                return Err(StateError::UnknownOwner {
                    territory: territory.id,
                    owner,
                });
            };
            if territory.armies == 0 {
                return Err(StateError::EmptyOwnedTerritory(territory.id));
            }
            if player.eliminated {
                return Err(StateError::EliminatedOwner {
                    player: owner,
                    territory: territory.id,
                });
            }
        }
        for player in self.players.iter().filter(|p| !p.eliminated) {
            if self.territory_count(player.id) == 0 {
                return Err(StateError::UnmarkedElimination(player.id));
            }
        }

        if self.turn == 0 {
            return Err(StateError::InvalidTurn);
        }

        let sole_owner = self.sole_owner();
        let selection_ok = match self.phase {
            Phase::GameEnded { winner } => {
                if sole_owner != Some(winner) {
                    return Err(StateError::WinnerMismatch {
                        recorded: winner,
                        actual: sole_owner,
                    });
                }
                self.pending_selection.is_none()
            }
            phase => {
                if let Some(owner) = sole_owner {
                    return Err(StateError::UndeclaredWinner(owner));
                }
                if self.current().map_or(true, |p| p.eliminated) {
                    return Err(StateError::InvalidCurrentPlayer(self.current_player));
                }
                match (phase, self.pending_selection) {
                    (Phase::AwaitingAttackTarget, Some(selected)) => self
                        .territory(selected)
                        .is_some_and(|t| t.owner == Some(self.current_player)),
                    (Phase::AwaitingAttackTarget, None) => false,
                    (_, selection) => selection.is_none(),
                }
            }
        };
        if !selection_ok {
            return Err(StateError::SelectionMismatch {
                phase: self.phase,
                selection: self.pending_selection,
            });
        }

        Ok(())
    }

    pub(crate) fn territory_mut(&mut self, id: TerritoryId) -> Option<&mut Territory> {
        self.territories.get_mut(id.index())
    }

    pub(crate) fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(id.index())
    }

    pub(crate) fn set_current_player(&mut self, player: PlayerId) {
        self.current_player = player;
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    pub(crate) fn set_pending_selection(&mut self, selection: Option<TerritoryId>) {
        self.pending_selection = selection;
    }

    pub(crate) fn set_turn(&mut self, turn: u32) {
        self.turn = turn;
    }
}
