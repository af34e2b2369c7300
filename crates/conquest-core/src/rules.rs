use conquest_protocol::{PlayerId, RegionId};
use serde::{Deserialize, Serialize};

use crate::GameState;

/// Tunable reinforcement rules, carried inside every [`GameState`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Floor on the per-phase entitlement of a player that still owns territory.
    pub min_reinforcement: u32,
    /// One reinforcement army per this many owned territories.
    pub territories_per_army: u32,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            min_reinforcement: 3,
            territories_per_army: 3,
        }
    }
}

/// Armies `player` may distribute, recomputed from current ownership.
///
/// `max(min_reinforcement, owned / territories_per_army)` plus the bonus of every region the
/// player owns completely. Players without territory are entitled to nothing.
pub fn entitlement(state: &GameState, player: PlayerId) -> u32 {
    let owned = state.territory_count(player) as u32;
    if owned == 0 {
        return 0;
    }

    let rules = state.rules();
    let base = (owned / rules.territories_per_army.max(1)).max(rules.min_reinforcement);
    let bonus: u32 = state
        .map()
        .regions()
        .iter()
        .filter(|region| region_owner(state, region.id) == Some(player))
        .map(|region| region.bonus)
        .sum();
    base + bonus
}

/// The player owning every territory of `region`, if there is one.
pub fn region_owner(state: &GameState, region: RegionId) -> Option<PlayerId> {
    let mut members = state.map().region_members(region);
    let first = members.next()?;
    let owner = state.territory(first)?.owner?;
    members
        .all(|id| state.territory(id).and_then(|t| t.owner) == Some(owner))
        .then_some(owner)
}
