//! Procedural board generation.
//!
//! Boards are hexagons of a given radius split into regions around randomly seeded centres.
//! Territories are shuffled and dealt round-robin so every player starts with the same count,
//! give or take one.

use std::sync::Arc;

use conquest_protocol::{Hex, PlayerId, RegionId, TerritoryId};

use crate::{GameMap, GameRng, GameState, Player, Region, RulesConfig, StateError, Territory};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayerSetup {
    pub name: String,
    pub is_bot: bool,
}

impl PlayerSetup {
    pub fn human(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_bot: false,
        }
    }

    pub fn bot(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_bot: true,
        }
    }
}

/// Configuration for board generation.
#[derive(Clone, Debug)]
pub struct MapGenConfig {
    /// Hex distance from the centre to the edge of the board.
    pub radius: u32,
    /// Number of regions; clamped to the number of territories.
    pub regions: u8,
    /// Armies placed on every dealt territory.
    pub initial_armies: u32,
    /// Seat order; ids are assigned by position.
    pub players: Vec<PlayerSetup>,
    pub rules: RulesConfig,
}

impl Default for MapGenConfig {
    fn default() -> Self {
        Self {
            radius: 3,
            regions: 6,
            initial_armies: 3,
            players: ["Amber", "Cobalt", "Crimson", "Verdant"]
                .into_iter()
                .map(PlayerSetup::bot)
                .collect(),
            rules: RulesConfig::default(),
        }
    }
}

const REGION_NAMES: [&str; 8] = [
    "Highmarch",
    "Saltreach",
    "Emberfold",
    "Greywater",
    "Thornvale",
    "Duskmoor",
    "Ironcliff",
    "Suncrest",
];

/// Generate a board and deal it to the configured players.
pub fn generate(config: &MapGenConfig, rng: &mut GameRng) -> Result<GameState, StateError> {
    if config.players.len() < 2 {
        return Err(StateError::NotEnoughPlayers);
    }

    let hexes: Vec<Hex> = Hex::ORIGIN
        .ring_inclusive(config.radius as i32)
        .collect();
    let region_count = usize::from(config.regions.max(1)).min(hexes.len());

    let mut centres = hexes.clone();
    rng.shuffle(&mut centres);
    centres.truncate(region_count);

    let cells: Vec<(Hex, RegionId)> = hexes
        .iter()
        .map(|hex| (*hex, nearest_region(*hex, &centres)))
        .collect();

    let regions = (0..region_count)
        .map(|index| {
            let size = cells.iter().filter(|(_, r)| r.index() == index).count() as u32;
            let name = match REGION_NAMES.get(index) {
                Some(name) => (*name).to_string(),
                None => format!("Region {}", index + 1),
            };
            Region {
                id: RegionId(index as u8),
                name,
                bonus: (size / 2).max(1),
            }
        })
        .collect();
    let map = Arc::new(GameMap::new(cells, regions)?);

    let players: Vec<Player> = config
        .players
        .iter()
        .enumerate()
        .map(|(index, setup)| Player {
            id: PlayerId(index as u8),
            name: setup.name.clone(),
            is_bot: setup.is_bot,
            eliminated: false,
        })
        .collect();

    let mut seats: Vec<PlayerId> = players.iter().map(|p| p.id).collect();
    rng.shuffle(&mut seats);
    let mut deal: Vec<TerritoryId> = map.territory_ids().collect();
    rng.shuffle(&mut deal);

    let mut territories: Vec<Territory> = map
        .territory_ids()
        .map(|id| Territory {
            id,
            owner: None,
            armies: 0,
        })
        .collect();
    for (turn, id) in deal.into_iter().enumerate() {
        let territory = &mut territories[id.index()];
        territory.owner = Some(seats[turn % seats.len()]);
        territory.armies = config.initial_armies.max(1);
    }

    GameState::new(map, players, territories, config.rules)
}

/// Region of the closest centre; ties go to the lower region index.
fn nearest_region(hex: Hex, centres: &[Hex]) -> RegionId {
    let index = centres
        .iter()
        .enumerate()
        .min_by_key(|(index, centre)| (hex.distance(**centre), *index))
        .map(|(index, _)| index)
        .unwrap_or(0);
    RegionId(index as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dealing_is_even_and_complete() {
        let mut rng = GameRng::seed_from_u64(42);
        let state = generate(&MapGenConfig::default(), &mut rng).expect("generated");

        assert_eq!(state.territories().len(), 37);
        assert!(state.territories().iter().all(|t| t.owner.is_some() && t.armies == 3));
        let counts: Vec<usize> = state
            .players()
            .iter()
            .map(|p| state.territory_count(p.id))
            .collect();
        let min = counts.iter().min().copied().unwrap_or(0);
        let max = counts.iter().max().copied().unwrap_or(0);
        assert!(max - min <= 1, "{counts:?}");
    }

    #[test]
    fn regions_cover_the_board_with_size_bonuses() {
        let mut rng = GameRng::seed_from_u64(3);
        let state = generate(&MapGenConfig::default(), &mut rng).expect("generated");
        let map = state.map();
        assert_eq!(map.regions().len(), 6);
        for region in map.regions() {
            let size = map.region_members(region.id).count() as u32;
            assert!(size > 0);
            assert_eq!(region.bonus, (size / 2).max(1));
        }
    }

    #[test]
    fn same_seed_same_board() {
        let config = MapGenConfig::default();
        let a = generate(&config, &mut GameRng::seed_from_u64(11)).expect("generated");
        let b = generate(&config, &mut GameRng::seed_from_u64(11)).expect("generated");
        assert_eq!(a, b);
    }

    #[test]
    fn lone_player_is_rejected() {
        let config = MapGenConfig {
            players: vec![PlayerSetup::human("Solo")],
            ..MapGenConfig::default()
        };
        let err = generate(&config, &mut GameRng::seed_from_u64(1)).expect_err("one player");
        assert_eq!(err, StateError::NotEnoughPlayers);
    }
}
