use std::collections::HashMap;

use conquest_protocol::{Hex, RegionId, TerritoryId};
use serde::{Deserialize, Serialize};

use crate::MapError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerritoryInfo {
    pub id: TerritoryId,
    pub hex: Hex,
    pub region: RegionId,
}

/// A group of territories whose complete ownership grants a reinforcement bonus.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub id: RegionId,
    pub name: String,
    pub bonus: u32,
}

/// Serialized form of a map; the hex index is rebuilt (and the layout re-validated) on load.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct MapLayout {
    territories: Vec<TerritoryInfo>,
    regions: Vec<Region>,
}

/// Static board topology. Two territories are adjacent iff their hexes are neighbours.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "MapLayout", into = "MapLayout")]
pub struct GameMap {
    territories: Vec<TerritoryInfo>,
    regions: Vec<Region>,
    by_hex: HashMap<Hex, TerritoryId>,
}

impl GameMap {
    /// Build a map from `(hex, region)` cells. Territory ids follow cell order.
    pub fn new(cells: Vec<(Hex, RegionId)>, regions: Vec<Region>) -> Result<Self, MapError> {
        let territories = cells
            .into_iter()
            .enumerate()
            .map(|(index, (hex, region))| {
                let raw = u16::try_from(index).map_err(|_| MapError::TooManyTerritories)?;
                Ok(TerritoryInfo {
                    id: TerritoryId(raw),
                    hex,
                    region,
                })
            })
            .collect::<Result<Vec<_>, MapError>>()?;
        Self::try_from(MapLayout {
            territories,
            regions,
        })
    }

    pub fn len(&self) -> usize {
        self.territories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.territories.is_empty()
    }

    pub fn territories(&self) -> &[TerritoryInfo] {
        &self.territories
    }

    pub fn territory_ids(&self) -> impl Iterator<Item = TerritoryId> + '_ {
        self.territories.iter().map(|t| t.id)
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn info(&self, id: TerritoryId) -> Option<&TerritoryInfo> {
        self.territories.get(id.index())
    }

    pub fn contains(&self, id: TerritoryId) -> bool {
        id.index() < self.territories.len()
    }

    pub fn territory_at(&self, hex: Hex) -> Option<TerritoryId> {
        self.by_hex.get(&hex).copied()
    }

    pub fn region(&self, id: RegionId) -> Option<&Region> {
        self.regions.get(id.index())
    }

    pub fn region_members(&self, region: RegionId) -> impl Iterator<Item = TerritoryId> + '_ {
        self.territories
            .iter()
            .filter(move |t| t.region == region)
            .map(|t| t.id)
    }

    /// Adjacent territories in direction order (E, NE, NW, W, SW, SE).
    pub fn neighbors(&self, id: TerritoryId) -> impl Iterator<Item = TerritoryId> + '_ {
        self.info(id)
            .into_iter()
            .flat_map(|info| info.hex.neighbors())
            .filter_map(|hex| self.territory_at(hex))
    }

    pub fn is_adjacent(&self, a: TerritoryId, b: TerritoryId) -> bool {
        match (self.info(a), self.info(b)) {
            (Some(a), Some(b)) => a.hex.is_adjacent(b.hex),
            _ => false,
        }
    }
}

impl PartialEq for GameMap {
    fn eq(&self, other: &Self) -> bool {
        self.territories == other.territories && self.regions == other.regions
    }
}

impl Eq for GameMap {}

impl TryFrom<MapLayout> for GameMap {
    type Error = MapError;

    fn try_from(layout: MapLayout) -> Result<Self, Self::Error> {
        if layout.territories.is_empty() {
            return Err(MapError::Empty);
        }
        for (index, region) in layout.regions.iter().enumerate() {
            if region.id.index() != index {
                return Err(MapError::NonContiguousRegion(region.id));
            }
        }

        let mut by_hex = HashMap::with_capacity(layout.territories.len());
        for (index, info) in layout.territories.iter().enumerate() {
            if info.id.index() != index {
                return Err(MapError::NonContiguousTerritory(info.id));
            }
            if info.region.index() >= layout.regions.len() {
                return Err(MapError::UnknownRegion {
                    territory: info.id,
                    region: info.region,
                });
            }
            if by_hex.insert(info.hex, info.id).is_some() {
                return Err(MapError::DuplicateHex(info.hex));
            }
        }

        Ok(Self {
            territories: layout.territories,
            regions: layout.regions,
            by_hex,
        })
    }
}

impl From<GameMap> for MapLayout {
    fn from(map: GameMap) -> Self {
        Self {
            territories: map.territories,
            regions: map.regions,
        }
    }
}
