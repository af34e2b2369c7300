use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::TerritoryId;

/// Armies added per territory by a reinforcement distribution.
pub type Distribution = BTreeMap<TerritoryId, u32>;

/// Encodes a [`Distribution`] as `[territory, armies]` pairs.
///
/// Integer map keys do not survive JSON inside internally tagged enums, so distributions are
/// never written as maps.
pub mod distribution_pairs {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::Distribution;
    use crate::TerritoryId;

    pub fn serialize<S>(distribution: &Distribution, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(distribution.iter())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Distribution, D::Error>
    where
        D: Deserializer<'de>,
    {
        let pairs = Vec::<(TerritoryId, u32)>::deserialize(deserializer)?;
        Ok(pairs.into_iter().collect())
    }
}

/// What a human or a bot asks the controller to do. Fully serializable.
///
/// An intent carries no randomness; the controller resolves combat and turns it into a
/// [`GameCommand`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Intent {
    Attack {
        source: TerritoryId,
        target: TerritoryId,
        armies: u32,
    },
    SkipTurn,
    DistributeReinforcements {
        #[serde(with = "distribution_pairs")]
        distribution: Distribution,
    },
}

/// A self-contained, replayable unit of state mutation.
///
/// `Attack` carries its already-resolved [`AttackOutcome`]; applying it never rolls dice, so
/// redo and replay reproduce the recorded result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GameCommand {
    Attack {
        source: TerritoryId,
        target: TerritoryId,
        armies: u32,
        outcome: AttackOutcome,
    },
    SkipTurn,
    DistributeReinforcements {
        #[serde(with = "distribution_pairs")]
        distribution: Distribution,
    },
}

impl GameCommand {
    pub fn name(&self) -> &'static str {
        match self {
            GameCommand::Attack { .. } => "attack",
            GameCommand::SkipTurn => "skip_turn",
            GameCommand::DistributeReinforcements { .. } => "distribute_reinforcements",
        }
    }
}

/// Dice thrown in one exchange of a battle, each side sorted highest first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatRound {
    pub attacker_dice: Vec<u8>,
    pub defender_dice: Vec<u8>,
}

/// Resolved result of a battle.
///
/// A battle ends either in a capture (every defender lost, at least one committed attacker
/// survives and moves in) or a repulse (every committed attacker lost).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackOutcome {
    pub attacker_losses: u32,
    pub defender_losses: u32,
    pub captured: bool,
    #[serde(default)]
    pub rounds: Vec<CombatRound>,
}

impl AttackOutcome {
    /// Outcome where the target falls. Used for scripted battles and tests.
    pub fn forced_capture(attacker_losses: u32, defender_losses: u32) -> Self {
        Self {
            attacker_losses,
            defender_losses,
            captured: true,
            rounds: Vec::new(),
        }
    }

    /// Outcome where the attack is thrown back. Used for scripted battles and tests.
    pub fn forced_repulse(attacker_losses: u32, defender_losses: u32) -> Self {
        Self {
            attacker_losses,
            defender_losses,
            captured: false,
            rounds: Vec::new(),
        }
    }

    /// Attackers that survive the battle (they occupy the target on capture).
    pub fn survivors(&self, committed: u32) -> u32 {
        committed.saturating_sub(self.attacker_losses)
    }
}
