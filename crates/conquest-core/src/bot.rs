use conquest_protocol::{Intent, Phase, TerritoryId};

use crate::{capture_probability, GameState};

/// Produces a move for the current player. Implementations must be pure with respect to the
/// state they are given; the controller validates whatever they return.
pub trait BotDecisionSupplier: Send + Sync {
    fn decide(&self, state: &GameState) -> Intent;
}

impl<F> BotDecisionSupplier for F
where
    F: Fn(&GameState) -> Intent + Send + Sync,
{
    fn decide(&self, state: &GameState) -> Intent {
        self(state)
    }
}

/// Reference bot: takes the best odds it can find, reinforces the busiest front.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GreedyBot {
    /// Attacks below this capture probability are not attempted.
    pub min_capture_chance: f64,
}

impl Default for GreedyBot {
    fn default() -> Self {
        Self {
            min_capture_chance: 0.6,
        }
    }
}

impl GreedyBot {
    pub fn new(min_capture_chance: f64) -> Self {
        Self { min_capture_chance }
    }

    fn reinforce(&self, state: &GameState) -> Intent {
        let player = state.current_player();
        let front = state
            .owned_by(player)
            .map(|t| (state.attack_targets(t.id).len(), t.id))
            .min_by_key(|(enemies, id)| (std::cmp::Reverse(*enemies), *id))
            .map(|(_, id)| id);
        match front {
            Some(id) => Intent::DistributeReinforcements {
                distribution: [(id, state.entitlement(player))].into_iter().collect(),
            },
            None => Intent::SkipTurn,
        }
    }

    fn best_attack(&self, state: &GameState) -> Option<Intent> {
        let sources: Vec<TerritoryId> = match state.pending_selection() {
            Some(selected) => vec![selected],
            None => state.attack_sources(state.current_player()),
        };

        let mut best: Option<(f64, TerritoryId, TerritoryId, u32)> = None;
        for source in sources {
            let Some(committed) = state.territory(source).map(|t| t.armies.saturating_sub(1))
            else {
                continue;
            };
            if committed == 0 {
                continue;
            }
            for target in state.attack_targets(source) {
                let defenders = state.territory(target).map_or(0, |t| t.armies);
                let chance = capture_probability(committed, defenders);
                if best.map_or(true, |(top, ..)| chance > top) {
                    best = Some((chance, source, target, committed));
                }
            }
        }

        best.filter(|(chance, ..)| *chance >= self.min_capture_chance)
            .map(|(_, source, target, armies)| Intent::Attack {
                source,
                target,
                armies,
            })
    }
}

impl BotDecisionSupplier for GreedyBot {
    fn decide(&self, state: &GameState) -> Intent {
        match state.phase() {
            Phase::ReinforcementPhase => self.reinforce(state),
            Phase::SelectingAction | Phase::AwaitingAttackTarget => {
                self.best_attack(state).unwrap_or(Intent::SkipTurn)
            }
            Phase::GameEnded { .. } => Intent::SkipTurn,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use conquest_protocol::{AttackOutcome, GameCommand, Hex, PlayerId, RegionId};

    use super::*;
    use crate::{resolve, GameMap, Player, Region, RulesConfig, Territory};

    /// A row of five: owners and armies per territory.
    fn row(layout: [(u8, u32); 5]) -> GameState {
        let cells = (0..5).map(|q| (Hex::new(q, 0), RegionId(0))).collect();
        let regions = vec![Region {
            id: RegionId(0),
            name: "Row".into(),
            bonus: 2,
        }];
        let map = Arc::new(GameMap::new(cells, regions).expect("valid map"));
        let territories = layout
            .iter()
            .enumerate()
            .map(|(i, (owner, armies))| Territory {
                id: TerritoryId(i as u16),
                owner: Some(PlayerId(*owner)),
                armies: *armies,
            })
            .collect();
        let players = vec![Player::bot(PlayerId(0), "A"), Player::bot(PlayerId(1), "B")];
        GameState::new(map, players, territories, RulesConfig::default()).expect("valid state")
    }

    #[test]
    fn attacks_the_softest_target_with_all_but_one() {
        let state = row([(0, 2), (0, 8), (1, 1), (1, 6), (1, 1)]);
        assert_eq!(
            GreedyBot::default().decide(&state),
            Intent::Attack {
                source: TerritoryId(1),
                target: TerritoryId(2),
                armies: 7
            }
        );
    }

    #[test]
    fn skips_when_odds_are_poor() {
        let state = row([(0, 2), (1, 9), (1, 9), (1, 9), (1, 9)]);
        assert_eq!(GreedyBot::default().decide(&state), Intent::SkipTurn);
    }

    #[test]
    fn reinforces_the_busiest_front() {
        let state = row([(0, 1), (0, 6), (1, 1), (1, 1), (1, 1)]);
        let captured = resolve(
            &state,
            &GameCommand::Attack {
                source: TerritoryId(1),
                target: TerritoryId(2),
                armies: 5,
                outcome: AttackOutcome::forced_capture(0, 1),
            },
        )
        .expect("valid attack")
        .state;
        assert_eq!(captured.phase(), Phase::ReinforcementPhase);

        // T2 is the only territory touching an enemy.
        assert_eq!(
            GreedyBot::default().decide(&captured),
            Intent::DistributeReinforcements {
                distribution: [(TerritoryId(2), 3)].into_iter().collect()
            }
        );
    }

    #[test]
    fn closures_are_suppliers() {
        let bot = |_: &GameState| Intent::SkipTurn;
        let state = row([(0, 1), (0, 1), (1, 1), (1, 1), (1, 1)]);
        assert_eq!(bot.decide(&state), Intent::SkipTurn);
    }
}
