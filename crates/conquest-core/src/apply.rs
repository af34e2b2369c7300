use conquest_protocol::{Distribution, GameCommand, GameEvent, Intent, Phase, TerritoryId};
use tracing::debug;

use crate::combat::{outcome_is_consistent, resolve_attack};
use crate::turn::{advance_turn, check_winner};
use crate::{GameRng, GameState, Inverse, InvalidCommand, Territory, TurnFrame};

/// A new state value plus the events describing how it was reached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Applied {
    pub state: GameState,
    pub events: Vec<GameEvent>,
}

/// Result of applying a command: the new state, what undoes it, and what happened.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub state: GameState,
    pub inverse: Inverse,
    pub events: Vec<GameEvent>,
}

/// Check every precondition of `command` against `state` without touching it.
pub fn validate(state: &GameState, command: &GameCommand) -> Result<(), InvalidCommand> {
    match command {
        GameCommand::Attack {
            source,
            target,
            armies,
            outcome,
        } => {
            let (_, defender) = check_attack(state, *source, *target, *armies)?;
            if !outcome_is_consistent(outcome, *armies, defender.armies) {
                return Err(InvalidCommand::InconsistentOutcome {
                    committed: *armies,
                    defenders: defender.armies,
                });
            }
            Ok(())
        }
        GameCommand::SkipTurn => match state.phase() {
            Phase::GameEnded { .. } => Err(InvalidCommand::GameOver),
            Phase::SelectingAction | Phase::AwaitingAttackTarget => Ok(()),
            phase => Err(InvalidCommand::WrongPhase {
                action: "skip turn",
                phase,
            }),
        },
        GameCommand::DistributeReinforcements { distribution } => {
            check_distribution(state, distribution)
        }
    }
}

/// Validate `command` and apply it.
pub fn resolve(state: &GameState, command: &GameCommand) -> Result<Resolution, InvalidCommand> {
    validate(state, command)?;
    Ok(apply_unchecked(state, command))
}

/// Apply a command already known to be valid against `state`.
///
/// Used directly only for redo, where the command is replayed against the exact state it was
/// first validated on. Panics if an attack names a territory missing from `state`.
pub fn apply_unchecked(state: &GameState, command: &GameCommand) -> Resolution {
    let frame = TurnFrame::capture(state);
    let mut next = state.clone();
    let mut events = Vec::new();
    let player = state.current_player();

    let inverse = match command {
        GameCommand::Attack {
            source,
            target,
            armies,
            outcome,
        } => {
            let (Some(before_source), Some(before_target)) =
                (state.territory(*source), state.territory(*target))
            else {
                // Validation rejects unknown territories; a recorded attack on one is a corrupt history.
                unreachable!("attack {source} -> {target} references an unknown territory");
            };
            let defender = before_target.owner;

            next.set_pending_selection(None);
            if let Some(territory) = next.territory_mut(*source) {
                let lost = if outcome.captured {
                    *armies
                } else {
                    outcome.attacker_losses
                };
                territory.armies = territory.armies.saturating_sub(lost);
            }
            if let Some(territory) = next.territory_mut(*target) {
                if outcome.captured {
                    territory.owner = Some(player);
                    territory.armies = outcome.survivors(*armies);
                } else {
                    territory.armies = territory.armies.saturating_sub(outcome.defender_losses);
                }
            }
            events.push(GameEvent::AttackExecuted {
                source: *source,
                target: *target,
                outcome: outcome.clone(),
            });

            if let Some(defender) = defender.filter(|_| outcome.captured) {
                if next.territory_count(defender) == 0 {
                    if let Some(p) = next.player_mut(defender) {
                        p.eliminated = true;
                    }
                    events.push(GameEvent::PlayerEliminated { player: defender });
                }
            }

            if !check_winner(&mut next, &mut events) {
                if outcome.captured {
                    let entitlement = next.entitlement(player);
                    next.set_phase(Phase::ReinforcementPhase);
                    events.push(GameEvent::ReinforcementPhaseStarted {
                        player,
                        entitlement,
                    });
                } else {
                    next.set_phase(Phase::SelectingAction);
                }
            }

            Inverse::Attack {
                source: before_source.clone(),
                target: before_target.clone(),
                frame,
            }
        }
        GameCommand::SkipTurn => {
            next.set_pending_selection(None);
            events.push(GameEvent::TurnSkipped { player });
            advance_turn(&mut next, &mut events);
            Inverse::SkipTurn { frame }
        }
        GameCommand::DistributeReinforcements { distribution } => {
            for (id, armies) in distribution {
                if let Some(territory) = next.territory_mut(*id) {
                    territory.armies += *armies;
                }
            }
            events.push(GameEvent::ReinforcementPhaseCompleted {
                player,
                distribution: distribution.clone(),
            });
            advance_turn(&mut next, &mut events);
            Inverse::DistributeReinforcements {
                added: distribution.clone(),
                frame,
            }
        }
    };

    Resolution {
        state: next,
        inverse,
        events,
    }
}

/// Turn an intent into a command, resolving combat with `rng`.
///
/// Invalid intents are rejected before any dice are rolled.
pub fn prepare(
    state: &GameState,
    intent: &Intent,
    rng: &mut GameRng,
) -> Result<GameCommand, InvalidCommand> {
    let command = match intent {
        Intent::Attack {
            source,
            target,
            armies,
        } => {
            let (_, defender) = check_attack(state, *source, *target, *armies)?;
            let outcome = resolve_attack(*armies, defender.armies, rng);
            GameCommand::Attack {
                source: *source,
                target: *target,
                armies: *armies,
                outcome,
            }
        }
        Intent::SkipTurn => GameCommand::SkipTurn,
        Intent::DistributeReinforcements { distribution } => {
            GameCommand::DistributeReinforcements {
                distribution: distribution.clone(),
            }
        }
    };
    validate(state, &command)?;
    Ok(command)
}

/// Pick an attack source. Allowed while choosing an action or to move an existing selection.
pub fn select_source(state: &GameState, territory: TerritoryId) -> Result<Applied, InvalidCommand> {
    match state.phase() {
        Phase::GameEnded { .. } => return Err(InvalidCommand::GameOver),
        Phase::SelectingAction | Phase::AwaitingAttackTarget => {}
        phase => {
            return Err(InvalidCommand::WrongPhase {
                action: "select territory",
                phase,
            })
        }
    }
    check_own_territory(state, territory)?;
    if !state.can_attack_from(territory) {
        return Err(InvalidCommand::NoAttackPotential(territory));
    }

    let mut next = state.clone();
    next.set_phase(Phase::AwaitingAttackTarget);
    next.set_pending_selection(Some(territory));
    Ok(Applied {
        state: next,
        events: vec![GameEvent::TerritorySelected { territory }],
    })
}

/// Drop the pending attack source.
pub fn cancel_selection(state: &GameState) -> Result<Applied, InvalidCommand> {
    if state.pending_selection().is_none() {
        return Err(InvalidCommand::NothingSelected);
    }
    let mut next = state.clone();
    next.set_phase(Phase::SelectingAction);
    next.set_pending_selection(None);
    Ok(Applied {
        state: next,
        events: vec![GameEvent::SelectionCancelled],
    })
}

fn check_own_territory(
    state: &GameState,
    territory: TerritoryId,
) -> Result<&Territory, InvalidCommand> {
    let found = state
        .territory(territory)
        .ok_or(InvalidCommand::UnknownTerritory(territory))?;
    if found.owner != Some(state.current_player()) {
        return Err(InvalidCommand::NotOwnedByCurrentPlayer {
            territory,
            player: state.current_player(),
        });
    }
    Ok(found)
}

/// Attack preconditions shared by intents and commands. Returns the source and target.
fn check_attack(
    state: &GameState,
    source: TerritoryId,
    target: TerritoryId,
    armies: u32,
) -> Result<(&Territory, &Territory), InvalidCommand> {
    match (state.phase(), state.pending_selection()) {
        (Phase::GameEnded { .. }, _) => return Err(InvalidCommand::GameOver),
        (Phase::SelectingAction, _) => {}
        (Phase::AwaitingAttackTarget, Some(selected)) if selected == source => {}
        (Phase::AwaitingAttackTarget, Some(selected)) => {
            return Err(InvalidCommand::SelectionMismatch {
                selected,
                requested: source,
            })
        }
        (phase, _) => {
            return Err(InvalidCommand::WrongPhase {
                action: "attack",
                phase,
            })
        }
    }

    let attacker = check_own_territory(state, source)?;
    let defender = state
        .territory(target)
        .ok_or(InvalidCommand::UnknownTerritory(target))?;
    if !state.map().is_adjacent(source, target) {
        return Err(InvalidCommand::NotAdjacent {
            from: source,
            to: target,
        });
    }
    if defender.owner == attacker.owner {
        return Err(InvalidCommand::TargetNotEnemy(target));
    }
    if armies == 0 {
        return Err(InvalidCommand::NoArmiesCommitted);
    }
    if armies >= attacker.armies {
        return Err(InvalidCommand::NotEnoughArmies {
            territory: source,
            available: attacker.armies,
            committed: armies,
        });
    }
    Ok((attacker, defender))
}

fn check_distribution(state: &GameState, distribution: &Distribution) -> Result<(), InvalidCommand> {
    match state.phase() {
        Phase::GameEnded { .. } => return Err(InvalidCommand::GameOver),
        Phase::ReinforcementPhase => {}
        phase => {
            return Err(InvalidCommand::WrongPhase {
                action: "distribute reinforcements",
                phase,
            })
        }
    }
    for id in distribution.keys() {
        check_own_territory(state, *id)?;
    }

    let entitlement = state.entitlement(state.current_player());
    let requested = distribution
        .values()
        .fold(0u32, |sum, armies| sum.saturating_add(*armies));
    if requested > entitlement {
        return Err(InvalidCommand::ExceedsEntitlement {
            entitlement,
            requested,
        });
    }
    if requested < entitlement {
        return Err(InvalidCommand::BelowEntitlement {
            entitlement,
            requested,
        });
    }
    debug!(player = %state.current_player(), requested, "distribution accepted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use conquest_protocol::{AttackOutcome, Hex, PlayerId, RegionId};

    use super::*;
    use crate::{GameMap, Player, Region, RulesConfig};

    /// T0 - T1 - T2 - T3 in a row. T0, T1 belong to A; T2, T3 to B.
    fn duel(armies: [u32; 4]) -> GameState {
        let cells = (0..4).map(|q| (Hex::new(q, 0), RegionId(0))).collect();
        let regions = vec![Region {
            id: RegionId(0),
            name: "Row".into(),
            bonus: 4,
        }];
        let map = Arc::new(GameMap::new(cells, regions).expect("valid map"));
        let territories = armies
            .iter()
            .enumerate()
            .map(|(i, armies)| Territory {
                id: TerritoryId(i as u16),
                owner: Some(PlayerId(u8::from(i >= 2))),
                armies: *armies,
            })
            .collect();
        let players = vec![Player::human(PlayerId(0), "A"), Player::bot(PlayerId(1), "B")];
        GameState::new(map, players, territories, RulesConfig::default()).expect("valid state")
    }

    fn attack(source: u16, target: u16, armies: u32, outcome: AttackOutcome) -> GameCommand {
        GameCommand::Attack {
            source: TerritoryId(source),
            target: TerritoryId(target),
            armies,
            outcome,
        }
    }

    #[test]
    fn capture_moves_survivors_and_opens_reinforcement() {
        let state = duel([1, 5, 2, 1]);
        let resolution = resolve(&state, &attack(1, 2, 4, AttackOutcome::forced_capture(1, 2)))
            .expect("valid attack");
        let next = &resolution.state;

        assert_eq!(next.territory(TerritoryId(1)).map(|t| t.armies), Some(1));
        let captured = next.territory(TerritoryId(2)).expect("exists");
        assert_eq!(captured.owner, Some(PlayerId(0)));
        assert_eq!(captured.armies, 3);
        assert_eq!(next.phase(), Phase::ReinforcementPhase);
        assert_eq!(next.current_player(), PlayerId(0));
        assert_eq!(
            resolution.events[1],
            GameEvent::ReinforcementPhaseStarted {
                player: PlayerId(0),
                entitlement: 3
            }
        );
    }

    #[test]
    fn repulse_costs_both_sides() {
        let state = duel([1, 3, 4, 1]);
        let resolution = resolve(&state, &attack(1, 2, 2, AttackOutcome::forced_repulse(2, 1)))
            .expect("valid attack");
        assert_eq!(resolution.state.territory(TerritoryId(1)).map(|t| t.armies), Some(1));
        assert_eq!(resolution.state.territory(TerritoryId(2)).map(|t| t.armies), Some(3));
        assert_eq!(resolution.state.phase(), Phase::SelectingAction);
        assert_eq!(resolution.events.len(), 1);
    }

    #[test]
    #[should_panic(expected = "unknown territory")]
    fn replaying_attack_on_missing_territory_is_fatal() {
        let state = duel([1, 3, 4, 1]);
        apply_unchecked(&state, &attack(1, 9, 2, AttackOutcome::forced_repulse(2, 0)));
    }

    #[test]
    fn attack_preconditions() {
        let state = duel([3, 3, 2, 1]);
        let ok = AttackOutcome::forced_capture(0, 2);
        assert_eq!(
            validate(&state, &attack(0, 2, 2, ok.clone())),
            Err(InvalidCommand::NotAdjacent {
                from: TerritoryId(0),
                to: TerritoryId(2)
            })
        );
        assert_eq!(
            validate(&state, &attack(0, 1, 1, ok.clone())),
            Err(InvalidCommand::TargetNotEnemy(TerritoryId(1)))
        );
        assert_eq!(
            validate(&state, &attack(2, 1, 1, ok.clone())),
            Err(InvalidCommand::NotOwnedByCurrentPlayer {
                territory: TerritoryId(2),
                player: PlayerId(0)
            })
        );
        assert_eq!(
            validate(&state, &attack(1, 2, 3, ok.clone())),
            Err(InvalidCommand::NotEnoughArmies {
                territory: TerritoryId(1),
                available: 3,
                committed: 3
            })
        );
        assert_eq!(
            validate(&state, &attack(1, 2, 0, ok)),
            Err(InvalidCommand::NoArmiesCommitted)
        );
        assert_eq!(
            validate(&state, &attack(1, 2, 2, AttackOutcome::forced_capture(0, 1))),
            Err(InvalidCommand::InconsistentOutcome {
                committed: 2,
                defenders: 2
            })
        );
    }

    #[test]
    fn distribution_must_match_entitlement_exactly() {
        let state = duel([1, 5, 1, 1]);
        let captured = resolve(&state, &attack(1, 2, 2, AttackOutcome::forced_capture(0, 1)))
            .expect("valid attack")
            .state;
        let entitlement = captured.entitlement(PlayerId(0));
        assert_eq!(entitlement, 3);

        let over = GameCommand::DistributeReinforcements {
            distribution: [(TerritoryId(0), 4)].into_iter().collect(),
        };
        assert_eq!(
            validate(&captured, &over),
            Err(InvalidCommand::ExceedsEntitlement {
                entitlement: 3,
                requested: 4
            })
        );
        let under = GameCommand::DistributeReinforcements {
            distribution: [(TerritoryId(0), 2)].into_iter().collect(),
        };
        assert!(matches!(
            validate(&captured, &under),
            Err(InvalidCommand::BelowEntitlement { .. })
        ));
        let foreign = GameCommand::DistributeReinforcements {
            distribution: [(TerritoryId(3), 3)].into_iter().collect(),
        };
        assert!(matches!(
            validate(&captured, &foreign),
            Err(InvalidCommand::NotOwnedByCurrentPlayer { .. })
        ));

        let exact = GameCommand::DistributeReinforcements {
            distribution: [(TerritoryId(0), 1), (TerritoryId(2), 2)].into_iter().collect(),
        };
        let done = resolve(&captured, &exact).expect("exact distribution");
        assert_eq!(done.state.territory(TerritoryId(2)).map(|t| t.armies), Some(4));
        assert_eq!(done.state.current_player(), PlayerId(1));
        assert_eq!(done.state.phase(), Phase::SelectingAction);
    }

    #[test]
    fn skip_is_refused_during_reinforcement() {
        let state = duel([1, 5, 1, 1]);
        let captured = resolve(&state, &attack(1, 2, 2, AttackOutcome::forced_capture(0, 1)))
            .expect("valid attack")
            .state;
        assert_eq!(
            validate(&captured, &GameCommand::SkipTurn),
            Err(InvalidCommand::WrongPhase {
                action: "skip turn",
                phase: Phase::ReinforcementPhase
            })
        );
    }

    #[test]
    fn invalid_intent_consumes_no_dice() {
        let state = duel([1, 3, 2, 1]);
        let mut rng = GameRng::seed_from_u64(9);
        let untouched = rng;
        let intent = Intent::Attack {
            source: TerritoryId(0),
            target: TerritoryId(3),
            armies: 1,
        };
        assert!(prepare(&state, &intent, &mut rng).is_err());
        assert_eq!(rng, untouched);

        let intent = Intent::Attack {
            source: TerritoryId(1),
            target: TerritoryId(2),
            armies: 2,
        };
        let command = prepare(&state, &intent, &mut rng).expect("valid intent");
        assert_ne!(rng, untouched);
        assert!(resolve(&state, &command).is_ok());
    }

    #[test]
    fn selection_gates_the_attack_source() {
        let state = duel([1, 3, 2, 1]);
        assert_eq!(
            select_source(&state, TerritoryId(0)).map(|a| a.state),
            Err(InvalidCommand::NoAttackPotential(TerritoryId(0)))
        );
        let selected = select_source(&state, TerritoryId(1)).expect("eligible").state;
        assert_eq!(selected.phase(), Phase::AwaitingAttackTarget);

        let other_source = attack(0, 1, 1, AttackOutcome::forced_capture(0, 1));
        assert!(matches!(
            validate(&selected, &other_source),
            Err(InvalidCommand::SelectionMismatch { .. })
        ));

        let cancelled = cancel_selection(&selected).expect("selected");
        assert_eq!(cancelled.state, state);
        assert_eq!(cancelled.events, vec![GameEvent::SelectionCancelled]);
        assert_eq!(
            cancel_selection(&state).map(|a| a.events),
            Err(InvalidCommand::NothingSelected)
        );
    }
}
