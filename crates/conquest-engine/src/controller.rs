//! The sole mutator of the authoritative match.

use std::sync::Arc;

use conquest_core::{
    cancel_selection, derive_ui_state, prepare, select_source, Applied, BotDecisionSupplier,
    CommandHistory, GameRng, GameState, InvalidCommand, NothingToRedo, NothingToUndo, Recording,
    RecordingError, ReplayLog,
};
use conquest_protocol::{GameCommand, GameEvent, Intent, Phase, PlayerId, TerritoryId, UiState};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::publish::{EventBus, EventSubscription, StateUpdate};
use crate::EngineConfig;

/// Owns the current state, the undo history, and the dice.
///
/// Every successful operation publishes the new state (and UI view) first, then its events,
/// so an observer reacting to an event can always read a state at least as new.
pub struct GameController {
    state: Arc<GameState>,
    history: CommandHistory,
    rng: GameRng,
    seed: u64,
    /// Opening state of the command log.
    initial: GameState,
    /// Commands that turn `initial` into `state`.
    log: Vec<GameCommand>,
    revision: u64,
    history_depth: Option<usize>,
    state_tx: watch::Sender<StateUpdate>,
    ui_tx: watch::Sender<UiState>,
    events: EventBus,
}

impl GameController {
    pub fn new(state: GameState, seed: u64, config: &EngineConfig) -> Self {
        let history = CommandHistory::new(config.history_depth);
        let ui = derive_ui_state(&state, &history);
        let state = Arc::new(state);
        let (state_tx, _) = watch::channel(StateUpdate {
            revision: 0,
            state: Arc::clone(&state),
        });
        let (ui_tx, _) = watch::channel(ui);

        Self {
            initial: state.as_ref().clone(),
            state,
            history,
            rng: GameRng::seed_from_u64(seed),
            seed,
            log: Vec::new(),
            revision: 0,
            history_depth: config.history_depth,
            state_tx,
            ui_tx,
            events: EventBus::new(config.event_capacity),
        }
    }

    /// Announce the match to subscribers.
    pub fn start(&mut self) {
        let first_player = self.state.current_player();
        info!(player = %first_player, turn = self.state.turn(), "game started");
        self.events.publish(GameEvent::GameStarted { first_player });
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn ui_state(&self) -> UiState {
        derive_ui_state(&self.state, &self.history)
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn history(&self) -> &CommandHistory {
        &self.history
    }

    pub fn watch_state(&self) -> watch::Receiver<StateUpdate> {
        self.state_tx.subscribe()
    }

    pub fn watch_ui(&self) -> watch::Receiver<UiState> {
        self.ui_tx.subscribe()
    }

    pub fn subscribe(&self) -> EventSubscription {
        self.events.subscribe()
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.events
    }

    /// Resolve an intent with the controller's dice and execute it.
    pub fn submit(&mut self, intent: Intent) -> Result<(), InvalidCommand> {
        let command = match prepare(&self.state, &intent, &mut self.rng) {
            Ok(command) => command,
            Err(err) => {
                debug!(error = %err, ?intent, "intent rejected");
                return Err(err);
            }
        };
        self.execute(command)
    }

    /// Validate and apply a fully resolved command.
    pub fn execute(&mut self, command: GameCommand) -> Result<(), InvalidCommand> {
        let player = self.state.current_player();
        let applied = match self.history.execute(&self.state, command.clone()) {
            Ok(applied) => applied,
            Err(err) => {
                debug!(error = %err, command = command.name(), "command rejected");
                return Err(err);
            }
        };
        info!(
            player = %player,
            turn = self.state.turn(),
            command = command.name(),
            "command executed"
        );
        self.log.push(command);
        self.commit(applied);
        Ok(())
    }

    pub fn undo(&mut self) -> Result<(), NothingToUndo> {
        let (state, command) = self.history.undo(&self.state)?;
        self.log.pop();
        info!(command = command.name(), "command undone");
        self.commit(Applied {
            state,
            events: vec![GameEvent::CommandUndone { command }],
        });
        Ok(())
    }

    pub fn redo(&mut self) -> Result<(), NothingToRedo> {
        let (state, command) = self.history.redo(&self.state)?;
        self.log.push(command.clone());
        info!(command = command.name(), "command redone");
        self.commit(Applied {
            state,
            events: vec![GameEvent::CommandRedone { command }],
        });
        Ok(())
    }

    /// Click-style selection.
    ///
    /// With a source selected, picking it again cancels, picking another own territory moves the
    /// selection, and picking anything else attacks it with all but one army.
    pub fn select_territory(&mut self, territory: TerritoryId) -> Result<(), InvalidCommand> {
        let current = self.state.current_player();
        let applied = match (self.state.phase(), self.state.pending_selection()) {
            (Phase::AwaitingAttackTarget, Some(selected)) if selected == territory => {
                cancel_selection(&self.state)?
            }
            (Phase::AwaitingAttackTarget, Some(selected)) => {
                let target = self
                    .state
                    .territory(territory)
                    .ok_or(InvalidCommand::UnknownTerritory(territory))?;
                if target.owner == Some(current) {
                    select_source(&self.state, territory)?
                } else {
                    let armies = self
                        .state
                        .territory(selected)
                        .map_or(0, |t| t.armies.saturating_sub(1));
                    return self.submit(Intent::Attack {
                        source: selected,
                        target: territory,
                        armies,
                    });
                }
            }
            _ => select_source(&self.state, territory)?,
        };
        self.history.discard_redo();
        self.commit(applied);
        Ok(())
    }

    pub fn cancel_selection(&mut self) -> Result<(), InvalidCommand> {
        let applied = cancel_selection(&self.state)?;
        self.history.discard_redo();
        self.commit(applied);
        Ok(())
    }

    /// Execute a bot's move through the same path as human input.
    ///
    /// `BotDecisionMade` goes out before the move is validated.
    pub fn submit_bot_decision(
        &mut self,
        player: PlayerId,
        intent: Intent,
    ) -> Result<(), InvalidCommand> {
        self.ensure_bot_turn(player)?;
        self.events.publish(GameEvent::BotDecisionMade {
            player,
            command: intent.clone(),
        });
        self.submit(intent)
    }

    /// Ask `bot` for a move and play it. An illegal move forfeits the turn and is reported.
    pub fn play_bot_turn(&mut self, bot: &dyn BotDecisionSupplier) -> Result<(), InvalidCommand> {
        let player = self.state.current_player();
        let intent = bot.decide(&self.state);
        match self.submit_bot_decision(player, intent) {
            Err(err @ InvalidCommand::NotBotTurn { .. }) => Err(err),
            Err(err) => {
                warn!(player = %player, error = %err, "illegal bot decision; forfeiting turn");
                self.forfeit_bot_turn(player)?;
                Err(err)
            }
            ok => ok,
        }
    }

    /// End a bot's turn without its input: skip, or during reinforcement place the whole
    /// entitlement on its first territory.
    pub fn forfeit_bot_turn(&mut self, player: PlayerId) -> Result<(), InvalidCommand> {
        self.ensure_bot_turn(player)?;
        let command = if self.state.phase() == Phase::ReinforcementPhase {
            let first = self
                .state
                .owned_by(player)
                .map(|t| t.id)
                .next()
                .ok_or(InvalidCommand::NotBotTurn { player })?;
            GameCommand::DistributeReinforcements {
                distribution: [(first, self.state.entitlement(player))]
                    .into_iter()
                    .collect(),
            }
        } else {
            GameCommand::SkipTurn
        };
        info!(player = %player, command = command.name(), "bot turn forfeited");
        self.execute(command)
    }

    /// Encode the current state with its full command log.
    pub fn export_recording(&self) -> Result<Vec<u8>, RecordingError> {
        let replay = ReplayLog {
            initial: self.initial.clone(),
            commands: self.log.clone(),
        };
        let recording = Recording::capture(self.seed, &self.rng, &self.state, Some(replay))?;
        let bytes = recording.encode()?;
        info!(
            bytes = bytes.len(),
            commands = self.log.len(),
            "recording exported"
        );
        Ok(bytes)
    }

    /// Replace the match with a recording. Nothing changes unless the recording is fully valid.
    pub fn import_recording(&mut self, bytes: &[u8]) -> Result<(), RecordingError> {
        let restored = match Recording::decode(bytes).and_then(|r| r.restore(self.history_depth)) {
            Ok(restored) => restored,
            Err(err) => {
                warn!(error = %err, "recording rejected");
                return Err(err);
            }
        };

        let turn = restored.state.turn();
        self.history = restored.history;
        self.initial = restored.initial;
        self.log = restored.log;
        self.seed = restored.seed;
        self.rng = restored.rng;
        info!(turn, commands = self.log.len(), "recording loaded");
        self.commit(Applied {
            state: restored.state,
            events: vec![GameEvent::RecordingLoaded { turn }],
        });
        Ok(())
    }

    fn ensure_bot_turn(&self, player: PlayerId) -> Result<(), InvalidCommand> {
        if self.state.is_over() {
            return Err(InvalidCommand::GameOver);
        }
        if self.state.current_player() != player || !self.state.current_is_bot() {
            return Err(InvalidCommand::NotBotTurn { player });
        }
        Ok(())
    }

    /// Publish a new state, then its events.
    fn commit(&mut self, applied: Applied) {
        self.state = Arc::new(applied.state);
        self.revision += 1;
        self.state_tx.send_replace(StateUpdate {
            revision: self.revision,
            state: Arc::clone(&self.state),
        });
        self.ui_tx
            .send_replace(derive_ui_state(&self.state, &self.history));
        for event in applied.events {
            if let GameEvent::GameEnded { winner } = &event {
                info!(winner = %winner, turn = self.state.turn(), "game ended");
            }
            self.events.publish(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use conquest_core::{GameMap, GreedyBot, Player, Region, RulesConfig, Territory};
    use conquest_protocol::{AttackOutcome, Hex, RegionId};

    use super::*;

    /// T0 - T1 - T2 - T3 in a row; A (human) holds T0..T1, B (bot) holds T2..T3.
    fn controller(armies: [u32; 4]) -> GameController {
        let cells = (0..4).map(|q| (Hex::new(q, 0), RegionId(0))).collect();
        let regions = vec![Region {
            id: RegionId(0),
            name: "Row".into(),
            bonus: 2,
        }];
        let map = Arc::new(GameMap::new(cells, regions).unwrap());
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
        let state = GameState::new(map, players, territories, RulesConfig::default()).unwrap();
        GameController::new(state, 1, &EngineConfig::default())
    }

    fn drain(sub: &mut EventSubscription) -> Vec<GameEvent> {
        std::iter::from_fn(|| sub.try_recv()).collect()
    }

    #[test]
    fn state_is_published_before_events() {
        let mut ctl = controller([1, 2, 2, 1]);
        let mut sub = ctl.subscribe();
        let watch = ctl.watch_state();

        ctl.submit(Intent::SkipTurn).unwrap();
        assert_eq!(watch.borrow().revision, 1);
        assert_eq!(watch.borrow().state.current_player(), PlayerId(1));
        assert_eq!(
            drain(&mut sub),
            vec![
                GameEvent::TurnSkipped {
                    player: PlayerId(0)
                },
                GameEvent::TurnStarted {
                    player: PlayerId(1),
                    turn: 1
                },
            ]
        );
    }

    #[test]
    fn rejected_intent_publishes_nothing() {
        let mut ctl = controller([1, 2, 2, 1]);
        let mut sub = ctl.subscribe();
        let err = ctl
            .submit(Intent::Attack {
                source: TerritoryId(0),
                target: TerritoryId(3),
                armies: 1,
            })
            .unwrap_err();
        assert!(matches!(err, InvalidCommand::NotAdjacent { .. }));
        assert_eq!(ctl.revision(), 0);
        assert!(drain(&mut sub).is_empty());
    }

    #[test]
    fn selection_flow() {
        let mut ctl = controller([3, 4, 1, 1]);
        let mut sub = ctl.subscribe();

        ctl.select_territory(TerritoryId(1)).unwrap();
        assert_eq!(ctl.state().phase(), Phase::AwaitingAttackTarget);
        ctl.select_territory(TerritoryId(1)).unwrap();
        assert_eq!(ctl.state().phase(), Phase::SelectingAction);
        assert_eq!(
            drain(&mut sub),
            vec![
                GameEvent::TerritorySelected {
                    territory: TerritoryId(1)
                },
                GameEvent::SelectionCancelled,
            ]
        );

        ctl.select_territory(TerritoryId(1)).unwrap();
        ctl.select_territory(TerritoryId(2)).unwrap();
        let events = drain(&mut sub);
        assert_eq!(
            events.first(),
            Some(&GameEvent::TerritorySelected {
                territory: TerritoryId(1)
            })
        );
        assert!(matches!(
            events.get(1),
            Some(GameEvent::AttackExecuted { source, target, .. })
                if *source == TerritoryId(1) && *target == TerritoryId(2)
        ));
        assert!(ctl.history().can_undo());
        assert_eq!(ctl.state().pending_selection(), None);
    }

    #[test]
    fn undo_and_redo_emit_neutral_notifications() {
        let mut ctl = controller([1, 2, 2, 1]);
        ctl.submit(Intent::SkipTurn).unwrap();
        let after = ctl.state().clone();
        let mut sub = ctl.subscribe();

        ctl.undo().unwrap();
        assert_eq!(ctl.state().current_player(), PlayerId(0));
        ctl.redo().unwrap();
        assert_eq!(ctl.state(), &after);
        assert_eq!(
            drain(&mut sub),
            vec![
                GameEvent::CommandUndone {
                    command: GameCommand::SkipTurn
                },
                GameEvent::CommandRedone {
                    command: GameCommand::SkipTurn
                },
            ]
        );
        assert_eq!(ctl.redo(), Err(NothingToRedo));
        assert!(ctl.ui_state().can_undo);
    }

    #[test]
    fn selection_after_undo_discards_redo() {
        let mut ctl = controller([3, 3, 1, 1]);
        ctl.execute(GameCommand::Attack {
            source: TerritoryId(1),
            target: TerritoryId(2),
            armies: 2,
            outcome: AttackOutcome::forced_repulse(2, 0),
        })
        .unwrap();
        ctl.undo().unwrap();
        assert!(ctl.ui_state().can_redo);

        ctl.select_territory(TerritoryId(1)).unwrap();
        assert!(!ctl.ui_state().can_redo);
        assert_eq!(ctl.redo(), Err(NothingToRedo));
        assert_eq!(ctl.state().phase(), Phase::AwaitingAttackTarget);
        assert_eq!(ctl.state().pending_selection(), Some(TerritoryId(1)));
        assert_eq!(ctl.state().territory(TerritoryId(1)).map(|t| t.armies), Some(3));

        ctl.execute(GameCommand::SkipTurn).unwrap();
        ctl.undo().unwrap();
        ctl.cancel_selection().unwrap();
        assert_eq!(ctl.redo(), Err(NothingToRedo));
        assert_eq!(ctl.state().phase(), Phase::SelectingAction);
        ctl.state().validate().unwrap();
    }

    #[test]
    fn bot_decisions_are_announced_then_validated() {
        let mut ctl = controller([1, 2, 3, 1]);
        assert_eq!(
            ctl.submit_bot_decision(PlayerId(0), Intent::SkipTurn),
            Err(InvalidCommand::NotBotTurn {
                player: PlayerId(0)
            })
        );
        ctl.submit(Intent::SkipTurn).unwrap();

        let mut sub = ctl.subscribe();
        ctl.play_bot_turn(&GreedyBot::new(0.0)).unwrap();
        let events = drain(&mut sub);
        assert!(matches!(
            events.first(),
            Some(GameEvent::BotDecisionMade { player, .. }) if *player == PlayerId(1)
        ));
        assert!(matches!(events.get(1), Some(GameEvent::AttackExecuted { .. })));
    }

    #[test]
    fn illegal_bot_move_forfeits_the_turn() {
        let mut ctl = controller([1, 2, 3, 1]);
        ctl.submit(Intent::SkipTurn).unwrap();

        let cheat = |_: &GameState| Intent::Attack {
            source: TerritoryId(3),
            target: TerritoryId(0),
            armies: 9,
        };
        assert!(ctl.play_bot_turn(&cheat).is_err());
        assert_eq!(ctl.state().current_player(), PlayerId(0));
        assert_eq!(ctl.state().turn(), 2);
    }

    #[test]
    fn recording_survives_export_and_import() {
        let mut ctl = controller([1, 5, 2, 1]);
        ctl.submit(Intent::Attack {
            source: TerritoryId(1),
            target: TerritoryId(2),
            armies: 4,
        })
        .unwrap();
        let bytes = ctl.export_recording().unwrap();
        let expected = ctl.state().clone();

        let mut other = controller([1, 2, 2, 1]);
        let mut sub = other.subscribe();
        other.import_recording(&bytes).unwrap();
        assert_eq!(other.state(), &expected);
        assert!(other.history().can_undo());
        assert_eq!(
            drain(&mut sub),
            vec![GameEvent::RecordingLoaded { turn: 1 }]
        );

        let before = other.revision();
        assert!(other.import_recording(&bytes[..bytes.len() / 2]).is_err());
        assert_eq!(other.state(), &expected);
        assert_eq!(other.revision(), before);
    }
}
