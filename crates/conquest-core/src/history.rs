use std::collections::VecDeque;

use conquest_protocol::GameCommand;
use tracing::debug;

use crate::{apply_unchecked, resolve, Applied, GameState, Inverse, InvalidCommand};
use crate::{NothingToRedo, NothingToUndo};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryEntry {
    pub command: GameCommand,
    pub inverse: Inverse,
}

/// Linear undo/redo history.
///
/// The undo side holds each applied command with its inverse; the redo side holds commands
/// only, since re-applying one recomputes its inverse. Executing a new command discards the
/// redo side.
#[derive(Clone, Debug, Default)]
pub struct CommandHistory {
    undo: VecDeque<HistoryEntry>,
    redo: Vec<GameCommand>,
    max_depth: Option<usize>,
}

impl CommandHistory {
    /// `max_depth` bounds the undo side; `None` keeps everything.
    pub fn new(max_depth: Option<usize>) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            max_depth,
        }
    }

    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Number of undoable commands.
    pub fn len(&self) -> usize {
        self.undo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.undo.is_empty()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    /// Undoable entries, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> + '_ {
        self.undo.iter()
    }

    /// Validate and apply `command`. On failure nothing is recorded.
    pub fn execute(
        &mut self,
        state: &GameState,
        command: GameCommand,
    ) -> Result<Applied, InvalidCommand> {
        let resolution = resolve(state, &command)?;
        self.push(HistoryEntry {
            command,
            inverse: resolution.inverse,
        });
        self.redo.clear();
        Ok(Applied {
            state: resolution.state,
            events: resolution.events,
        })
    }

    /// Revert the most recent command. Returns the prior state and the command undone.
    pub fn undo(&mut self, state: &GameState) -> Result<(GameState, GameCommand), NothingToUndo> {
        let entry = self.undo.pop_back().ok_or(NothingToUndo)?;
        let prior = entry.inverse.revert(state);
        self.redo.push(entry.command.clone());
        Ok((prior, entry.command))
    }

    /// Re-apply the most recently undone command with its recorded outcome.
    ///
    /// The command's original events are not returned; redo is reported separately.
    pub fn redo(&mut self, state: &GameState) -> Result<(GameState, GameCommand), NothingToRedo> {
        let command = self.redo.pop().ok_or(NothingToRedo)?;
        let resolution = apply_unchecked(state, &command);
        self.push(HistoryEntry {
            command: command.clone(),
            inverse: resolution.inverse,
        });
        Ok((resolution.state, command))
    }

    /// Drop the redo side when the state moves on without a command, e.g. a new selection.
    pub fn discard_redo(&mut self) {
        if !self.redo.is_empty() {
            debug!(discarded = self.redo.len(), "redo history discarded");
            self.redo.clear();
        }
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    fn push(&mut self, entry: HistoryEntry) {
        self.undo.push_back(entry);
        if let Some(max) = self.max_depth {
            while self.undo.len() > max {
                if let Some(evicted) = self.undo.pop_front() {
                    debug!(command = evicted.command.name(), max, "history entry evicted");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use conquest_protocol::{AttackOutcome, Hex, PlayerId, RegionId, TerritoryId};

    use super::*;
    use crate::{GameMap, Player, Region, RulesConfig, Territory};

    fn pair() -> GameState {
        let cells = vec![(Hex::new(0, 0), RegionId(0)), (Hex::new(1, 0), RegionId(0))];
        let regions = vec![Region {
            id: RegionId(0),
            name: "Pair".into(),
            bonus: 1,
        }];
        let map = Arc::new(GameMap::new(cells, regions).expect("valid map"));
        let territories = vec![
            Territory {
                id: TerritoryId(0),
                owner: Some(PlayerId(0)),
                armies: 4,
            },
            Territory {
                id: TerritoryId(1),
                owner: Some(PlayerId(1)),
                armies: 3,
            },
        ];
        let players = vec![Player::human(PlayerId(0), "A"), Player::human(PlayerId(1), "B")];
        GameState::new(map, players, territories, RulesConfig::default()).expect("valid state")
    }

    fn repulse() -> GameCommand {
        GameCommand::Attack {
            source: TerritoryId(0),
            target: TerritoryId(1),
            armies: 1,
            outcome: AttackOutcome::forced_repulse(1, 0),
        }
    }

    #[test]
    fn empty_history_reports_benign_errors() {
        let state = pair();
        let mut history = CommandHistory::new(None);
        assert_eq!(history.undo(&state).map(|(s, _)| s), Err(NothingToUndo));
        assert_eq!(history.redo(&state).map(|(s, _)| s), Err(NothingToRedo));
    }

    #[test]
    fn rejected_command_is_not_recorded() {
        let state = pair();
        let mut history = CommandHistory::new(None);
        let bad = GameCommand::Attack {
            source: TerritoryId(0),
            target: TerritoryId(1),
            armies: 4,
            outcome: AttackOutcome::forced_repulse(4, 0),
        };
        assert!(history.execute(&state, bad).is_err());
        assert!(!history.can_undo());
    }

    #[test]
    fn depth_bound_evicts_oldest() {
        let mut state = pair();
        let mut history = CommandHistory::new(Some(2));
        for _ in 0..3 {
            state = history.execute(&state, repulse()).expect("valid").state;
        }
        assert_eq!(history.len(), 2);
        assert_eq!(state.territory(TerritoryId(0)).map(|t| t.armies), Some(1));

        state = history.undo(&state).expect("undo").0;
        state = history.undo(&state).expect("undo").0;
        assert_eq!(state.territory(TerritoryId(0)).map(|t| t.armies), Some(3));
        assert!(history.undo(&state).is_err());
        assert_eq!(history.redo_len(), 2);
    }

    #[test]
    fn discarding_redo_keeps_undo_side() {
        let mut state = pair();
        let mut history = CommandHistory::new(None);
        state = history.execute(&state, repulse()).expect("valid").state;
        state = history.execute(&state, repulse()).expect("valid").state;
        state = history.undo(&state).expect("undo").0;

        history.discard_redo();
        assert!(!history.can_redo());
        assert_eq!(history.len(), 1);
        assert_eq!(history.redo(&state).map(|(s, _)| s), Err(NothingToRedo));
    }
}
