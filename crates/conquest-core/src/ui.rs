use conquest_protocol::{Phase, UiState};

use crate::{CommandHistory, GameState};

/// Presentation view of `state`. Recomputed whenever either input changes.
pub fn derive_ui_state(state: &GameState, history: &CommandHistory) -> UiState {
    let player = state.current_player();
    let (selectable_sources, attack_targets) = match (state.phase(), state.pending_selection()) {
        (Phase::SelectingAction, _) => (state.attack_sources(player), Vec::new()),
        (Phase::AwaitingAttackTarget, Some(selected)) => {
            (state.attack_sources(player), state.attack_targets(selected))
        }
        _ => (Vec::new(), Vec::new()),
    };

    UiState {
        turn: state.turn(),
        current_player: player,
        current_is_bot: state.current_is_bot(),
        phase: state.phase(),
        selected: state.pending_selection(),
        selectable_sources,
        attack_targets,
        reinforcement_entitlement: (state.phase() == Phase::ReinforcementPhase)
            .then(|| state.entitlement(player)),
        can_undo: history.can_undo(),
        can_redo: history.can_redo(),
        winner: state.winner(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use conquest_protocol::{Hex, PlayerId, RegionId, TerritoryId};

    use super::*;
    use crate::{select_source, GameMap, Player, Region, RulesConfig, Territory};

    #[test]
    fn selection_exposes_targets() {
        let cells = (0..3).map(|q| (Hex::new(q, 0), RegionId(0))).collect();
        let regions = vec![Region {
            id: RegionId(0),
            name: "Row".into(),
            bonus: 1,
        }];
        let map = Arc::new(GameMap::new(cells, regions).expect("valid map"));
        let territories = [(0, 2), (0, 3), (1, 1)]
            .iter()
            .enumerate()
            .map(|(i, (owner, armies))| Territory {
                id: TerritoryId(i as u16),
                owner: Some(PlayerId(*owner)),
                armies: *armies,
            })
            .collect();
        let players = vec![Player::human(PlayerId(0), "A"), Player::bot(PlayerId(1), "B")];
        let state = GameState::new(map, players, territories, RulesConfig::default())
            .expect("valid state");
        let history = CommandHistory::new(None);

        let ui = derive_ui_state(&state, &history);
        assert_eq!(ui.selectable_sources, vec![TerritoryId(1)]);
        assert!(ui.attack_targets.is_empty());
        assert!(!ui.current_is_bot);
        assert_eq!(ui.reinforcement_entitlement, None);

        let selected = select_source(&state, TerritoryId(1)).expect("eligible").state;
        let ui = derive_ui_state(&selected, &history);
        assert_eq!(ui.selected, Some(TerritoryId(1)));
        assert_eq!(ui.attack_targets, vec![TerritoryId(2)]);
        assert!(!ui.can_undo);
    }
}
