//! Turn rotation and the win check shared by every command.

use conquest_protocol::{GameEvent, Phase};

use crate::GameState;

/// End the match if exactly one player still owns territory. Returns whether the match is over.
///
/// `GameEnded` is emitted only on the transition into the terminal phase.
pub(crate) fn check_winner(state: &mut GameState, events: &mut Vec<GameEvent>) -> bool {
    if state.is_over() {
        return true;
    }
    let Some(winner) = state.sole_owner() else {
        return false;
    };
    state.set_phase(Phase::GameEnded { winner });
    state.set_pending_selection(None);
    events.push(GameEvent::GameEnded { winner });
    true
}

/// Hand the turn to the next non-eliminated player in rotation order.
///
/// The turn counter increments when the rotation wraps past the last seat.
pub(crate) fn advance_turn(state: &mut GameState, events: &mut Vec<GameEvent>) {
    if check_winner(state, events) {
        return;
    }

    let seats = state.players().len();
    let current = state.current_player().index();
    let mut wrapped = false;
    let next = (1..=seats).find_map(|step| {
        let index = (current + step) % seats;
        wrapped |= index <= current;
        state
            .players()
            .get(index)
            .filter(|p| !p.eliminated)
            .map(|p| p.id)
    });
    // check_winner above guarantees a second living player exists.
    let Some(next) = next else {
        return;
    };

    if wrapped {
        state.set_turn(state.turn() + 1);
    }
    state.set_current_player(next);
    state.set_phase(Phase::SelectingAction);
    state.set_pending_selection(None);
    events.push(GameEvent::TurnStarted {
        player: next,
        turn: state.turn(),
    });
}
