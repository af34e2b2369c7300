//! Deterministic game-state engine for hex territory conquest.
//!
//! Every state transition is a [`GameCommand`](conquest_protocol::GameCommand) applied to an
//! immutable [`GameState`] value, producing a new value plus an [`Inverse`] that restores the
//! prior value exactly. Nothing in this crate performs I/O or spawns tasks.

mod apply;
pub mod bot;
mod combat;
mod error;
mod history;
mod inverse;
mod map;
pub mod mapgen;
mod recording;
mod rng;
mod rules;
mod state;
mod turn;
mod ui;

pub use crate::apply::*;
pub use crate::bot::{BotDecisionSupplier, GreedyBot};
pub use crate::combat::*;
pub use crate::error::*;
pub use crate::history::*;
pub use crate::inverse::*;
pub use crate::map::*;
pub use crate::mapgen::{generate, MapGenConfig, PlayerSetup};
pub use crate::recording::*;
pub use crate::rng::*;
pub use crate::rules::*;
pub use crate::state::*;
pub use crate::ui::*;
