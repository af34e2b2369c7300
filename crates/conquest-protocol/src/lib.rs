mod command;
mod event;
mod hex;
mod ids;
mod types;
mod ui;
pub mod wire;

pub use crate::command::*;
pub use crate::event::*;
pub use crate::hex::*;
pub use crate::ids::*;
pub use crate::types::*;
pub use crate::ui::*;
