//! Hex Conquest authoritative runtime
//!
//! A single [`GameController`] owns the match. Everything else talks to it through a
//! [`ControllerHandle`] and observes it through a latest-value state slot and an event bus.

pub mod bot_driver;
pub mod config;
pub mod controller;
pub mod error;
pub mod publish;
pub mod recording;
pub mod runtime;

pub use bot_driver::BotDriver;
pub use config::EngineConfig;
pub use controller::GameController;
pub use error::ControllerError;
pub use publish::{EventBus, EventSubscription, StateUpdate};
pub use recording::{FileRecordingPicker, RecordingFilePicker};
pub use runtime::{spawn, ControllerHandle};
