use conquest_core::{InvalidCommand, NothingToRedo, NothingToUndo, RecordingError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("invalid command: {0}")]
    Invalid(#[from] InvalidCommand),
    #[error(transparent)]
    NothingToUndo(#[from] NothingToUndo),
    #[error(transparent)]
    NothingToRedo(#[from] NothingToRedo),
    #[error("recording rejected: {0}")]
    Recording(#[from] RecordingError),
    #[error("recording capability failed: {0}")]
    RecordingIoFailure(String),
    #[error("decision computed at revision {computed}, state is at revision {current}")]
    StaleDecision { computed: u64, current: u64 },
    #[error("controller has shut down")]
    Closed,
}
