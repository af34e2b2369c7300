use conquest_protocol::wire::{from_bytes, hash_bytes_fnv1a64, to_bytes};
use conquest_protocol::GameCommand;
use serde::{Deserialize, Serialize};

use crate::{cancel_selection, CommandHistory, GameRng, GameState, RecordingError};

/// Recording schema version.
pub const RECORDING_VERSION: u32 = 1;

/// Commands that rebuild a match from its opening state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayLog {
    pub initial: GameState,
    #[serde(default)]
    pub commands: Vec<GameCommand>,
}

/// Versioned snapshot of a match, optionally with the full command log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recording {
    pub version: u32,
    pub seed: u64,
    /// Dice stream position, so a restored match keeps rolling the same sequence.
    pub rng_state: [u8; 32],
    /// FNV-1a of the encoded snapshot.
    pub checksum: u64,
    pub snapshot: GameState,
    #[serde(default)]
    pub replay: Option<ReplayLog>,
}

/// Everything a controller needs to resume a loaded recording.
#[derive(Clone, Debug)]
pub struct Restored {
    pub state: GameState,
    pub history: CommandHistory,
    pub initial: GameState,
    pub log: Vec<GameCommand>,
    pub seed: u64,
    pub rng: GameRng,
}

impl Recording {
    /// Capture `snapshot`. A pending selection is dropped; selections are not part of history.
    pub fn capture(
        seed: u64,
        rng: &GameRng,
        snapshot: &GameState,
        replay: Option<ReplayLog>,
    ) -> Result<Self, RecordingError> {
        let snapshot = match cancel_selection(snapshot) {
            Ok(applied) => applied.state,
            Err(_) => snapshot.clone(),
        };
        let checksum = hash_bytes_fnv1a64(&to_bytes(&snapshot)?);
        Ok(Self {
            version: RECORDING_VERSION,
            seed,
            rng_state: rng.state_bytes(),
            checksum,
            snapshot,
            replay,
        })
    }

    pub fn encode(&self) -> Result<Vec<u8>, RecordingError> {
        Ok(to_bytes(self)?)
    }

    /// Decode and integrity-check a recording. Does not validate game rules; see
    /// [`Recording::restore`].
    pub fn decode(bytes: &[u8]) -> Result<Self, RecordingError> {
        let recording: Recording = from_bytes(bytes)?;
        if recording.version != RECORDING_VERSION {
            return Err(RecordingError::UnsupportedVersion(recording.version));
        }
        let got = hash_bytes_fnv1a64(&to_bytes(&recording.snapshot)?);
        if got != recording.checksum {
            return Err(RecordingError::ChecksumMismatch {
                expected: recording.checksum,
                got,
            });
        }
        Ok(recording)
    }

    /// Rebuild a playable match. All-or-nothing: any failed check returns an error and produces
    /// no state.
    ///
    /// With a replay log, every command is re-validated from the opening state and the result
    /// must equal the snapshot; the rebuilt history is undoable.
    pub fn restore(&self, max_depth: Option<usize>) -> Result<Restored, RecordingError> {
        self.snapshot.validate()?;
        let mut history = CommandHistory::new(max_depth);

        let Some(replay) = &self.replay else {
            return Ok(Restored {
                state: self.snapshot.clone(),
                history,
                initial: self.snapshot.clone(),
                log: Vec::new(),
                seed: self.seed,
                rng: GameRng::from_state_bytes(self.rng_state),
            });
        };

        replay.initial.validate()?;
        let mut state = replay.initial.clone();
        for (index, command) in replay.commands.iter().enumerate() {
            state = history
                .execute(&state, command.clone())
                .map_err(|source| RecordingError::ReplayFailed { index, source })?
                .state;
        }
        if state != self.snapshot {
            return Err(RecordingError::ReplayDiverged);
        }

        Ok(Restored {
            state,
            history,
            initial: replay.initial.clone(),
            log: replay.commands.clone(),
            seed: self.seed,
            rng: GameRng::from_state_bytes(self.rng_state),
        })
    }
}
