use conquest_protocol::{wire::WireError, Hex, Phase, PlayerId, RegionId, TerritoryId};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MapError {
    #[error("map has no territories")]
    Empty,
    #[error("map exceeds the territory id space")]
    TooManyTerritories,
    #[error("territory ids must be dense and ordered (found {0})")]
    NonContiguousTerritory(TerritoryId),
    #[error("region ids must be dense and ordered (found {0:?})")]
    NonContiguousRegion(RegionId),
    #[error("territory {territory} references unknown region {region:?}")]
    UnknownRegion {
        territory: TerritoryId,
        region: RegionId,
    },
    #[error("two territories share hex {0}")]
    DuplicateHex(Hex),
}

/// A snapshot that breaks a game-state invariant.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("match needs at least two players")]
    NotEnoughPlayers,
    #[error("invalid map: {0}")]
    InvalidMap(#[from] MapError),
    #[error("player at index {index} has id {id}")]
    PlayerIdMismatch { index: usize, id: PlayerId },
    #[error("territory table has {found} entries, map has {expected}")]
    TerritoryCountMismatch { expected: usize, found: usize },
    #[error("territory entry {index} has id {id}")]
    TerritoryIdMismatch { index: usize, id: TerritoryId },
    #[error("territory {territory} is owned by unknown player {owner}")]
    UnknownOwner {
        territory: TerritoryId,
        owner: PlayerId,
    },
    #[error("owned territory {0} holds no armies")]
    EmptyOwnedTerritory(TerritoryId),
    #[error("eliminated player {player} still owns {territory}")]
    EliminatedOwner {
        player: PlayerId,
        territory: TerritoryId,
    },
    #[error("player {0} owns nothing but is not marked eliminated")]
    UnmarkedElimination(PlayerId),
    #[error("current player {0} is unknown or eliminated")]
    InvalidCurrentPlayer(PlayerId),
    #[error("phase {phase:?} is inconsistent with selection {selection:?}")]
    SelectionMismatch {
        phase: Phase,
        selection: Option<TerritoryId>,
    },
    #[error("recorded winner {recorded} differs from sole owner {actual:?}")]
    WinnerMismatch {
        recorded: PlayerId,
        actual: Option<PlayerId>,
    },
    #[error("only {0:?} owns territory but the match is not over")]
    UndeclaredWinner(PlayerId),
    #[error("turn counter must start at 1")]
    InvalidTurn,
}

/// A command or selection that violates the current phase or state. State is left unchanged.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InvalidCommand {
    #[error("{action} is not allowed during {phase:?}")]
    WrongPhase { action: &'static str, phase: Phase },
    #[error("the match is over")]
    GameOver,
    #[error("unknown territory {0}")]
    UnknownTerritory(TerritoryId),
    #[error("territory {territory} does not belong to current player {player}")]
    NotOwnedByCurrentPlayer {
        territory: TerritoryId,
        player: PlayerId,
    },
    #[error("territory {0} cannot attack (needs two armies and an adjacent enemy)")]
    NoAttackPotential(TerritoryId),
    #[error("{to} is not adjacent to {from}")]
    NotAdjacent { from: TerritoryId, to: TerritoryId },
    #[error("{0} is not an enemy territory")]
    TargetNotEnemy(TerritoryId),
    #[error("attack must commit at least one army")]
    NoArmiesCommitted,
    #[error("{territory} holds {available} armies; committing {committed} leaves none behind")]
    NotEnoughArmies {
        territory: TerritoryId,
        available: u32,
        committed: u32,
    },
    #[error("attack source {requested} differs from selected territory {selected}")]
    SelectionMismatch {
        selected: TerritoryId,
        requested: TerritoryId,
    },
    #[error("nothing is selected")]
    NothingSelected,
    #[error("attack outcome is inconsistent with {committed} attackers against {defenders} defenders")]
    InconsistentOutcome { committed: u32, defenders: u32 },
    #[error("distribution of {requested} exceeds entitlement {entitlement}")]
    ExceedsEntitlement { entitlement: u32, requested: u32 },
    #[error("distribution of {requested} falls short of entitlement {entitlement}")]
    BelowEntitlement { entitlement: u32, requested: u32 },
    #[error("player {player} is not a bot whose turn it is")]
    NotBotTurn { player: PlayerId },
}

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("nothing to undo")]
pub struct NothingToUndo;

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("nothing to redo")]
pub struct NothingToRedo;

#[derive(Debug, Error)]
pub enum RecordingError {
    #[error("wire error: {0}")]
    Wire(#[from] WireError),
    #[error("unsupported recording version: {0}")]
    UnsupportedVersion(u32),
    #[error("snapshot checksum mismatch (expected {expected:016x}, got {got:016x})")]
    ChecksumMismatch { expected: u64, got: u64 },
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(#[from] StateError),
    #[error("replay rejected command {index}: {source}")]
    ReplayFailed {
        index: usize,
        #[source]
        source: InvalidCommand,
    },
    #[error("replayed state differs from the recorded snapshot")]
    ReplayDiverged,
}
