use rmp_serde::{decode, encode};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

use crate::{GameCommand, GameEvent};

#[derive(Debug, Error)]
pub enum WireError {
    #[error("encode error: {0}")]
    Encode(#[from] encode::Error),
    #[error("decode error: {0}")]
    Decode(#[from] decode::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// MessagePack with named fields, so optional fields can be added without breaking old bytes.
pub fn to_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, WireError> {
    Ok(encode::to_vec_named(value)?)
}

pub fn from_bytes<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, WireError> {
    Ok(decode::from_slice(bytes)?)
}

pub fn serialize_command(cmd: &GameCommand) -> Result<Vec<u8>, WireError> {
    to_bytes(cmd)
}

pub fn deserialize_command(bytes: &[u8]) -> Result<GameCommand, WireError> {
    from_bytes(bytes)
}

pub fn serialize_events(events: &[GameEvent]) -> Result<Vec<u8>, WireError> {
    to_bytes(events)
}

pub fn deserialize_events(bytes: &[u8]) -> Result<Vec<GameEvent>, WireError> {
    from_bytes(bytes)
}

pub fn serialize_command_json(cmd: &GameCommand) -> Result<String, WireError> {
    Ok(serde_json::to_string(cmd)?)
}

pub fn deserialize_command_json(json: &str) -> Result<GameCommand, WireError> {
    Ok(serde_json::from_str(json)?)
}

pub fn serialize_events_json(events: &[GameEvent]) -> Result<String, WireError> {
    Ok(serde_json::to_string(events)?)
}

pub fn deserialize_events_json(json: &str) -> Result<Vec<GameEvent>, WireError> {
    Ok(serde_json::from_str(json)?)
}

/// Deterministic, stable 64-bit hash for raw bytes (FNV-1a).
pub fn hash_bytes_fnv1a64(bytes: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;

    bytes.iter().fold(OFFSET_BASIS, |hash, &byte| {
        (hash ^ u64::from(byte)).wrapping_mul(PRIME)
    })
}
