//! bincode encoding for stored values.

use serde::de::DeserializeOwned;
use serde::Serialize;
use shared_types::{GateError, GateResult};

pub fn encode<T: Serialize>(value: &T) -> GateResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| GateError::Serialization(e.to_string()))
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> GateResult<T> {
    bincode::deserialize(bytes).map_err(|e| GateError::Serialization(e.to_string()))
}
