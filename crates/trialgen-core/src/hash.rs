//! Canonical JSON encoding and stable hashing.

use std::collections::BTreeMap;
use std::iter::FromIterator;

use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::errors::{ErrorInfo, TrialgenError};

fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let ordered = map
                .into_iter()
                .map(|(key, value)| (key, canonicalize(value)))
                .collect::<BTreeMap<_, _>>();
            Value::Object(Map::from_iter(ordered))
        }
        Value::Array(values) => Value::Array(values.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Serializes a value into canonical JSON bytes with sorted object keys.
pub fn to_canonical_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, TrialgenError> {
    let value = serde_json::to_value(value)
        .map_err(|err| TrialgenError::Serde(ErrorInfo::new("json-serialize", err.to_string())))?;
    let mut bytes = Vec::new();
    serde_json::to_writer(&mut bytes, &canonicalize(value))
        .map_err(|err| TrialgenError::Serde(ErrorInfo::new("json-write", err.to_string())))?;
    Ok(bytes)
}

/// Computes a stable hexadecimal SHA-256 over the canonical JSON encoding.
pub fn stable_hash_string<T: Serialize>(value: &T) -> Result<String, TrialgenError> {
    let bytes = to_canonical_json_bytes(value)?;
    Ok(format!("{:x}", Sha256::digest(bytes)))
}
