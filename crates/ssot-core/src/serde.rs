use std::collections::BTreeMap;
use std::fs;
use std::iter::FromIterator;
use std::path::Path;

use ::serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{serde_error, ErrorInfo, SsotError};

fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut ordered = BTreeMap::new();
            for (key, val) in map {
                ordered.insert(key, canonicalize(val));
            }
            Value::Object(Map::from_iter(ordered))
        }
        Value::Array(values) => Value::Array(values.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Serializes a value into canonical JSON bytes with deterministic key ordering.
pub fn to_canonical_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, SsotError> {
    let value = serde_json::to_value(value).map_err(|err| serde_error("json-encode", err))?;
    let canonical = canonicalize(value);
    let mut bytes = Vec::new();
    serde_json::to_writer(&mut bytes, &canonical).map_err(|err| serde_error("json-write", err))?;
    Ok(bytes)
}

/// Restores a value from JSON bytes.
pub fn from_json_slice<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T, SsotError> {
    serde_json::from_slice(data).map_err(|err| serde_error("json-read", err))
}

/// Loads a YAML or JSON document, choosing the decoder from the file extension.
pub fn load_document<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, SsotError> {
    let bytes = fs::read(path).map_err(|err| {
        SsotError::Serde(
            ErrorInfo::new("document-read", err.to_string())
                .with_context("path", path.display().to_string()),
        )
    })?;
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => serde_yaml::from_slice(&bytes).map_err(|err| {
            SsotError::Serde(
                ErrorInfo::new("yaml-read", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        }),
        _ => from_json_slice(&bytes),
    }
}
