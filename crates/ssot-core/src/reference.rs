//! Preloaded external reference constants.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, SsotError};
use crate::serde::load_document;

/// A single externally cited constant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceValue {
    /// Central value.
    pub value: f64,
    /// One-sigma standard uncertainty, when published.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uncertainty: Option<f64>,
    /// Citation, e.g. `CODATA 2018`.
    #[serde(default)]
    pub source: String,
    /// Optional unit label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl ReferenceValue {
    /// Creates an exact reference value.
    pub fn exact(value: f64, source: impl Into<String>) -> Self {
        Self {
            value,
            uncertainty: None,
            source: source.into(),
            unit: None,
        }
    }

    /// Attaches a standard uncertainty.
    pub fn with_uncertainty(mut self, uncertainty: f64) -> Self {
        self.uncertainty = Some(uncertainty);
        self
    }
}

/// Immutable lookup table of reference constants keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferenceTable {
    entries: BTreeMap<String, ReferenceValue>,
}

impl ReferenceTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a constant while the table is being assembled.
    pub fn insert(&mut self, key: impl Into<String>, value: ReferenceValue) -> Result<(), SsotError> {
        let key = key.into();
        check_entry(&key, &value)?;
        if self.entries.contains_key(&key) {
            return Err(SsotError::DuplicateKey(
                ErrorInfo::new("reference.duplicate", format!("`{key}` is already defined"))
                    .with_context("key", key),
            ));
        }
        self.entries.insert(key, value);
        Ok(())
    }

    /// Adds a constant, builder style.
    pub fn with(mut self, key: impl Into<String>, value: ReferenceValue) -> Result<Self, SsotError> {
        self.insert(key, value)?;
        Ok(self)
    }

    /// Looks up a constant.
    pub fn get(&self, key: &str) -> Result<&ReferenceValue, SsotError> {
        self.entries
            .get(key)
            .ok_or_else(|| SsotError::not_found("references", key))
    }

    /// Iterates constants in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ReferenceValue)> + '_ {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Number of constants.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Loads and validates a YAML or JSON reference table.
    pub fn load(path: &Path) -> Result<Self, SsotError> {
        let table: ReferenceTable = load_document(path)?;
        for (key, value) in &table.entries {
            check_entry(key, value)?;
        }
        Ok(table)
    }
}

fn check_entry(key: &str, value: &ReferenceValue) -> Result<(), SsotError> {
    let finite = value.value.is_finite()
        && value
            .uncertainty
            .map_or(true, |sigma| sigma.is_finite() && sigma > 0.0);
    if key.is_empty() || !finite {
        return Err(SsotError::InvalidEntry(
            ErrorInfo::new(
                "reference.invalid",
                "reference constants need a key, a finite value and a positive uncertainty",
            )
            .with_context("key", key),
        ));
    }
    Ok(())
}
