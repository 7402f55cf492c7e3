use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, SsotError};

/// Derivation category of a registered formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FormulaCategory {
    /// Textbook relation adopted without derivation.
    Established,
    /// Axiom of the framework.
    Foundational,
    /// Relation derived inside the module.
    Derived,
}

/// Named formula metadata. Formulas are data; nothing evaluates them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Formula {
    /// Registry identifier.
    pub id: String,
    /// Human readable description or LaTeX source.
    #[serde(default)]
    pub description: String,
    /// Derivation category.
    pub category: FormulaCategory,
    /// Number of recorded derivation steps.
    #[serde(default)]
    pub derivation_step_count: u32,
}

impl Formula {
    /// Creates a formula entry.
    pub fn new(
        id: impl Into<String>,
        category: FormulaCategory,
        derivation_step_count: u32,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            category,
            derivation_step_count,
        }
    }

    /// A DERIVED formula with zero recorded steps.
    pub fn is_underived(&self) -> bool {
        match self.category {
            FormulaCategory::Derived => self.derivation_step_count == 0,
            FormulaCategory::Established | FormulaCategory::Foundational => false,
        }
    }

    /// Checks that the identifier is usable as a registry key.
    pub fn validate(&self) -> Result<(), SsotError> {
        validate_identifier("formula", &self.id)
    }
}

/// Validates a registry identifier: non-empty and free of whitespace.
pub fn validate_identifier(kind: &str, id: &str) -> Result<(), SsotError> {
    if id.is_empty() || id.chars().any(char::is_whitespace) {
        return Err(SsotError::InvalidEntry(
            ErrorInfo::new(
                format!("{kind}.id"),
                format!("{kind} identifiers must be non-empty and contain no whitespace"),
            )
            .with_context("id", id),
        ));
    }
    Ok(())
}
