//! Structured error types shared across SSOT crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`SsotError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (names, identifiers, values).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for the SSOT framework.
///
/// Build-time families (`DuplicateKey`, `InvalidEntry`, `Frozen`) are fatal to
/// the module being built. Evaluation-time families (`NotFound`,
/// `MissingOperand`, `InvalidPredicate`) are recovered locally by the engine and
/// runner and surface as `UNVERIFIED` certificates or failed checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum SsotError {
    /// A name or identifier is missing from a registry.
    #[error("not found: {0}")]
    NotFound(ErrorInfo),
    /// A name or identifier was registered twice.
    #[error("duplicate key: {0}")]
    DuplicateKey(ErrorInfo),
    /// A certificate references an operand that carries no usable value.
    #[error("missing operand: {0}")]
    MissingOperand(ErrorInfo),
    /// A predicate cannot be evaluated as written.
    #[error("invalid predicate: {0}")]
    InvalidPredicate(ErrorInfo),
    /// A registry entry is malformed.
    #[error("invalid entry: {0}")]
    InvalidEntry(ErrorInfo),
    /// A registry was mutated after its build phase completed.
    #[error("frozen registry: {0}")]
    Frozen(ErrorInfo),
    /// Serialization, schema and file errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
    /// The module audit was cancelled.
    #[error("cancelled: {0}")]
    Cancelled(ErrorInfo),
    /// The execution environment could not be set up.
    #[error("runtime error: {0}")]
    Runtime(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl SsotError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            SsotError::NotFound(info)
            | SsotError::DuplicateKey(info)
            | SsotError::MissingOperand(info)
            | SsotError::InvalidPredicate(info)
            | SsotError::InvalidEntry(info)
            | SsotError::Frozen(info)
            | SsotError::Serde(info)
            | SsotError::Cancelled(info)
            | SsotError::Runtime(info) => info,
        }
    }

    /// Short family label used when recording errors as data.
    pub fn family(&self) -> &'static str {
        match self {
            SsotError::NotFound(_) => "NotFound",
            SsotError::DuplicateKey(_) => "DuplicateKey",
            SsotError::MissingOperand(_) => "MissingOperand",
            SsotError::InvalidPredicate(_) => "InvalidPredicate",
            SsotError::InvalidEntry(_) => "InvalidEntry",
            SsotError::Frozen(_) => "Frozen",
            SsotError::Serde(_) => "Serde",
            SsotError::Cancelled(_) => "Cancelled",
            SsotError::Runtime(_) => "Runtime",
        }
    }

    /// Builds a [`SsotError::NotFound`] for a registry lookup.
    pub fn not_found(registry: &str, key: &str) -> Self {
        SsotError::NotFound(
            ErrorInfo::new("registry.not_found", format!("`{key}` is not registered"))
                .with_context("registry", registry)
                .with_context("key", key),
        )
    }

    /// Builds a [`SsotError::MissingOperand`] for an operand without a value.
    pub fn missing_operand(operand: &str, reason: impl Into<String>) -> Self {
        SsotError::MissingOperand(
            ErrorInfo::new("cert.missing_operand", reason).with_context("operand", operand),
        )
    }

    /// Builds a [`SsotError::InvalidPredicate`].
    pub fn invalid_predicate(code: &str, message: impl Into<String>) -> Self {
        SsotError::InvalidPredicate(ErrorInfo::new(code, message))
    }
}

/// Convenience constructor used by the serde helpers.
pub(crate) fn serde_error(code: &str, err: impl ToString) -> SsotError {
    SsotError::Serde(ErrorInfo::new(code, err.to_string()))
}
