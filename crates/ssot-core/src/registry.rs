//! Insertion-ordered, freezable registries keyed by name.

use indexmap::IndexMap;

use crate::errors::{ErrorInfo, SsotError};
use crate::formula::Formula;
use crate::quantity::Quantity;

/// Entry stored in a [`Registry`].
pub trait RegistryEntry: Clone {
    /// Registry label used in diagnostics.
    const KIND: &'static str;

    /// Unique key of the entry.
    fn key(&self) -> &str;

    /// Structural validation run at registration time.
    fn validate(&self) -> Result<(), SsotError> {
        Ok(())
    }
}

impl RegistryEntry for Quantity {
    const KIND: &'static str = "parameters";

    fn key(&self) -> &str {
        &self.name
    }

    fn validate(&self) -> Result<(), SsotError> {
        Quantity::validate(self)
    }
}

impl RegistryEntry for Formula {
    const KIND: &'static str = "formulas";

    fn key(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<(), SsotError> {
        Formula::validate(self)
    }
}

/// Append-only registry that becomes read-only once frozen.
#[derive(Debug, Clone)]
pub struct Registry<T> {
    entries: IndexMap<String, T>,
    frozen: bool,
}

/// Registry of formulas owned by a single module.
pub type FormulaRegistry = Registry<Formula>;
/// Registry of parameters owned by a single module.
pub type ParameterRegistry = Registry<Quantity>;

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self {
            entries: IndexMap::new(),
            frozen: false,
        }
    }
}

impl<T: RegistryEntry> Registry<T> {
    /// Creates an empty, unfrozen registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new entry.
    pub fn register(&mut self, entry: T) -> Result<(), SsotError> {
        if self.frozen {
            return Err(SsotError::Frozen(
                ErrorInfo::new(
                    "registry.frozen",
                    "registration attempted after the build phase completed",
                )
                .with_context("registry", T::KIND)
                .with_context("key", entry.key()),
            ));
        }
        entry.validate()?;
        if self.entries.contains_key(entry.key()) {
            return Err(SsotError::DuplicateKey(
                ErrorInfo::new(
                    "registry.duplicate",
                    format!("`{}` is already registered", entry.key()),
                )
                .with_context("registry", T::KIND)
                .with_context("key", entry.key()),
            ));
        }
        self.entries.insert(entry.key().to_string(), entry);
        Ok(())
    }

    /// Looks up an entry by key.
    pub fn get(&self, key: &str) -> Result<&T, SsotError> {
        self.entries
            .get(key)
            .ok_or_else(|| SsotError::not_found(T::KIND, key))
    }

    /// Whether an entry with the given key exists.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Iterates entries in insertion order. Each call starts a fresh pass.
    pub fn list(&self) -> impl ExactSizeIterator<Item = &T> + '_ {
        self.entries.values()
    }

    /// Number of registered entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ends the build phase.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Whether the build phase has ended.
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Builds and freezes a registry from an iterator of entries.
    pub fn from_entries(entries: impl IntoIterator<Item = T>) -> Result<Self, SsotError> {
        let mut registry = Self::new();
        for entry in entries {
            registry.register(entry)?;
        }
        registry.freeze();
        Ok(registry)
    }
}
