#![deny(missing_docs)]
#![doc = "Quantities, formulas, registries, reference constants and error types shared by the SSOT validation crates."]

pub mod errors;
/// Formula metadata and derivation categories.
pub mod formula;
/// Canonical hashing helpers.
pub mod hash;
/// Tolerance policy shared by every stage.
pub mod policy;
pub mod provenance;
pub mod quantity;
pub mod reference;
pub mod registry;
/// Canonical JSON and document loading helpers.
pub mod serde;

pub use errors::{ErrorInfo, SsotError};
pub use formula::{Formula, FormulaCategory};
pub use hash::stable_hash_string;
pub use policy::AuditPolicy;
pub use provenance::{SchemaVersion, REPORT_SCHEMA};
pub use quantity::{Quantity, QuantityCategory, Tolerance};
pub use reference::{ReferenceTable, ReferenceValue};
pub use registry::{FormulaRegistry, ParameterRegistry, Registry, RegistryEntry};
pub use serde::{from_json_slice, load_document, to_canonical_json_bytes};
