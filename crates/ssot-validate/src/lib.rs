#![deny(missing_docs)]
#![doc = "Self-validation runner: ordered checks, cached intermediates and derived verdicts."]

/// Check records, outcomes and confidence intervals.
pub mod check;
pub mod declared;
/// Aggregated self-validation reports.
pub mod report;
pub mod runner;

pub use check::{CheckOutcome, ConfidenceInterval, SelfValidationCheck};
pub use declared::{CheckSpec, DeclaredCheck};
pub use report::SelfValidationReport;
pub use runner::{CheckContext, CheckRegistry, SelfCheck, SelfValidationRunner};
