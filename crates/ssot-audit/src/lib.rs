#![deny(missing_docs)]
#![doc = "Consistency checking, SSOT status reporting and the parallel module audit pipeline."]

pub mod consistency;
/// Declarative module manifests.
pub mod manifest;
pub mod module;
pub mod pipeline;
/// Module reports and their provenance.
pub mod report;
/// Presence flags and verdicts.
pub mod status;

pub use consistency::{check_consistency, ConsistencyInput, ConsistencyIssue, IssueKind, Severity};
pub use manifest::ModuleManifest;
pub use module::{ModuleSnapshot, SsotModule};
pub use pipeline::{
    audit_module, audit_modules, audit_snapshot, AuditOpts, BatchEntry, CancelToken,
    ModuleOutcome,
};
pub use report::{CertificateRecord, ModuleReport, ReportProvenance};
pub use status::{summarize, IssueCounts, SsotStatus, Verdict};
