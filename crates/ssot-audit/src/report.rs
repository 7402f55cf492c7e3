use serde::{Deserialize, Serialize};
use ssot_cert::{CertStatus, Certificate, CertificateEvaluation};
use ssot_core::errors::{ErrorInfo, SsotError};
use ssot_core::{
    from_json_slice, stable_hash_string, to_canonical_json_bytes, AuditPolicy, Formula, Quantity,
    ReferenceTable, SchemaVersion, REPORT_SCHEMA,
};
use ssot_validate::SelfValidationReport;

use crate::consistency::ConsistencyIssue;
use crate::status::SsotStatus;

fn tool_version() -> String {
    option_env!("GIT_COMMIT_HASH")
        .map(|value| value.to_string())
        .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string())
}

/// A certificate together with the engine's fresh evaluation of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificateRecord {
    /// Certificate as declared by the module.
    pub certificate: Certificate,
    /// Recomputed result.
    pub evaluation: CertificateEvaluation,
}

/// Provenance metadata recorded in [`ModuleReport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportProvenance {
    /// Schema version of the report layout.
    pub schema: SchemaVersion,
    /// Tolerance policy the audit ran under.
    pub policy: AuditPolicy,
    /// Source commit or crate version that produced the report.
    pub tool_version: String,
    /// Stable hash of the reference table the audit read.
    pub references_hash: String,
}

impl ReportProvenance {
    /// Captures the provenance of an audit.
    pub fn capture(policy: &AuditPolicy, references: &ReferenceTable) -> Result<Self, SsotError> {
        Ok(Self {
            schema: REPORT_SCHEMA,
            policy: policy.clone(),
            tool_version: tool_version(),
            references_hash: stable_hash_string(references)?,
        })
    }
}

/// Complete audit output for one module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleReport {
    /// Module identifier.
    pub module_id: String,
    /// Presence flags and verdict.
    pub ssot_status: SsotStatus,
    /// Registered formulas in insertion order.
    pub formulas: Vec<Formula>,
    /// Registered parameters in insertion order.
    pub parameters: Vec<Quantity>,
    /// Certificates with their evaluations, in insertion order.
    pub certificates: Vec<CertificateRecord>,
    /// Fresh self-validation report.
    pub self_validation: SelfValidationReport,
    /// Findings, most severe first.
    pub consistency_issues: Vec<ConsistencyIssue>,
    /// Provenance metadata.
    pub provenance: ReportProvenance,
    /// SHA-256 of the canonical JSON of every other field.
    pub report_hash: String,
}

impl ModuleReport {
    /// Assembles a report and stamps its hash.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        module_id: String,
        ssot_status: SsotStatus,
        formulas: Vec<Formula>,
        parameters: Vec<Quantity>,
        certificates: Vec<CertificateRecord>,
        self_validation: SelfValidationReport,
        consistency_issues: Vec<ConsistencyIssue>,
        provenance: ReportProvenance,
    ) -> Result<Self, SsotError> {
        let mut report = Self {
            module_id,
            ssot_status,
            formulas,
            parameters,
            certificates,
            self_validation,
            consistency_issues,
            provenance,
            report_hash: String::new(),
        };
        report.report_hash = report.compute_hash()?;
        Ok(report)
    }

    fn compute_hash(&self) -> Result<String, SsotError> {
        let mut unstamped = self.clone();
        unstamped.report_hash.clear();
        stable_hash_string(&unstamped)
    }

    /// Recomputes the hash and compares it with the stamped one.
    pub fn verify_hash(&self) -> Result<(), SsotError> {
        let computed = self.compute_hash()?;
        if computed == self.report_hash {
            return Ok(());
        }
        Err(SsotError::Serde(
            ErrorInfo::new("report.hash_mismatch", "report hash does not match its content")
                .with_context("module", self.module_id.clone())
                .with_context("stamped", self.report_hash.clone())
                .with_context("computed", computed),
        ))
    }

    /// Canonical JSON bytes of the report.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SsotError> {
        to_canonical_json_bytes(self)
    }

    /// Parses a report from JSON bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self, SsotError> {
        from_json_slice(data)
    }

    /// Status recorded for a certificate id.
    pub fn certificate_status(&self, id: &str) -> Option<CertStatus> {
        self.certificates
            .iter()
            .find(|record| record.certificate.id == id)
            .map(|record| record.evaluation.status)
    }
}
