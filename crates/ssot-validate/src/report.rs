use serde::{Deserialize, Serialize};

use crate::check::SelfValidationCheck;

/// Aggregated self-validation result of one module.
///
/// `overall_passed` is always derived from the checks. A report ingested from
/// elsewhere may declare its own top-level flag; the declaration is kept only
/// when it contradicts the checks so the consistency checker can flag it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawReport", into = "RawReport")]
pub struct SelfValidationReport {
    checks: Vec<SelfValidationCheck>,
    declared_overall_passed: Option<bool>,
}

#[derive(Serialize, Deserialize)]
struct RawReport {
    #[serde(default)]
    checks: Vec<SelfValidationCheck>,
    #[serde(default)]
    overall_passed: Option<bool>,
}

impl From<RawReport> for SelfValidationReport {
    fn from(raw: RawReport) -> Self {
        Self::with_declaration(raw.checks, raw.overall_passed)
    }
}

impl From<SelfValidationReport> for RawReport {
    fn from(report: SelfValidationReport) -> Self {
        let overall_passed = Some(report.overall_passed());
        RawReport {
            checks: report.checks,
            overall_passed,
        }
    }
}

impl SelfValidationReport {
    /// Builds a report from executed checks.
    pub fn new(checks: Vec<SelfValidationCheck>) -> Self {
        Self {
            checks,
            declared_overall_passed: None,
        }
    }

    /// Builds a report carrying a top-level flag declared by its producer.
    pub fn with_declaration(checks: Vec<SelfValidationCheck>, declared: Option<bool>) -> Self {
        let computed = checks.iter().all(|check| check.passed);
        Self {
            checks,
            declared_overall_passed: declared.filter(|flag| *flag != computed),
        }
    }

    /// Executed checks in execution order.
    pub fn checks(&self) -> &[SelfValidationCheck] {
        &self.checks
    }

    /// AND of every check; an empty report passes vacuously.
    pub fn overall_passed(&self) -> bool {
        self.checks.iter().all(|check| check.passed)
    }

    /// Top-level flag declared by the producer when it contradicts the checks.
    pub fn contradicting_declaration(&self) -> Option<bool> {
        self.declared_overall_passed
    }

    /// Looks up a check by name.
    pub fn check(&self, name: &str) -> Option<&SelfValidationCheck> {
        self.checks.iter().find(|check| check.name == name)
    }

    /// Number of passing checks.
    pub fn passed_count(&self) -> usize {
        self.checks.iter().filter(|check| check.passed).count()
    }

    /// Whether the report holds no checks.
    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Whether at least one check function ran to completion.
    pub fn any_completed(&self) -> bool {
        self.checks.iter().any(|check| !check.errored)
    }
}
