use serde::{Deserialize, Serialize};
use ssot_core::AuditPolicy;
use ssot_validate::SelfValidationReport;

use crate::consistency::{ConsistencyIssue, Severity};
use crate::module::ModuleSnapshot;

/// Overall verdict of a module audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Every subsystem is present and agrees with itself.
    AllGreen,
    /// Only medium or advisory findings remain.
    Advisory,
    /// A subsystem is absent or could not run.
    Incomplete,
    /// At least one critical or high finding.
    NeedsReview,
}

impl Verdict {
    /// Whether a human has to look at the module.
    pub fn needs_review(self) -> bool {
        matches!(self, Verdict::NeedsReview)
    }
}

/// Number of findings per severity tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueCounts {
    /// Critical findings.
    pub critical: usize,
    /// High findings.
    pub high: usize,
    /// Medium findings.
    pub medium: usize,
    /// Advisory findings.
    pub advisory: usize,
}

impl IssueCounts {
    /// Tallies a list of findings.
    pub fn tally(issues: &[ConsistencyIssue]) -> Self {
        issues.iter().fold(Self::default(), |mut counts, issue| {
            match issue.severity {
                Severity::Critical => counts.critical += 1,
                Severity::High => counts.high += 1,
                Severity::Medium => counts.medium += 1,
                Severity::Advisory => counts.advisory += 1,
            }
            counts
        })
    }

    /// Critical plus high findings.
    pub fn blocking(&self) -> usize {
        self.critical + self.high
    }

    /// Total number of findings.
    pub fn total(&self) -> usize {
        self.critical + self.high + self.medium + self.advisory
    }
}

/// Per-module presence flags and verdict. Always recomputed, never edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SsotStatus {
    /// At least one formula is registered.
    pub has_formulas: bool,
    /// At least one parameter is registered.
    pub has_parameters: bool,
    /// At least one certificate is registered.
    pub has_certificates: bool,
    /// At least one citation is recorded.
    pub has_references: bool,
    /// At least one self-validation check is registered.
    pub has_self_validation: bool,
    /// At least one check ran without error or panic.
    pub validate_self_callable: bool,
    /// Summary verdict.
    pub verdict: Verdict,
    /// Findings per severity tier.
    pub issue_counts: IssueCounts,
}

/// Summarizes a module from its snapshot, fresh validation and findings.
///
/// Blocking findings always win; the reporter never downgrades them.
pub fn summarize(
    snapshot: &ModuleSnapshot,
    validation: &SelfValidationReport,
    issues: &[ConsistencyIssue],
    policy: &AuditPolicy,
) -> SsotStatus {
    let issue_counts = IssueCounts::tally(issues);
    let has_formulas = !snapshot.formulas().is_empty();
    let has_parameters = !snapshot.parameters().is_empty();
    let has_self_validation = !snapshot.checks().is_empty();
    let validate_self_callable = validation.any_completed();

    let verdict = if issues.iter().any(ConsistencyIssue::is_blocking) {
        Verdict::NeedsReview
    } else if !(has_formulas && has_parameters && has_self_validation && validate_self_callable) {
        Verdict::Incomplete
    } else if issue_counts.total() > 0 {
        if policy.strict {
            Verdict::NeedsReview
        } else {
            Verdict::Advisory
        }
    } else {
        Verdict::AllGreen
    };

    SsotStatus {
        has_formulas,
        has_parameters,
        has_certificates: !snapshot.certificates().is_empty(),
        has_references: !snapshot.references().is_empty(),
        has_self_validation,
        validate_self_callable,
        verdict,
        issue_counts,
    }
}
