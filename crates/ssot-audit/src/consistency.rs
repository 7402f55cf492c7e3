//! Cross-examination of certificates, self-validation and raw parameter values.
//!
//! Every pass is linear in the collection it walks. Lookups go through the
//! registries or through a subject index built once per call, so the whole
//! check is O(F + P + C + S). The checker only reads; running it twice on the
//! same snapshot yields the same list.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use ssot_cert::{
    exact_band, CertStatus, Certificate, CertificateEvaluation, OperandSource, Predicate,
};
use ssot_core::{AuditPolicy, ReferenceTable};
use ssot_validate::{SelfValidationCheck, SelfValidationReport};

use crate::module::ModuleSnapshot;

/// Severity tier of a finding, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Arithmetic a certificate gets wrong on its own terms.
    Critical,
    /// Contradictions between independently computed verdicts.
    High,
    /// Misreported numbers and data-quality violations.
    Medium,
    /// Worth a reviewer's attention; not a contradiction.
    Advisory,
}

/// Kind of contradiction detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// An arithmetic certificate's stated result differs from the recomputed one.
    ArithmeticError,
    /// A certificate verdict disagrees with an overlapping self-validation check.
    CertificateValidationDisagreement,
    /// A declared top-level `overall_passed` contradicts its own checks.
    AggregateMismatch,
    /// A non-arithmetic certificate recomputes to FAIL.
    ClaimRefuted,
    /// A fresh self-validation check ran to completion and failed.
    SelfValidationFailed,
    /// A stated deviation differs from the independently computed one.
    DeviationMismatch,
    /// A certificate could not be evaluated.
    UnverifiedCertificate,
    /// A MEASURED parameter without an expected value.
    MissingExpectedValue,
    /// A DERIVED/PREDICTED parameter claiming an outcome without a value.
    MissingComputedValue,
    /// A DERIVED formula with no recorded derivation steps.
    UnderivedFormula,
    /// A fresh self-validation check errored or panicked.
    SelfCheckErrored,
    /// A no-expected-value parameter that a certificate compares externally.
    AmbiguousExpectationMarker,
    /// A published check verdict differs from the fresh run.
    PublishedCheckDrift,
}

impl IssueKind {
    /// Severity tier of the kind.
    pub fn severity(self) -> Severity {
        match self {
            IssueKind::ArithmeticError => Severity::Critical,
            IssueKind::CertificateValidationDisagreement
            | IssueKind::AggregateMismatch
            | IssueKind::ClaimRefuted
            | IssueKind::SelfValidationFailed => Severity::High,
            IssueKind::DeviationMismatch
            | IssueKind::UnverifiedCertificate
            | IssueKind::MissingExpectedValue
            | IssueKind::MissingComputedValue
            | IssueKind::UnderivedFormula
            | IssueKind::SelfCheckErrored => Severity::Medium,
            IssueKind::AmbiguousExpectationMarker | IssueKind::PublishedCheckDrift => {
                Severity::Advisory
            }
        }
    }
}

/// A single detected contradiction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsistencyIssue {
    /// Kind of contradiction.
    pub kind: IssueKind,
    /// Severity tier derived from the kind.
    pub severity: Severity,
    /// Parameter, formula, certificate or check the finding is about.
    pub subject: String,
    /// Human readable explanation.
    pub detail: String,
}

impl ConsistencyIssue {
    fn new(kind: IssueKind, subject: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.severity(),
            subject: subject.into(),
            detail: detail.into(),
        }
    }

    /// Whether the finding blocks an all-green status.
    pub fn is_blocking(&self) -> bool {
        matches!(self.severity, Severity::Critical | Severity::High)
    }
}

/// Read-only inputs of the checker.
#[derive(Debug, Clone, Copy)]
pub struct ConsistencyInput<'a> {
    /// Frozen module state.
    pub snapshot: &'a ModuleSnapshot,
    /// Certificate engine output, one per certificate.
    pub evaluations: &'a [CertificateEvaluation],
    /// Fresh self-validation report.
    pub validation: &'a SelfValidationReport,
    /// Preloaded reference constants.
    pub references: &'a ReferenceTable,
    /// Tolerance policy.
    pub policy: &'a AuditPolicy,
}

struct SubjectIndex<'a> {
    by_subject: HashMap<&'a str, Vec<&'a SelfValidationCheck>>,
}

impl<'a> SubjectIndex<'a> {
    fn new(report: &'a SelfValidationReport) -> Self {
        let mut by_subject: HashMap<&'a str, Vec<&'a SelfValidationCheck>> = HashMap::new();
        for check in report.checks() {
            for subject in &check.subjects {
                by_subject.entry(subject.as_str()).or_default().push(check);
            }
        }
        Self { by_subject }
    }

    /// Checks covering any of the subjects, deduplicated, in report order of discovery.
    fn overlapping<'s>(
        &self,
        subjects: impl IntoIterator<Item = &'s str>,
    ) -> Vec<&'a SelfValidationCheck> {
        let mut seen = BTreeSet::new();
        let mut found = Vec::new();
        for subject in subjects {
            if let Some(checks) = self.by_subject.get(subject) {
                for check in checks {
                    if seen.insert(check.name.as_str()) {
                        found.push(*check);
                    }
                }
            }
        }
        found
    }
}

/// Detects structural contradictions, most severe first.
pub fn check_consistency(input: &ConsistencyInput<'_>) -> Vec<ConsistencyIssue> {
    let snapshot = input.snapshot;
    let index = SubjectIndex::new(input.validation);
    let mut issues = Vec::new();

    for formula in snapshot.formulas().list() {
        if formula.is_underived() {
            issues.push(ConsistencyIssue::new(
                IssueKind::UnderivedFormula,
                &formula.id,
                "DERIVED formula records zero derivation steps",
            ));
        }
    }

    let evaluations: HashMap<&str, &CertificateEvaluation> = input
        .evaluations
        .iter()
        .map(|eval| (eval.certificate_id.as_str(), eval))
        .collect();
    let mut externally_compared: HashMap<&str, &str> = HashMap::new();
    for certificate in snapshot.certificates().list() {
        for name in certificate.claim.externally_compared() {
            externally_compared.entry(name).or_insert(&certificate.id);
        }
        check_certificate(
            input,
            &index,
            certificate,
            evaluations.get(certificate.id.as_str()).copied(),
            &mut issues,
        );
    }

    for quantity in snapshot.parameters().list() {
        if quantity.category.requires_expected() && quantity.expected.is_none() {
            issues.push(ConsistencyIssue::new(
                IssueKind::MissingExpectedValue,
                &quantity.name,
                format!("{:?} parameter carries no expected value", quantity.category),
            ));
        }
        if quantity.category.requires_value_when_claimed()
            && quantity.claims_numeric_outcome
            && quantity.value.is_none()
        {
            issues.push(ConsistencyIssue::new(
                IssueKind::MissingComputedValue,
                &quantity.name,
                "claims a numeric outcome but carries no computed value",
            ));
        }
        if let Some(stated) = quantity.stated_deviation {
            for check in index.overlapping([quantity.name.as_str()]) {
                if let Some(computed) = check.sigma() {
                    if input.policy.deviations_disagree(stated, computed) {
                        issues.push(ConsistencyIssue::new(
                            IssueKind::DeviationMismatch,
                            &quantity.name,
                            format!(
                                "states deviation {stated} but check `{}` computes {computed} sigma",
                                check.name
                            ),
                        ));
                    }
                }
            }
        }
        if quantity.expected.is_none() && quantity.value.is_some() {
            if let Some(certificate_id) = externally_compared.get(quantity.name.as_str()) {
                issues.push(ConsistencyIssue::new(
                    IssueKind::AmbiguousExpectationMarker,
                    &quantity.name,
                    format!(
                        "marked without expected value, yet certificate `{certificate_id}` compares it to an external constant"
                    ),
                ));
            }
        }
    }

    for check in input.validation.checks().iter().filter(|check| !check.passed) {
        let kind = if check.errored {
            IssueKind::SelfCheckErrored
        } else {
            IssueKind::SelfValidationFailed
        };
        issues.push(ConsistencyIssue::new(kind, &check.name, check.message.clone()));
    }
    check_aggregate(input.validation, "self_validation", &mut issues);
    if let Some(published) = snapshot.published_validation() {
        check_aggregate(published, "published_validation", &mut issues);
        for published_check in published.checks() {
            if let Some(fresh) = input.validation.check(&published_check.name) {
                if fresh.passed != published_check.passed {
                    issues.push(ConsistencyIssue::new(
                        IssueKind::PublishedCheckDrift,
                        &published_check.name,
                        format!(
                            "published passed={} but fresh run gives passed={}",
                            published_check.passed, fresh.passed
                        ),
                    ));
                }
            }
        }
    }

    issues.sort_by_key(|issue| issue.severity);
    issues
}

fn check_certificate(
    input: &ConsistencyInput<'_>,
    index: &SubjectIndex<'_>,
    certificate: &Certificate,
    evaluation: Option<&CertificateEvaluation>,
    issues: &mut Vec<ConsistencyIssue>,
) {
    let id = certificate.id.as_str();
    let verdict = match &certificate.claim {
        Predicate::Arithmetic {
            expr,
            stated,
            tolerance,
        } => {
            let source = OperandSource::new(input.snapshot.parameters(), input.references);
            match (expr.evaluate(&source), exact_band(*tolerance, input.policy).ok()) {
                (Ok(computed), Some(_)) if !(computed - stated).is_finite() => {
                    issues.push(ConsistencyIssue::new(
                        IssueKind::UnverifiedCertificate,
                        id,
                        format!("{expr} = {computed} cannot be compared with {stated}"),
                    ));
                    None
                }
                (Ok(computed), Some(band)) => {
                    let holds = (computed - stated).abs() <= band;
                    if !holds {
                        issues.push(ConsistencyIssue::new(
                            IssueKind::ArithmeticError,
                            id,
                            format!("{expr} recomputes to {computed}, certificate states {stated}"),
                        ));
                    }
                    Some(holds)
                }
                (Ok(_), None) => {
                    issues.push(ConsistencyIssue::new(
                        IssueKind::UnverifiedCertificate,
                        id,
                        "tolerance must be finite and non-negative",
                    ));
                    None
                }
                (Err(err), _) => {
                    issues.push(ConsistencyIssue::new(
                        IssueKind::UnverifiedCertificate,
                        id,
                        format!("{}: {}", err.family(), err.info().message),
                    ));
                    None
                }
            }
        }
        Predicate::Equality { .. } | Predicate::SigmaBound { .. } => match evaluation {
            None => {
                issues.push(ConsistencyIssue::new(
                    IssueKind::UnverifiedCertificate,
                    id,
                    "no evaluation recorded for certificate",
                ));
                None
            }
            Some(eval) => match eval.status {
                CertStatus::Pass => Some(true),
                CertStatus::Fail => {
                    issues.push(ConsistencyIssue::new(
                        IssueKind::ClaimRefuted,
                        id,
                        format!(
                            "{} fails: difference {} exceeds band {}",
                            certificate.claim,
                            eval.difference.unwrap_or(f64::NAN),
                            eval.band.unwrap_or(f64::NAN)
                        ),
                    ));
                    Some(false)
                }
                CertStatus::Unverified => {
                    issues.push(ConsistencyIssue::new(
                        IssueKind::UnverifiedCertificate,
                        id,
                        eval.detail.clone().unwrap_or_default(),
                    ));
                    None
                }
            },
        },
    };

    let scope = std::iter::once(id).chain(certificate.claim.quantity_names());
    let overlapping = index.overlapping(scope);

    if let Some(holds) = verdict {
        for check in overlapping.iter().filter(|check| !check.errored) {
            if check.passed != holds {
                issues.push(ConsistencyIssue::new(
                    IssueKind::CertificateValidationDisagreement,
                    id,
                    format!(
                        "certificate {} but check `{}` {}",
                        if holds { "passes" } else { "fails" },
                        check.name,
                        if check.passed { "passes" } else { "fails" }
                    ),
                ));
            }
        }
    }

    if let Some(stated) = certificate.stated_deviation {
        if let Some(computed) = evaluation.and_then(|eval| eval.deviation_sigma) {
            if input.policy.deviations_disagree(stated, computed) {
                issues.push(ConsistencyIssue::new(
                    IssueKind::DeviationMismatch,
                    id,
                    format!("states deviation {stated} but the claim recomputes to {computed} sigma"),
                ));
            }
        }
        for check in &overlapping {
            if let Some(computed) = check.sigma() {
                if input.policy.deviations_disagree(stated, computed) {
                    issues.push(ConsistencyIssue::new(
                        IssueKind::DeviationMismatch,
                        id,
                        format!(
                            "states deviation {stated} but check `{}` computes {computed} sigma",
                            check.name
                        ),
                    ));
                }
            }
        }
    }
}

fn check_aggregate(report: &SelfValidationReport, label: &str, issues: &mut Vec<ConsistencyIssue>) {
    if let Some(declared) = report.contradicting_declaration() {
        issues.push(ConsistencyIssue::new(
            IssueKind::AggregateMismatch,
            label,
            format!(
                "declares overall_passed={declared} but {}/{} checks pass",
                report.passed_count(),
                report.checks().len()
            ),
        ));
    }
}
