//! Declarative checks for modules described by data files.

use serde::{Deserialize, Serialize};
use ssot_cert::{exact_band, Expr};
use ssot_core::errors::SsotError;
use ssot_core::Tolerance;

use crate::check::{CheckOutcome, ConfidenceInterval};
use crate::runner::{check_error, CheckContext, SelfCheck};

/// Comparison performed by a declared check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckSpec {
    /// Compare a parameter's value with its own expected value under its tolerance.
    ExpectedValue {
        /// Parameter under test.
        subject: String,
    },
    /// Compare a parameter with a reference constant in standard errors.
    ReferenceValue {
        /// Parameter under test.
        subject: String,
        /// Reference table key.
        reference: String,
        /// Standard error; defaults to the reference uncertainty.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stderr: Option<f64>,
        /// Accepted number of standard errors.
        sigma: f64,
    },
    /// Recompute an expression and compare it with an expected number.
    Arithmetic {
        /// Expression to recompute.
        expr: Expr,
        /// Expected result.
        expected: f64,
        /// Explicit band; the policy epsilon applies when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tolerance: Option<f64>,
    },
}

/// A named declarative check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeclaredCheck {
    /// Check name.
    pub name: String,
    /// Comparison to perform.
    #[serde(flatten)]
    pub spec: CheckSpec,
    /// Extra subjects (usually certificate ids) the check covers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub covers: Vec<String>,
}

impl DeclaredCheck {
    /// Subjects derived from the comparison plus the declared extras.
    pub fn subjects(&self) -> Vec<String> {
        let mut subjects: Vec<String> = match &self.spec {
            CheckSpec::ExpectedValue { subject } | CheckSpec::ReferenceValue { subject, .. } => {
                vec![subject.clone()]
            }
            CheckSpec::Arithmetic { expr, .. } => {
                let mut names = Vec::new();
                expr.collect_quantities(&mut names);
                names.into_iter().map(str::to_string).collect()
            }
        };
        for extra in &self.covers {
            if !subjects.contains(extra) {
                subjects.push(extra.clone());
            }
        }
        subjects
    }

    /// Converts the declaration into an executable check.
    pub fn into_check(self) -> SelfCheck {
        let subjects = self.subjects();
        let spec = self.spec;
        SelfCheck::new(self.name, move |ctx| evaluate_spec(&spec, ctx)).covering(subjects)
    }
}

fn evaluate_spec(spec: &CheckSpec, ctx: &CheckContext<'_>) -> Result<CheckOutcome, SsotError> {
    match spec {
        CheckSpec::ExpectedValue { subject } => {
            let quantity = ctx.quantity(subject)?;
            let value = ctx.value(subject)?;
            let expected = quantity.expected.ok_or_else(|| {
                SsotError::missing_operand(subject, format!("`{subject}` has no expected value"))
            })?;
            let delta = (value - expected).abs();
            let band = quantity
                .tolerance
                .as_ref()
                .map_or(ctx.policy.default_epsilon, Tolerance::band);
            let outcome = CheckOutcome::decide(
                delta <= band,
                format!("|{value} - {expected}| = {delta} against band {band}"),
            )
            .with_intermediate("deviation", ctx.policy.round(delta));
            Ok(match quantity.tolerance.as_ref().and_then(Tolerance::stderr) {
                Some(stderr) => outcome.with_interval(ConfidenceInterval::around(
                    value,
                    band,
                    ctx.policy.round(delta / stderr),
                )),
                None => outcome,
            })
        }
        CheckSpec::ReferenceValue {
            subject,
            reference,
            stderr,
            sigma,
        } => {
            let value = ctx.value(subject)?;
            let cited = ctx.reference(reference)?;
            let stderr = stderr.or(cited.uncertainty).ok_or_else(|| {
                check_error(
                    "stderr_missing",
                    format!("no stderr given and `{reference}` cites no uncertainty"),
                )
            })?;
            if !(stderr > 0.0 && *sigma > 0.0) {
                return Err(check_error(
                    "sigma_band",
                    "sigma and stderr must be explicit and positive",
                ));
            }
            let deviation = (value - cited.value).abs() / stderr;
            let rounded = ctx.policy.round(deviation);
            Ok(CheckOutcome::decide(
                deviation <= *sigma,
                format!(
                    "{subject} = {value} vs {reference} = {} ({rounded} sigma, limit {sigma})",
                    cited.value
                ),
            )
            .with_interval(ConfidenceInterval::around(value, sigma * stderr, rounded))
            .with_intermediate("sigma", rounded))
        }
        CheckSpec::Arithmetic {
            expr,
            expected,
            tolerance,
        } => {
            let band = exact_band(*tolerance, ctx.policy)?;
            let computed = expr.evaluate(&ctx.operands())?;
            let delta = (computed - expected).abs();
            Ok(CheckOutcome::decide(
                delta <= band,
                format!("{expr} = {computed}, expected {expected}"),
            )
            .with_intermediate("value", computed))
        }
    }
}
