//! Recomputing certificate engine.

use ssot_core::errors::{ErrorInfo, SsotError};
use ssot_core::{AuditPolicy, ParameterRegistry, ReferenceTable};
use tracing::{debug, warn};

use crate::certificate::{CertStatus, Certificate, CertificateEvaluation, CertificateRegistry};
use crate::predicate::{OperandSource, Predicate};

struct Comparison {
    computed: f64,
    stated: f64,
    band: f64,
    deviation_sigma: Option<f64>,
}

impl Comparison {
    /// Rejects any quantity that would not survive a JSON round trip.
    fn finite(self) -> Result<Self, SsotError> {
        let fields = [
            ("computed", Some(self.computed)),
            ("stated", Some(self.stated)),
            ("band", Some(self.band)),
            ("difference", Some(self.computed - self.stated)),
            ("deviation_sigma", self.deviation_sigma),
        ];
        for (field, value) in fields {
            if let Some(value) = value.filter(|value| !value.is_finite()) {
                return Err(SsotError::InvalidPredicate(
                    ErrorInfo::new("cert.non_finite", format!("{field} is not finite"))
                        .with_context(field, value.to_string()),
                ));
            }
        }
        Ok(self)
    }
}

/// Evaluates certificates against a frozen parameter registry.
#[derive(Debug, Clone, Copy)]
pub struct CertificateEngine<'a> {
    source: OperandSource<'a>,
    policy: &'a AuditPolicy,
}

impl<'a> CertificateEngine<'a> {
    /// Creates an engine over the provided registries.
    pub fn new(
        parameters: &'a ParameterRegistry,
        references: &'a ReferenceTable,
        policy: &'a AuditPolicy,
    ) -> Self {
        Self {
            source: OperandSource::new(parameters, references),
            policy,
        }
    }

    /// Recomputes the claim of a certificate.
    ///
    /// Missing operands and malformed predicates yield [`CertStatus::Unverified`];
    /// they never fall back to `Pass`.
    pub fn evaluate(&self, certificate: &Certificate) -> CertificateEvaluation {
        match self.compare(&certificate.claim) {
            Ok(comparison) => {
                let difference = (comparison.computed - comparison.stated).abs();
                let status = if difference <= comparison.band {
                    CertStatus::Pass
                } else {
                    CertStatus::Fail
                };
                debug!(
                    certificate = %certificate.id,
                    ?status,
                    difference,
                    band = comparison.band,
                    "certificate evaluated"
                );
                CertificateEvaluation {
                    certificate_id: certificate.id.clone(),
                    status,
                    computed_value: Some(comparison.computed),
                    stated_value: Some(comparison.stated),
                    difference: Some(self.policy.round(difference)),
                    band: Some(comparison.band),
                    deviation_sigma: comparison.deviation_sigma.map(|d| self.policy.round(d)),
                    detail: None,
                }
            }
            Err(err) => {
                warn!(certificate = %certificate.id, error = %err, "certificate unverified");
                CertificateEvaluation::unverified(&certificate.id, &err)
            }
        }
    }

    /// Evaluates every certificate of a registry in insertion order.
    pub fn evaluate_all(&self, certificates: &CertificateRegistry) -> Vec<CertificateEvaluation> {
        certificates.list().map(|cert| self.evaluate(cert)).collect()
    }

    fn compare(&self, claim: &Predicate) -> Result<Comparison, SsotError> {
        self.raw_comparison(claim)?.finite()
    }

    fn raw_comparison(&self, claim: &Predicate) -> Result<Comparison, SsotError> {
        match claim {
            Predicate::Equality {
                lhs,
                rhs,
                tolerance,
            } => Ok(Comparison {
                computed: self.source.resolve(lhs)?,
                stated: self.source.resolve(rhs)?,
                band: self.exact_band(*tolerance)?,
                deviation_sigma: None,
            }),
            Predicate::Arithmetic {
                expr,
                stated,
                tolerance,
            } => Ok(Comparison {
                computed: expr.evaluate(&self.source)?,
                stated: *stated,
                band: self.exact_band(*tolerance)?,
                deviation_sigma: None,
            }),
            Predicate::SigmaBound {
                subject,
                reference,
                stderr,
                sigma,
            } => {
                let computed = self.source.resolve(subject)?;
                let stated = self.source.resolve(reference)?;
                let stderr = stderr
                    .or_else(|| self.source.reference_uncertainty(reference))
                    .ok_or_else(|| {
                        SsotError::InvalidPredicate(
                            ErrorInfo::new(
                                "cert.stderr_missing",
                                "sigma-bound claims need an explicit stderr or a cited uncertainty",
                            )
                            .with_context("reference", reference.to_string()),
                        )
                    })?;
                positive("sigma", *sigma)?;
                positive("stderr", stderr)?;
                Ok(Comparison {
                    computed,
                    stated,
                    band: sigma * stderr,
                    deviation_sigma: Some((computed - stated).abs() / stderr),
                })
            }
        }
    }

    fn exact_band(&self, tolerance: Option<f64>) -> Result<f64, SsotError> {
        exact_band(tolerance, self.policy)
    }
}

/// Half-width of an exact comparison: the explicit tolerance, or the policy epsilon.
pub fn exact_band(tolerance: Option<f64>, policy: &AuditPolicy) -> Result<f64, SsotError> {
    match tolerance {
        Some(band) if band.is_finite() && band >= 0.0 => Ok(band),
        Some(band) => Err(SsotError::InvalidPredicate(
            ErrorInfo::new("cert.tolerance", "tolerance must be finite and non-negative")
                .with_context("tolerance", band.to_string()),
        )),
        None => Ok(policy.default_epsilon),
    }
}

fn positive(field: &str, value: f64) -> Result<(), SsotError> {
    if value.is_finite() && value > 0.0 {
        return Ok(());
    }
    Err(SsotError::InvalidPredicate(
        ErrorInfo::new(
            "cert.sigma_band",
            format!("{field} must be explicit and positive"),
        )
        .with_context(field, value.to_string())
        .with_hint("a zero-width statistical band is never implied"),
    ))
}

/// Evaluates a single certificate; see [`CertificateEngine::evaluate`].
pub fn evaluate(
    certificate: &Certificate,
    parameters: &ParameterRegistry,
    references: &ReferenceTable,
    policy: &AuditPolicy,
) -> CertificateEvaluation {
    CertificateEngine::new(parameters, references, policy).evaluate(certificate)
}
