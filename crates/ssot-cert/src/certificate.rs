use serde::{Deserialize, Serialize};
use ssot_core::errors::{ErrorInfo, SsotError};
use ssot_core::formula::validate_identifier;
use ssot_core::{Registry, RegistryEntry};

use crate::predicate::Predicate;

/// Outcome of recomputing a certificate claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CertStatus {
    /// The recomputed claim holds within its band.
    Pass,
    /// The recomputed claim does not hold.
    Fail,
    /// The claim could not be evaluated.
    Unverified,
}

/// A claim about a numeric relationship. The status is never stored here;
/// it is produced by [`crate::engine::CertificateEngine::evaluate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Certificate {
    /// Registry identifier.
    pub id: String,
    /// Human readable description of the claim.
    #[serde(default)]
    pub description: String,
    /// Claim recomputed on every evaluation.
    pub claim: Predicate,
    /// Deviation (in sigma) the module publishes alongside the claim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stated_deviation: Option<f64>,
}

impl Certificate {
    /// Creates a certificate for the given claim.
    pub fn new(id: impl Into<String>, claim: Predicate) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            claim,
            stated_deviation: None,
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Records the deviation the module publishes for the claim.
    pub fn with_stated_deviation(mut self, deviation: f64) -> Self {
        self.stated_deviation = Some(deviation);
        self
    }
}

impl RegistryEntry for Certificate {
    const KIND: &'static str = "certificates";

    fn key(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<(), SsotError> {
        validate_identifier("certificate", &self.id)?;
        let mut numbers = self.claim.inline_numbers();
        numbers.extend(self.stated_deviation.map(|value| ("stated_deviation", value)));
        for (field, number) in numbers {
            if !number.is_finite() {
                return Err(SsotError::InvalidEntry(
                    ErrorInfo::new("certificate.non_finite", "numeric fields must be finite")
                        .with_context("id", self.id.clone())
                        .with_context("field", field),
                ));
            }
        }
        Ok(())
    }
}

/// Registry of certificates owned by a single module.
pub type CertificateRegistry = Registry<Certificate>;

/// Result returned by the engine for one certificate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificateEvaluation {
    /// Identifier of the evaluated certificate.
    pub certificate_id: String,
    /// Recomputed status.
    pub status: CertStatus,
    /// Value recomputed by the engine (left-hand side or expression result).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub computed_value: Option<f64>,
    /// Value the claim compares against (right-hand side or stated result).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stated_value: Option<f64>,
    /// Absolute difference between computed and stated values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difference: Option<f64>,
    /// Half-width of the accepted band.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub band: Option<f64>,
    /// Deviation in standard errors for statistical claims.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deviation_sigma: Option<f64>,
    /// Explanation for unverified certificates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl CertificateEvaluation {
    pub(crate) fn unverified(certificate_id: &str, err: &SsotError) -> Self {
        Self {
            certificate_id: certificate_id.to_string(),
            status: CertStatus::Unverified,
            computed_value: None,
            stated_value: None,
            difference: None,
            band: None,
            deviation_sigma: None,
            detail: Some(format!("{}: {}", err.family(), err.info().message)),
        }
    }
}
