use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::SsotError;
use crate::serde::load_document;

/// Tolerance policy shared by the certificate engine, runner and checker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditPolicy {
    /// Band applied to exact claims that carry no explicit tolerance.
    #[serde(default = "AuditPolicy::default_epsilon")]
    pub default_epsilon: f64,
    /// Absolute slack when comparing a stated deviation with a computed one.
    #[serde(default = "AuditPolicy::default_deviation_abs_tol")]
    pub deviation_abs_tol: f64,
    /// Relative slack when comparing a stated deviation with a computed one.
    #[serde(default = "AuditPolicy::default_deviation_rel_tol")]
    pub deviation_rel_tol: f64,
    /// Rounding granularity applied to reported metrics; zero disables rounding.
    #[serde(default)]
    pub rounding: f64,
    /// Escalate advisory findings to `NeedsReview`.
    #[serde(default)]
    pub strict: bool,
}

impl AuditPolicy {
    const fn default_epsilon() -> f64 {
        1e-9
    }

    const fn default_deviation_abs_tol() -> f64 {
        1e-9
    }

    const fn default_deviation_rel_tol() -> f64 {
        5e-2
    }

    /// Rounds the provided value according to the policy granularity.
    pub fn round(&self, value: f64) -> f64 {
        if self.rounding <= 0.0 {
            return value;
        }
        (value / self.rounding).round() * self.rounding
    }

    /// Whether a stated deviation disagrees with a computed one.
    pub fn deviations_disagree(&self, stated: f64, computed: f64) -> bool {
        let slack = self
            .deviation_abs_tol
            .max(self.deviation_rel_tol * computed.abs());
        (stated - computed).abs() > slack
    }

    /// Loads a policy file; missing fields fall back to defaults.
    pub fn load(path: &Path) -> Result<Self, SsotError> {
        load_document(path)
    }
}

impl Default for AuditPolicy {
    fn default() -> Self {
        Self {
            default_epsilon: Self::default_epsilon(),
            deviation_abs_tol: Self::default_deviation_abs_tol(),
            deviation_rel_tol: Self::default_deviation_rel_tol(),
            rounding: 0.0,
            strict: false,
        }
    }
}
