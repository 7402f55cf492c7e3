use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Interval reported by a self-validation check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    /// Lower edge of the interval.
    pub lower: f64,
    /// Upper edge of the interval.
    pub upper: f64,
    /// Deviation of the checked value from its target, in standard errors.
    pub sigma: f64,
}

impl ConfidenceInterval {
    /// Symmetric interval of `half_width` around `center`.
    pub fn around(center: f64, half_width: f64, sigma: f64) -> Self {
        Self {
            lower: center - half_width,
            upper: center + half_width,
            sigma,
        }
    }
}

/// Value returned by a check function.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CheckOutcome {
    /// Whether the check succeeded.
    pub passed: bool,
    /// Optional interval describing the comparison.
    pub confidence_interval: Option<ConfidenceInterval>,
    /// Human readable explanation.
    pub message: String,
    /// Named values later checks may read.
    pub intermediates: BTreeMap<String, f64>,
}

impl CheckOutcome {
    /// Passing outcome.
    pub fn pass(message: impl Into<String>) -> Self {
        Self {
            passed: true,
            message: message.into(),
            ..Self::default()
        }
    }

    /// Failing outcome.
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            passed: false,
            message: message.into(),
            ..Self::default()
        }
    }

    /// Outcome decided by `passed`.
    pub fn decide(passed: bool, message: impl Into<String>) -> Self {
        if passed {
            Self::pass(message)
        } else {
            Self::fail(message)
        }
    }

    /// Attaches a confidence interval.
    pub fn with_interval(mut self, interval: ConfidenceInterval) -> Self {
        self.confidence_interval = Some(interval);
        self
    }

    /// Caches a named value for later checks.
    pub fn with_intermediate(mut self, key: impl Into<String>, value: f64) -> Self {
        self.intermediates.insert(key.into(), value);
        self
    }
}

/// Recorded result of one self-validation check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelfValidationCheck {
    /// Check name, unique within a module.
    pub name: String,
    /// Whether the check passed.
    pub passed: bool,
    /// Optional interval describing the comparison.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_interval: Option<ConfidenceInterval>,
    /// Human readable explanation, or the error that aborted the check.
    #[serde(default)]
    pub message: String,
    /// Quantity names or certificate ids the check covers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subjects: Vec<String>,
    /// Values cached for later checks.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub intermediates: BTreeMap<String, f64>,
    /// Whether the check function itself errored or panicked.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub errored: bool,
}

impl SelfValidationCheck {
    /// Builds a plain record, as found in published reports.
    pub fn new(name: impl Into<String>, passed: bool) -> Self {
        Self {
            name: name.into(),
            passed,
            confidence_interval: None,
            message: String::new(),
            subjects: Vec::new(),
            intermediates: BTreeMap::new(),
            errored: false,
        }
    }

    /// Attaches the covered subjects.
    pub fn with_subjects<I, S>(mut self, subjects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subjects = subjects.into_iter().map(Into::into).collect();
        self
    }

    /// Attaches a confidence interval.
    pub fn with_interval(mut self, interval: ConfidenceInterval) -> Self {
        self.confidence_interval = Some(interval);
        self
    }

    /// Sigma deviation computed by the check, if it produced an interval.
    pub fn sigma(&self) -> Option<f64> {
        self.confidence_interval.map(|interval| interval.sigma)
    }
}
