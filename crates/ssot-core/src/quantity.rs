//! Named physical values carrying provenance metadata.

use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, SsotError};

/// Provenance category attached to every [`Quantity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuantityCategory {
    /// Experimentally measured value; always carries an expected value.
    Measured,
    /// Value derived from other quantities by the module.
    Derived,
    /// Value fixed by geometric construction.
    Geometric,
    /// Axiomatic input of the framework.
    Foundational,
    /// Forward prediction awaiting external comparison.
    Predicted,
}

impl QuantityCategory {
    /// Whether quantities of this category must cite an expected value.
    pub fn requires_expected(self) -> bool {
        match self {
            QuantityCategory::Measured => true,
            QuantityCategory::Derived
            | QuantityCategory::Geometric
            | QuantityCategory::Foundational
            | QuantityCategory::Predicted => false,
        }
    }

    /// Whether a claimed numeric outcome obliges the quantity to carry a computed value.
    pub fn requires_value_when_claimed(self) -> bool {
        match self {
            QuantityCategory::Derived | QuantityCategory::Predicted => true,
            QuantityCategory::Measured
            | QuantityCategory::Geometric
            | QuantityCategory::Foundational => false,
        }
    }
}

/// Acceptance band attached to a quantity or a claim.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Tolerance {
    /// `|observed - expected| <= value`.
    Absolute {
        /// Half-width of the accepted band.
        value: f64,
    },
    /// `|observed - expected| <= sigma * stderr`.
    Sigma {
        /// Number of standard errors accepted.
        sigma: f64,
        /// Standard error of the comparison.
        stderr: f64,
    },
}

impl Tolerance {
    /// Half-width of the accepted band.
    pub fn band(&self) -> f64 {
        match *self {
            Tolerance::Absolute { value } => value,
            Tolerance::Sigma { sigma, stderr } => sigma * stderr,
        }
    }

    /// Standard error used to express deviations in sigma units, when known.
    pub fn stderr(&self) -> Option<f64> {
        match *self {
            Tolerance::Absolute { .. } => None,
            Tolerance::Sigma { stderr, .. } => Some(stderr),
        }
    }

    fn validate(&self) -> Result<(), SsotError> {
        let parts: &[(&str, f64)] = match self {
            Tolerance::Absolute { value } => &[("value", *value)][..],
            Tolerance::Sigma { sigma, stderr } => &[("sigma", *sigma), ("stderr", *stderr)][..],
        };
        for (field, number) in parts {
            if !number.is_finite() || *number <= 0.0 {
                return Err(SsotError::InvalidEntry(
                    ErrorInfo::new(
                        "quantity.tolerance",
                        "tolerance components must be positive and finite",
                    )
                    .with_context("field", *field)
                    .with_context("value", number.to_string()),
                ));
            }
        }
        Ok(())
    }
}

/// A single named physical value with provenance metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    /// Dotted name, e.g. `geometry.k_gimel`.
    pub name: String,
    /// Provenance category.
    pub category: QuantityCategory,
    /// Value computed or adopted by the module.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    /// External reference value; absent means "no external reference".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<f64>,
    /// Acceptance band for comparisons against `expected`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tolerance: Option<Tolerance>,
    /// Deviation (in sigma) the module publishes for this quantity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stated_deviation: Option<f64>,
    /// Whether the module asserts a numeric outcome for this quantity.
    #[serde(default)]
    pub claims_numeric_outcome: bool,
    /// Optional unit label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Human readable description.
    #[serde(default)]
    pub description: String,
}

impl Quantity {
    /// Creates a quantity without numeric content.
    pub fn new(
        name: impl Into<String>,
        category: QuantityCategory,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            category,
            value: None,
            expected: None,
            tolerance: None,
            stated_deviation: None,
            claims_numeric_outcome: false,
            unit: None,
            description: description.into(),
        }
    }

    /// Sets the computed value.
    pub fn with_value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    /// Sets the external expected value.
    pub fn with_expected(mut self, expected: f64) -> Self {
        self.expected = Some(expected);
        self
    }

    /// Sets the acceptance band.
    pub fn with_tolerance(mut self, tolerance: Tolerance) -> Self {
        self.tolerance = Some(tolerance);
        self
    }

    /// Records the deviation the module publishes for this quantity.
    pub fn with_stated_deviation(mut self, deviation: f64) -> Self {
        self.stated_deviation = Some(deviation);
        self
    }

    /// Marks the quantity as carrying a claimed numeric outcome.
    pub fn claiming_outcome(mut self) -> Self {
        self.claims_numeric_outcome = true;
        self
    }

    /// Sets the unit label.
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Absolute difference between value and expected value, when both exist.
    pub fn abs_deviation(&self) -> Option<f64> {
        match (self.value, self.expected) {
            (Some(value), Some(expected)) => Some((value - expected).abs()),
            _ => None,
        }
    }

    /// Deviation expressed in standard errors, when the tolerance is sigma based.
    pub fn sigma_deviation(&self) -> Option<f64> {
        let stderr = self.tolerance.as_ref().and_then(Tolerance::stderr)?;
        self.abs_deviation().map(|delta| delta / stderr)
    }

    /// Checks structural validity: name syntax, finite numbers, positive tolerances.
    ///
    /// Category rules (MEASURED without expected, DERIVED without value) are
    /// data-quality findings and are left to the consistency checker.
    pub fn validate(&self) -> Result<(), SsotError> {
        validate_dotted_name(&self.name)?;
        let numbers = [
            ("value", self.value),
            ("expected", self.expected),
            ("stated_deviation", self.stated_deviation),
        ];
        for (field, number) in numbers {
            if let Some(number) = number {
                if !number.is_finite() {
                    return Err(SsotError::InvalidEntry(
                        ErrorInfo::new("quantity.non_finite", "numeric fields must be finite")
                            .with_context("name", self.name.clone())
                            .with_context("field", field),
                    ));
                }
            }
        }
        if let Some(tolerance) = &self.tolerance {
            tolerance.validate().map_err(|err| match err {
                SsotError::InvalidEntry(info) => {
                    SsotError::InvalidEntry(info.with_context("name", self.name.clone()))
                }
                other => other,
            })?;
        }
        Ok(())
    }
}

/// Validates a dotted quantity name such as `geometry.k_gimel`.
pub fn validate_dotted_name(name: &str) -> Result<(), SsotError> {
    let well_formed = !name.is_empty()
        && name.split('.').all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
        });
    if well_formed {
        Ok(())
    } else {
        Err(SsotError::InvalidEntry(
            ErrorInfo::new("quantity.name", "quantity names are dotted [A-Za-z0-9_] segments")
                .with_context("name", name)
                .with_hint("use names like `geometry.k_gimel`"),
        ))
    }
}
