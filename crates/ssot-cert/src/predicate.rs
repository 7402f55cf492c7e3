//! Claim predicates and the operands they reference.

use std::fmt;

use serde::{Deserialize, Serialize};
use ssot_core::errors::SsotError;
use ssot_core::{ParameterRegistry, ReferenceTable};

/// Leaf value referenced by a claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operand {
    /// Inline number.
    Literal(f64),
    /// Computed value of a registered parameter.
    Quantity(String),
    /// Entry of the preloaded reference table.
    Reference(String),
}

impl Operand {
    /// Name of the referenced parameter, if any.
    pub fn quantity_name(&self) -> Option<&str> {
        match self {
            Operand::Quantity(name) => Some(name),
            Operand::Literal(_) | Operand::Reference(_) => None,
        }
    }

    /// Whether the operand cites the reference table.
    pub fn is_reference(&self) -> bool {
        matches!(self, Operand::Reference(_))
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Literal(value) => write!(f, "{value}"),
            Operand::Quantity(name) => write!(f, "{name}"),
            Operand::Reference(key) => write!(f, "ref({key})"),
        }
    }
}

/// Closed arithmetic expression over operands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    /// Leaf operand.
    Operand(Operand),
    /// Sum of all terms.
    Sum(Vec<Expr>),
    /// Product of all factors.
    Product(Vec<Expr>),
    /// `lhs - rhs`.
    Difference(Box<Expr>, Box<Expr>),
    /// `numerator / denominator`.
    Ratio(Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Shorthand for a literal leaf.
    pub fn lit(value: f64) -> Self {
        Expr::Operand(Operand::Literal(value))
    }

    /// Shorthand for a parameter leaf.
    pub fn quantity(name: impl Into<String>) -> Self {
        Expr::Operand(Operand::Quantity(name.into()))
    }

    /// Shorthand for a reference leaf.
    pub fn reference(key: impl Into<String>) -> Self {
        Expr::Operand(Operand::Reference(key.into()))
    }

    /// Sum of literal terms, e.g. `240 + 8 + 40`.
    pub fn sum_of(terms: &[f64]) -> Self {
        Expr::Sum(terms.iter().copied().map(Expr::lit).collect())
    }

    /// Evaluates the expression against the frozen registries.
    ///
    /// Every intermediate result must stay finite; overflow and NaN are
    /// reported as [`SsotError::InvalidPredicate`].
    pub fn evaluate(&self, source: &OperandSource<'_>) -> Result<f64, SsotError> {
        let value = match self {
            Expr::Operand(operand) => source.resolve(operand)?,
            Expr::Sum(terms) => {
                non_empty(terms, "sum")?;
                terms
                    .iter()
                    .try_fold(0.0, |acc, term| -> Result<f64, SsotError> {
                        Ok(acc + term.evaluate(source)?)
                    })?
            }
            Expr::Product(factors) => {
                non_empty(factors, "product")?;
                factors
                    .iter()
                    .try_fold(1.0, |acc, factor| -> Result<f64, SsotError> {
                        Ok(acc * factor.evaluate(source)?)
                    })?
            }
            Expr::Difference(lhs, rhs) => lhs.evaluate(source)? - rhs.evaluate(source)?,
            Expr::Ratio(numerator, denominator) => {
                let denominator_value = denominator.evaluate(source)?;
                if denominator_value == 0.0 {
                    return Err(SsotError::invalid_predicate(
                        "cert.division_by_zero",
                        format!("denominator `{denominator}` evaluates to zero"),
                    ));
                }
                numerator.evaluate(source)? / denominator_value
            }
        };
        if !value.is_finite() {
            return Err(SsotError::invalid_predicate(
                "cert.non_finite",
                format!("`{self}` evaluates to {value}"),
            ));
        }
        Ok(value)
    }

    /// Appends every inline literal of the expression.
    pub fn collect_literals(&self, out: &mut Vec<f64>) {
        match self {
            Expr::Operand(Operand::Literal(value)) => out.push(*value),
            Expr::Operand(_) => {}
            Expr::Sum(terms) | Expr::Product(terms) => {
                for term in terms {
                    term.collect_literals(out);
                }
            }
            Expr::Difference(lhs, rhs) | Expr::Ratio(lhs, rhs) => {
                lhs.collect_literals(out);
                rhs.collect_literals(out);
            }
        }
    }

    /// Appends every parameter name referenced by the expression.
    pub fn collect_quantities<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Operand(operand) => out.extend(operand.quantity_name()),
            Expr::Sum(terms) | Expr::Product(terms) => {
                for term in terms {
                    term.collect_quantities(out);
                }
            }
            Expr::Difference(lhs, rhs) | Expr::Ratio(lhs, rhs) => {
                lhs.collect_quantities(out);
                rhs.collect_quantities(out);
            }
        }
    }
}

fn non_empty(items: &[Expr], kind: &str) -> Result<(), SsotError> {
    if items.is_empty() {
        return Err(SsotError::invalid_predicate(
            "cert.empty_expression",
            format!("{kind} has no terms"),
        ));
    }
    Ok(())
}

fn join<'a>(
    f: &mut fmt::Formatter<'_>,
    items: impl IntoIterator<Item = &'a Expr>,
    sep: &str,
) -> fmt::Result {
    for (idx, item) in items.into_iter().enumerate() {
        if idx > 0 {
            write!(f, " {sep} ")?;
        }
        match item {
            Expr::Operand(_) => write!(f, "{item}")?,
            _ => write!(f, "({item})")?,
        }
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Operand(operand) => write!(f, "{operand}"),
            Expr::Sum(terms) => join(f, terms, "+"),
            Expr::Product(factors) => join(f, factors, "*"),
            Expr::Difference(lhs, rhs) => join(f, [&**lhs, &**rhs], "-"),
            Expr::Ratio(lhs, rhs) => join(f, [&**lhs, &**rhs], "/"),
        }
    }
}

/// A claim whose truth the engine recomputes on every evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
    /// `|lhs - rhs| <= tolerance`.
    Equality {
        /// Left-hand operand.
        lhs: Operand,
        /// Right-hand operand.
        rhs: Operand,
        /// Explicit band; the policy epsilon applies when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tolerance: Option<f64>,
    },
    /// `expr == stated` within tolerance.
    Arithmetic {
        /// Expression recomputed by the engine.
        expr: Expr,
        /// Result the module states for the expression.
        stated: f64,
        /// Explicit band; the policy epsilon applies when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tolerance: Option<f64>,
    },
    /// `|subject - reference| <= sigma * stderr`.
    SigmaBound {
        /// Value under test.
        subject: Operand,
        /// Externally cited value.
        reference: Operand,
        /// Standard error; defaults to the cited reference uncertainty.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stderr: Option<f64>,
        /// Accepted number of standard errors.
        sigma: f64,
    },
}

impl Predicate {
    /// Parameter names the claim depends on, in declaration order.
    pub fn quantity_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        match self {
            Predicate::Equality { lhs, rhs, .. } => {
                names.extend(lhs.quantity_name());
                names.extend(rhs.quantity_name());
            }
            Predicate::Arithmetic { expr, .. } => expr.collect_quantities(&mut names),
            Predicate::SigmaBound {
                subject, reference, ..
            } => {
                names.extend(subject.quantity_name());
                names.extend(reference.quantity_name());
            }
        }
        names
    }

    /// Parameter names the claim compares against an external constant.
    pub fn externally_compared(&self) -> Vec<&str> {
        match self {
            Predicate::Equality { lhs, rhs, .. } => {
                let mut names = Vec::new();
                if rhs.is_reference() {
                    names.extend(lhs.quantity_name());
                }
                if lhs.is_reference() {
                    names.extend(rhs.quantity_name());
                }
                names
            }
            Predicate::SigmaBound { subject, .. } => subject.quantity_name().into_iter().collect(),
            Predicate::Arithmetic { .. } => Vec::new(),
        }
    }

    /// Every number written into the claim itself, labelled by field.
    pub fn inline_numbers(&self) -> Vec<(&'static str, f64)> {
        let mut numbers = Vec::new();
        let literal = |operand: &Operand| match operand {
            Operand::Literal(value) => Some(("literal", *value)),
            Operand::Quantity(_) | Operand::Reference(_) => None,
        };
        match self {
            Predicate::Equality {
                lhs,
                rhs,
                tolerance,
            } => {
                numbers.extend(literal(lhs));
                numbers.extend(literal(rhs));
                numbers.extend(tolerance.map(|value| ("tolerance", value)));
            }
            Predicate::Arithmetic {
                expr,
                stated,
                tolerance,
            } => {
                let mut literals = Vec::new();
                expr.collect_literals(&mut literals);
                numbers.extend(literals.into_iter().map(|value| ("literal", value)));
                numbers.push(("stated", *stated));
                numbers.extend(tolerance.map(|value| ("tolerance", value)));
            }
            Predicate::SigmaBound {
                subject,
                reference,
                stderr,
                sigma,
            } => {
                numbers.extend(literal(subject));
                numbers.extend(literal(reference));
                numbers.extend(stderr.map(|value| ("stderr", value)));
                numbers.push(("sigma", *sigma));
            }
        }
        numbers
    }

    /// Whether the claim is a closed arithmetic identity.
    pub fn is_arithmetic(&self) -> bool {
        matches!(self, Predicate::Arithmetic { .. })
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Equality { lhs, rhs, .. } => write!(f, "{lhs} == {rhs}"),
            Predicate::Arithmetic { expr, stated, .. } => write!(f, "{expr} == {stated}"),
            Predicate::SigmaBound {
                subject,
                reference,
                sigma,
                ..
            } => write!(f, "|{subject} - {reference}| <= {sigma} sigma"),
        }
    }
}

/// Read-only view used to resolve operands.
#[derive(Debug, Clone, Copy)]
pub struct OperandSource<'a> {
    /// Frozen parameter registry of the module.
    pub parameters: &'a ParameterRegistry,
    /// Preloaded reference constants.
    pub references: &'a ReferenceTable,
}

impl<'a> OperandSource<'a> {
    /// Creates a resolver over the provided registries.
    pub fn new(parameters: &'a ParameterRegistry, references: &'a ReferenceTable) -> Self {
        Self {
            parameters,
            references,
        }
    }

    /// Resolves an operand to a number.
    pub fn resolve(&self, operand: &Operand) -> Result<f64, SsotError> {
        match operand {
            Operand::Literal(value) => Ok(*value),
            Operand::Quantity(name) => {
                let quantity = self.parameters.get(name).map_err(|_| {
                    SsotError::missing_operand(name, format!("parameter `{name}` is not registered"))
                })?;
                quantity.value.ok_or_else(|| {
                    SsotError::missing_operand(name, format!("parameter `{name}` carries no value"))
                })
            }
            Operand::Reference(key) => self
                .references
                .get(key)
                .map(|reference| reference.value)
                .map_err(|_| {
                    SsotError::missing_operand(key, format!("reference `{key}` is not loaded"))
                }),
        }
    }

    /// Standard uncertainty published for a reference operand.
    pub fn reference_uncertainty(&self, operand: &Operand) -> Option<f64> {
        match operand {
            Operand::Reference(key) => self.references.get(key).ok()?.uncertainty,
            Operand::Literal(_) | Operand::Quantity(_) => None,
        }
    }
}
