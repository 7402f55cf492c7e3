//! Ordered execution of a module's self-validation checks.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use ssot_cert::OperandSource;
use ssot_core::errors::{ErrorInfo, SsotError};
use ssot_core::formula::validate_identifier;
use ssot_core::{
    AuditPolicy, FormulaRegistry, ParameterRegistry, Quantity, ReferenceTable, ReferenceValue,
    Registry, RegistryEntry,
};
use tracing::{debug, warn};

use crate::check::{CheckOutcome, SelfValidationCheck};
use crate::report::SelfValidationReport;

/// Signature of a check function. Checks only see shared references.
pub type CheckFn =
    dyn Fn(&CheckContext<'_>) -> Result<CheckOutcome, SsotError> + Send + Sync + 'static;

/// A named check registered by a module.
#[derive(Clone)]
pub struct SelfCheck {
    name: String,
    subjects: Vec<String>,
    func: Arc<CheckFn>,
}

impl SelfCheck {
    /// Wraps a check function.
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&CheckContext<'_>) -> Result<CheckOutcome, SsotError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            subjects: Vec::new(),
            func: Arc::new(func),
        }
    }

    /// Declares the quantities or certificates the check covers.
    pub fn covering<I, S>(mut self, subjects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subjects = subjects.into_iter().map(Into::into).collect();
        self
    }

    /// Check name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Covered subjects.
    pub fn subjects(&self) -> &[String] {
        &self.subjects
    }
}

impl fmt::Debug for SelfCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelfCheck")
            .field("name", &self.name)
            .field("subjects", &self.subjects)
            .finish_non_exhaustive()
    }
}

impl RegistryEntry for SelfCheck {
    const KIND: &'static str = "self_validation";

    fn key(&self) -> &str {
        &self.name
    }

    fn validate(&self) -> Result<(), SsotError> {
        validate_identifier("check", &self.name)
    }
}

/// Registry of self-validation checks, executed in insertion order.
pub type CheckRegistry = Registry<SelfCheck>;

/// Read-only view handed to every check function.
#[derive(Debug, Clone, Copy)]
pub struct CheckContext<'a> {
    /// Frozen parameter registry.
    pub parameters: &'a ParameterRegistry,
    /// Frozen formula registry.
    pub formulas: &'a FormulaRegistry,
    /// Preloaded reference constants.
    pub references: &'a ReferenceTable,
    /// Tolerance policy.
    pub policy: &'a AuditPolicy,
    intermediates: &'a BTreeMap<String, f64>,
}

impl<'a> CheckContext<'a> {
    /// Looks up a parameter.
    pub fn quantity(&self, name: &str) -> Result<&'a Quantity, SsotError> {
        self.parameters.get(name)
    }

    /// Computed value of a parameter.
    pub fn value(&self, name: &str) -> Result<f64, SsotError> {
        self.quantity(name)?.value.ok_or_else(|| {
            SsotError::missing_operand(name, format!("parameter `{name}` carries no value"))
        })
    }

    /// Looks up a reference constant.
    pub fn reference(&self, key: &str) -> Result<&'a ReferenceValue, SsotError> {
        self.references.get(key)
    }

    /// Value cached by an earlier check, addressed as `<check>.<key>`.
    pub fn intermediate(&self, key: &str) -> Result<f64, SsotError> {
        self.intermediates
            .get(key)
            .copied()
            .ok_or_else(|| SsotError::not_found("intermediates", key))
    }

    /// Operand resolver over the same registries, for expression checks.
    pub fn operands(&self) -> OperandSource<'a> {
        OperandSource::new(self.parameters, self.references)
    }
}

/// Runs checks sequentially against frozen registries.
#[derive(Debug, Clone, Copy)]
pub struct SelfValidationRunner<'a> {
    parameters: &'a ParameterRegistry,
    formulas: &'a FormulaRegistry,
    references: &'a ReferenceTable,
    policy: &'a AuditPolicy,
}

impl<'a> SelfValidationRunner<'a> {
    /// Creates a runner over the provided registries.
    pub fn new(
        parameters: &'a ParameterRegistry,
        formulas: &'a FormulaRegistry,
        references: &'a ReferenceTable,
        policy: &'a AuditPolicy,
    ) -> Self {
        Self {
            parameters,
            formulas,
            references,
            policy,
        }
    }

    /// Executes every check in insertion order.
    ///
    /// A check that errors or panics is recorded as failed and the run
    /// continues with the next check.
    pub fn run(&self, checks: &CheckRegistry) -> SelfValidationReport {
        let mut intermediates = BTreeMap::new();
        let mut records = Vec::with_capacity(checks.len());
        for check in checks.list() {
            let ctx = CheckContext {
                parameters: self.parameters,
                formulas: self.formulas,
                references: self.references,
                policy: self.policy,
                intermediates: &intermediates,
            };
            let result = catch_unwind(AssertUnwindSafe(|| (check.func)(&ctx)));
            let record = match result {
                Ok(Ok(outcome)) => {
                    debug!(check = %check.name, passed = outcome.passed, "self-validation check");
                    SelfValidationCheck {
                        name: check.name.clone(),
                        passed: outcome.passed,
                        confidence_interval: outcome.confidence_interval,
                        message: outcome.message,
                        subjects: check.subjects.clone(),
                        intermediates: outcome.intermediates,
                        errored: false,
                    }
                }
                Ok(Err(err)) => {
                    warn!(check = %check.name, error = %err, "self-validation check errored");
                    errored_record(check, format!("{}: {}", err.family(), err.info()))
                }
                Err(payload) => {
                    let text = panic_text(payload.as_ref());
                    warn!(check = %check.name, panic = %text, "self-validation check panicked");
                    errored_record(check, format!("panic: {text}"))
                }
            };
            for (key, value) in &record.intermediates {
                intermediates.insert(format!("{}.{}", record.name, key), *value);
            }
            records.push(record);
        }
        SelfValidationReport::new(records)
    }
}

fn errored_record(check: &SelfCheck, message: String) -> SelfValidationCheck {
    SelfValidationCheck {
        name: check.name.clone(),
        passed: false,
        confidence_interval: None,
        message,
        subjects: check.subjects.clone(),
        intermediates: BTreeMap::new(),
        errored: true,
    }
}

fn panic_text(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Builds a check error with the runner's error code convention.
pub fn check_error(code: &str, message: impl Into<String>) -> SsotError {
    SsotError::InvalidPredicate(ErrorInfo::new(format!("check.{code}"), message))
}
