//! The contract every simulation module satisfies, and its frozen snapshot.

use ssot_cert::{Certificate, CertificateRegistry};
use ssot_core::errors::SsotError;
use ssot_core::{Formula, FormulaRegistry, ParameterRegistry, Quantity};
use ssot_validate::{CheckRegistry, SelfCheck, SelfValidationReport};

/// Contract implemented by every audited module.
///
/// The sequences are produced lazily; [`ModuleSnapshot::build`] drains them
/// once into the module's own registries.
pub trait SsotModule: Send + Sync {
    /// Stable module identifier.
    fn module_id(&self) -> &str;

    /// Formulas registered by the module.
    fn formulas(&self) -> Box<dyn Iterator<Item = Formula> + '_>;

    /// Parameters declared by the module.
    fn parameters(&self) -> Box<dyn Iterator<Item = Quantity> + '_>;

    /// Certificates issued by the module.
    fn certificates(&self) -> Box<dyn Iterator<Item = Certificate> + '_>;

    /// Self-validation checks in execution order.
    fn self_validation_checks(&self) -> Box<dyn Iterator<Item = SelfCheck> + '_>;

    /// Citation strings backing the module.
    fn references(&self) -> Vec<String>;

    /// Self-validation report the module published previously, if any.
    fn published_validation(&self) -> Option<SelfValidationReport> {
        None
    }
}

/// Frozen, read-only state of one module.
#[derive(Debug, Clone)]
pub struct ModuleSnapshot {
    module_id: String,
    formulas: FormulaRegistry,
    parameters: ParameterRegistry,
    certificates: CertificateRegistry,
    checks: CheckRegistry,
    references: Vec<String>,
    published_validation: Option<SelfValidationReport>,
}

impl ModuleSnapshot {
    /// Registers everything the module declares and freezes the registries.
    ///
    /// Duplicate or malformed entries abort the build.
    pub fn build(module: &dyn SsotModule) -> Result<Self, SsotError> {
        let mut formulas = FormulaRegistry::new();
        for formula in module.formulas() {
            formulas.register(formula)?;
        }
        let mut parameters = ParameterRegistry::new();
        for quantity in module.parameters() {
            parameters.register(quantity)?;
        }
        let mut certificates = CertificateRegistry::new();
        for certificate in module.certificates() {
            certificates.register(certificate)?;
        }
        let mut checks = CheckRegistry::new();
        for check in module.self_validation_checks() {
            checks.register(check)?;
        }
        formulas.freeze();
        parameters.freeze();
        certificates.freeze();
        checks.freeze();
        Ok(Self {
            module_id: module.module_id().to_string(),
            formulas,
            parameters,
            certificates,
            checks,
            references: module.references(),
            published_validation: module.published_validation(),
        })
    }

    /// Module identifier.
    pub fn module_id(&self) -> &str {
        &self.module_id
    }

    /// Frozen formula registry.
    pub fn formulas(&self) -> &FormulaRegistry {
        &self.formulas
    }

    /// Frozen parameter registry.
    pub fn parameters(&self) -> &ParameterRegistry {
        &self.parameters
    }

    /// Frozen certificate registry.
    pub fn certificates(&self) -> &CertificateRegistry {
        &self.certificates
    }

    /// Frozen check registry.
    pub fn checks(&self) -> &CheckRegistry {
        &self.checks
    }

    /// Citation strings.
    pub fn references(&self) -> &[String] {
        &self.references
    }

    /// Previously published self-validation report.
    pub fn published_validation(&self) -> Option<&SelfValidationReport> {
        self.published_validation.as_ref()
    }
}
