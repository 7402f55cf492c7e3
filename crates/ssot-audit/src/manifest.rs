use std::path::Path;

use serde::{Deserialize, Serialize};
use ssot_cert::Certificate;
use ssot_core::errors::{ErrorInfo, SsotError};
use ssot_core::formula::validate_identifier;
use ssot_core::{load_document, Formula, Quantity};
use ssot_validate::{DeclaredCheck, SelfCheck, SelfValidationReport};

use crate::module::SsotModule;

/// Declarative description of a module, loaded from YAML or JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleManifest {
    /// Stable module identifier.
    pub module_id: String,
    /// Citation strings backing the module.
    #[serde(default)]
    pub references: Vec<String>,
    /// Registered formulas.
    #[serde(default)]
    pub formulas: Vec<Formula>,
    /// Declared parameters.
    #[serde(default)]
    pub parameters: Vec<Quantity>,
    /// Issued certificates.
    #[serde(default)]
    pub certificates: Vec<Certificate>,
    /// Declarative self-validation checks in execution order.
    #[serde(default)]
    pub checks: Vec<DeclaredCheck>,
    /// Report the module published previously.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_validation: Option<SelfValidationReport>,
}

impl ModuleManifest {
    /// Loads a manifest, choosing the decoder from the file extension.
    pub fn load(path: &Path) -> Result<Self, SsotError> {
        let manifest: Self = load_document(path)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Rejects manifests whose identifier is missing or unusable as a file stem.
    pub fn validate(&self) -> Result<(), SsotError> {
        let id = self.module_id.as_str();
        if id.trim().is_empty() {
            return Err(SsotError::Serde(ErrorInfo::new(
                "manifest.module_id",
                "module manifest missing module_id",
            )));
        }
        let usable = validate_identifier("module", id).is_ok()
            && !id.contains(['/', '\\'])
            && !id.contains("..");
        if !usable {
            return Err(SsotError::Serde(
                ErrorInfo::new(
                    "manifest.module_id",
                    "module_id may not contain whitespace, path separators or `..`",
                )
                .with_context("module_id", id)
                .with_hint("module_id names the report file written for the module"),
            ));
        }
        Ok(())
    }
}

impl SsotModule for ModuleManifest {
    fn module_id(&self) -> &str {
        &self.module_id
    }

    fn formulas(&self) -> Box<dyn Iterator<Item = Formula> + '_> {
        Box::new(self.formulas.iter().cloned())
    }

    fn parameters(&self) -> Box<dyn Iterator<Item = Quantity> + '_> {
        Box::new(self.parameters.iter().cloned())
    }

    fn certificates(&self) -> Box<dyn Iterator<Item = Certificate> + '_> {
        Box::new(self.certificates.iter().cloned())
    }

    fn self_validation_checks(&self) -> Box<dyn Iterator<Item = SelfCheck> + '_> {
        Box::new(self.checks.iter().cloned().map(DeclaredCheck::into_check))
    }

    fn references(&self) -> Vec<String> {
        self.references.clone()
    }

    fn published_validation(&self) -> Option<SelfValidationReport> {
        self.published_validation.clone()
    }
}
