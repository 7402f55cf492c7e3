#![allow(dead_code)]

use std::path::PathBuf;

use ssot_audit::SsotModule;
use ssot_cert::{Certificate, Expr, Operand, Predicate};
use ssot_core::{
    Formula, FormulaCategory, Quantity, QuantityCategory, ReferenceTable, ReferenceValue,
    Tolerance,
};
use ssot_validate::{CheckSpec, DeclaredCheck, SelfCheck, SelfValidationReport};

pub fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .canonicalize()
        .unwrap()
}

pub fn fixture(relative: &str) -> PathBuf {
    workspace_root().join("fixtures").join(relative)
}

/// In-memory module whose pieces tests assemble by hand.
#[derive(Debug, Clone, Default)]
pub struct TestModule {
    pub id: String,
    pub formulas: Vec<Formula>,
    pub parameters: Vec<Quantity>,
    pub certificates: Vec<Certificate>,
    pub checks: Vec<SelfCheck>,
    pub references: Vec<String>,
    pub published: Option<SelfValidationReport>,
}

impl TestModule {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            ..Self::default()
        }
    }

    pub fn formula(mut self, formula: Formula) -> Self {
        self.formulas.push(formula);
        self
    }

    pub fn parameter(mut self, quantity: Quantity) -> Self {
        self.parameters.push(quantity);
        self
    }

    pub fn certificate(mut self, certificate: Certificate) -> Self {
        self.certificates.push(certificate);
        self
    }

    pub fn check(mut self, check: SelfCheck) -> Self {
        self.checks.push(check);
        self
    }

    pub fn cite(mut self, citation: &str) -> Self {
        self.references.push(citation.to_string());
        self
    }

    pub fn published(mut self, report: SelfValidationReport) -> Self {
        self.published = Some(report);
        self
    }
}

impl SsotModule for TestModule {
    fn module_id(&self) -> &str {
        &self.id
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
        Box::new(self.checks.iter().cloned())
    }

    fn references(&self) -> Vec<String> {
        self.references.clone()
    }

    fn published_validation(&self) -> Option<SelfValidationReport> {
        self.published.clone()
    }
}

pub fn references() -> ReferenceTable {
    let mut table = ReferenceTable::new();
    table
        .insert(
            "codata.alpha_inv",
            ReferenceValue::exact(137.035999139, "CODATA 2014").with_uncertainty(3.1e-8),
        )
        .unwrap();
    table
        .insert(
            "ratio.reference",
            ReferenceValue::exact(1.0, "lattice estimate").with_uncertainty(0.5),
        )
        .unwrap();
    table
}

pub fn alpha_certificate() -> Certificate {
    Certificate::new(
        "alpha_matches_codata",
        Predicate::Equality {
            lhs: Operand::Quantity("alpha.inv".into()),
            rhs: Operand::Reference("codata.alpha_inv".into()),
            tolerance: Some(1e-9),
        },
    )
    .with_description("alpha^-1 within 1e-9 of CODATA")
}

pub fn root_count_certificate(expr: Expr) -> Certificate {
    Certificate::new(
        "root_count",
        Predicate::Arithmetic {
            expr,
            stated: 288.0,
            tolerance: None,
        },
    )
    .with_description("240 + 8 + 40 = 288")
}

/// Module with every subsystem present and nothing to report.
pub fn healthy_module(id: &str) -> TestModule {
    TestModule::new(id)
        .cite("CODATA 2014")
        .formula(Formula::new(
            "alpha_inverse",
            FormulaCategory::Derived,
            4,
            "alpha^-1 from the lattice volume",
        ))
        .parameter(
            Quantity::new("alpha.inv", QuantityCategory::Derived, "inverse fine structure")
                .with_value(137.035999139)
                .with_expected(137.035999139)
                .claiming_outcome(),
        )
        .parameter(
            Quantity::new("masses.w", QuantityCategory::Measured, "W mass")
                .with_value(80.37)
                .with_expected(80.379)
                .with_tolerance(Tolerance::Sigma {
                    sigma: 2.0,
                    stderr: 0.012,
                })
                .with_unit("GeV"),
        )
        .certificate(alpha_certificate())
        .certificate(root_count_certificate(Expr::sum_of(&[240.0, 8.0, 40.0])))
        .check(
            DeclaredCheck {
                name: "w_mass_expected".into(),
                spec: CheckSpec::ExpectedValue {
                    subject: "masses.w".into(),
                },
                covers: Vec::new(),
            }
            .into_check(),
        )
        .check(
            DeclaredCheck {
                name: "alpha_vs_codata".into(),
                spec: CheckSpec::ReferenceValue {
                    subject: "alpha.inv".into(),
                    reference: "codata.alpha_inv".into(),
                    stderr: None,
                    sigma: 3.0,
                },
                covers: vec!["alpha_matches_codata".into()],
            }
            .into_check(),
        )
}
