use proptest::prelude::*;
use ssot_cert::{
    evaluate, CertStatus, Certificate, CertificateEngine, CertificateRegistry, Expr, Operand,
    Predicate,
};
use ssot_core::{
    AuditPolicy, ParameterRegistry, Quantity, QuantityCategory, ReferenceTable, ReferenceValue,
};

fn parameters() -> ParameterRegistry {
    ParameterRegistry::from_entries([
        Quantity::new("alpha.inv", QuantityCategory::Derived, "inverse fine structure")
            .with_value(137.035999139)
            .claiming_outcome(),
        Quantity::new("roots.total", QuantityCategory::Geometric, "root count").with_value(308.0),
        Quantity::new("masses.proton_ratio", QuantityCategory::Predicted, "m_p / m_e")
            .with_value(1836.2),
        Quantity::new("geometry.empty", QuantityCategory::Derived, "no value yet"),
    ])
    .expect("parameters")
}

fn references() -> ReferenceTable {
    ReferenceTable::new()
        .with(
            "codata.alpha_inv",
            ReferenceValue::exact(137.035999139, "CODATA 2014").with_uncertainty(3.1e-8),
        )
        .and_then(|table| {
            table.with(
                "codata.proton_electron_ratio",
                ReferenceValue::exact(1836.15267343, "CODATA 2018").with_uncertainty(1.1e-7),
            )
        })
        .expect("references")
}

#[test]
fn codata_equality_within_epsilon_passes() {
    let params = parameters();
    let refs = references();
    let policy = AuditPolicy::default();
    let cert = Certificate::new(
        "alpha_matches_codata",
        Predicate::Equality {
            lhs: Operand::Quantity("alpha.inv".into()),
            rhs: Operand::Reference("codata.alpha_inv".into()),
            tolerance: Some(1e-9),
        },
    );
    let eval = evaluate(&cert, &params, &refs, &policy);
    assert_eq!(eval.status, CertStatus::Pass);
    assert!(eval.difference.expect("difference") <= 1e-9);
}

#[test]
fn truncated_literal_fails_the_same_band() {
    let params = parameters();
    let refs = references();
    let policy = AuditPolicy::default();
    let cert = Certificate::new(
        "alpha_matches_truncated",
        Predicate::Equality {
            lhs: Operand::Quantity("alpha.inv".into()),
            rhs: Operand::Literal(137.035999),
            tolerance: Some(1e-9),
        },
    );
    let eval = evaluate(&cert, &params, &refs, &policy);
    assert_eq!(eval.status, CertStatus::Fail);
}

#[test]
fn arithmetic_claim_is_recomputed() {
    let params = parameters();
    let refs = references();
    let policy = AuditPolicy::default();
    let engine = CertificateEngine::new(&params, &refs, &policy);

    let honest = Certificate::new(
        "sum_literal",
        Predicate::Arithmetic {
            expr: Expr::sum_of(&[240.0, 8.0, 40.0]),
            stated: 288.0,
            tolerance: None,
        },
    );
    assert_eq!(engine.evaluate(&honest).status, CertStatus::Pass);

    let malformed = Certificate::new(
        "roots_breakdown",
        Predicate::Arithmetic {
            expr: Expr::quantity("roots.total"),
            stated: 288.0,
            tolerance: None,
        },
    )
    .with_description("240 + 8 + 40 = 288");
    let eval = engine.evaluate(&malformed);
    assert_eq!(eval.status, CertStatus::Fail);
    assert_eq!(eval.computed_value, Some(308.0));
    assert_eq!(eval.stated_value, Some(288.0));
}

#[test]
fn missing_operand_is_unverified_not_pass() {
    let params = parameters();
    let refs = references();
    let policy = AuditPolicy::default();
    let engine = CertificateEngine::new(&params, &refs, &policy);
    for operand in ["geometry.absent", "geometry.empty"] {
        let cert = Certificate::new(
            "dangling",
            Predicate::Equality {
                lhs: Operand::Quantity(operand.into()),
                rhs: Operand::Literal(1.0),
                tolerance: None,
            },
        );
        let eval = engine.evaluate(&cert);
        assert_eq!(eval.status, CertStatus::Unverified);
        assert!(eval
            .detail
            .as_deref()
            .expect("detail")
            .starts_with("MissingOperand"));
    }
}

#[test]
fn sigma_bound_uses_cited_uncertainty() {
    let params = parameters();
    let refs = references();
    let policy = AuditPolicy::default();
    let cert = Certificate::new(
        "proton_ratio",
        Predicate::SigmaBound {
            subject: Operand::Quantity("masses.proton_ratio".into()),
            reference: Operand::Reference("codata.proton_electron_ratio".into()),
            stderr: Some(0.05),
            sigma: 3.0,
        },
    );
    let eval = evaluate(&cert, &params, &refs, &policy);
    assert_eq!(eval.status, CertStatus::Pass);
    let sigma = eval.deviation_sigma.expect("sigma");
    assert!((sigma - (1836.2 - 1836.15267343) / 0.05).abs() < 1e-9);
}

#[test]
fn zero_sigma_is_never_implied() {
    let params = parameters();
    let refs = references();
    let policy = AuditPolicy::default();
    let cert = Certificate::new(
        "exact_with_zero_sigma",
        Predicate::SigmaBound {
            subject: Operand::Quantity("alpha.inv".into()),
            reference: Operand::Literal(137.035999139),
            stderr: Some(0.0),
            sigma: 1.0,
        },
    );
    let eval = evaluate(&cert, &params, &refs, &policy);
    assert_eq!(eval.status, CertStatus::Unverified);

    let no_stderr = Certificate::new(
        "literal_without_stderr",
        Predicate::SigmaBound {
            subject: Operand::Quantity("alpha.inv".into()),
            reference: Operand::Literal(137.0),
            stderr: None,
            sigma: 1.0,
        },
    );
    assert_eq!(
        evaluate(&no_stderr, &params, &refs, &policy).status,
        CertStatus::Unverified
    );
}

#[test]
fn division_by_zero_is_unverified() {
    let params = parameters();
    let refs = references();
    let policy = AuditPolicy::default();
    let cert = Certificate::new(
        "ratio",
        Predicate::Arithmetic {
            expr: Expr::Ratio(Box::new(Expr::lit(1.0)), Box::new(Expr::lit(0.0))),
            stated: 1.0,
            tolerance: None,
        },
    );
    let eval = evaluate(&cert, &params, &refs, &policy);
    assert_eq!(eval.status, CertStatus::Unverified);
}

#[test]
fn overflowing_expression_is_unverified() {
    let params = parameters();
    let refs = references();
    let policy = AuditPolicy::default();
    let cert = Certificate::new(
        "huge",
        Predicate::Arithmetic {
            expr: Expr::Product(vec![Expr::lit(1e200), Expr::lit(1e200)]),
            stated: 1.0,
            tolerance: None,
        },
    );
    let eval = evaluate(&cert, &params, &refs, &policy);
    assert_eq!(eval.status, CertStatus::Unverified);
    assert!(eval.computed_value.is_none());
    assert!(eval.detail.expect("detail").starts_with("InvalidPredicate"));
}

#[test]
fn difference_beyond_f64_range_is_unverified() {
    let params = parameters();
    let refs = references();
    let policy = AuditPolicy::default();
    let cert = Certificate::new(
        "opposite_extremes",
        Predicate::Equality {
            lhs: Operand::Literal(f64::MAX),
            rhs: Operand::Literal(-f64::MAX),
            tolerance: None,
        },
    );
    let eval = evaluate(&cert, &params, &refs, &policy);
    assert_eq!(eval.status, CertStatus::Unverified);
}

#[test]
fn non_finite_numbers_are_rejected_at_registration() {
    let yaml = r#"
id: nan_claim
claim:
  kind: arithmetic
  expr: { operand: { literal: .nan } }
  stated: .inf
"#;
    let cert: Certificate = serde_yaml::from_str(yaml).expect("certificate");
    let err = CertificateRegistry::from_entries([cert]).unwrap_err();
    assert_eq!(err.info().code, "certificate.non_finite");
    assert_eq!(
        err.info().context.get("field").map(String::as_str),
        Some("literal")
    );

    let sigma = Certificate::new(
        "sigma_inf",
        Predicate::SigmaBound {
            subject: Operand::Quantity("alpha.inv".into()),
            reference: Operand::Reference("codata.alpha_inv".into()),
            stderr: None,
            sigma: f64::INFINITY,
        },
    );
    let err = CertificateRegistry::from_entries([sigma]).unwrap_err();
    assert_eq!(
        err.info().context.get("field").map(String::as_str),
        Some("sigma")
    );
}

#[test]
fn evaluate_all_follows_insertion_order() {
    let params = parameters();
    let refs = references();
    let policy = AuditPolicy::default();
    let registry = CertificateRegistry::from_entries(["c3", "c1", "c2"].into_iter().map(|id| {
        Certificate::new(
            id,
            Predicate::Equality {
                lhs: Operand::Literal(1.0),
                rhs: Operand::Literal(1.0),
                tolerance: None,
            },
        )
    }))
    .expect("registry");
    let evaluations = CertificateEngine::new(&params, &refs, &policy).evaluate_all(&registry);
    let ids: Vec<_> = evaluations
        .iter()
        .map(|eval| eval.certificate_id.as_str())
        .collect();
    assert_eq!(ids, ["c3", "c1", "c2"]);
}

#[test]
fn predicates_parse_from_yaml() {
    let yaml = r#"
kind: arithmetic
expr:
  sum:
    - operand: { literal: 240 }
    - operand: { literal: 8 }
    - operand: { quantity: geometry.extra }
stated: 288
"#;
    let predicate: Predicate = serde_yaml::from_str(yaml).expect("predicate");
    assert!(predicate.is_arithmetic());
    assert_eq!(predicate.quantity_names(), vec!["geometry.extra"]);
    assert_eq!(predicate.to_string(), "240 + 8 + geometry.extra == 288");
}

proptest! {
    #[test]
    fn pass_implies_claim_holds(lhs in -1.0e6f64..1.0e6, offset in -1.0f64..1.0, tol in 0.0f64..0.5) {
        let params = ParameterRegistry::new();
        let refs = ReferenceTable::new();
        let policy = AuditPolicy::default();
        let rhs = lhs + offset;
        let cert = Certificate::new(
            "prop",
            Predicate::Equality {
                lhs: Operand::Literal(lhs),
                rhs: Operand::Literal(rhs),
                tolerance: Some(tol),
            },
        );
        let eval = evaluate(&cert, &params, &refs, &policy);
        prop_assert_ne!(eval.status, CertStatus::Unverified);
        if eval.status == CertStatus::Pass {
            prop_assert!((lhs - rhs).abs() <= tol);
        } else {
            prop_assert!((lhs - rhs).abs() > tol);
        }
    }
}
