mod common;

use common::{healthy_module, references, TestModule};
use ssot_audit::{
    audit_module, audit_modules, AuditOpts, CancelToken, ModuleOutcome, SsotModule, Verdict,
};
use ssot_core::errors::SsotError;
use ssot_core::{AuditPolicy, Quantity, QuantityCategory};
use ssot_validate::{CheckOutcome, SelfCheck};

fn batch(count: usize) -> Vec<Box<dyn SsotModule>> {
    (0..count)
        .map(|idx| Box::new(healthy_module(&format!("module_{idx:02}"))) as Box<dyn SsotModule>)
        .collect()
}

#[test]
fn parallel_batches_keep_input_order() {
    let modules = batch(12);
    let entries = audit_modules(
        &modules,
        &references(),
        &AuditPolicy::default(),
        &AuditOpts { concurrency: 4 },
        &CancelToken::new(),
    )
    .unwrap();

    let ids: Vec<&str> = entries.iter().map(|entry| entry.module_id.as_str()).collect();
    let expected: Vec<String> = (0..12).map(|idx| format!("module_{idx:02}")).collect();
    assert_eq!(ids, expected);
    for entry in &entries {
        let report = entry.report().unwrap();
        assert_eq!(report.module_id, entry.module_id);
        assert_eq!(report.ssot_status.verdict, Verdict::AllGreen);
    }
}

#[test]
fn concurrency_does_not_change_reports() {
    let modules = batch(6);
    let refs = references();
    let policy = AuditPolicy::default();
    let serial = audit_modules(
        &modules,
        &refs,
        &policy,
        &AuditOpts { concurrency: 1 },
        &CancelToken::new(),
    )
    .unwrap();
    let parallel = audit_modules(
        &modules,
        &refs,
        &policy,
        &AuditOpts { concurrency: 3 },
        &CancelToken::new(),
    )
    .unwrap();
    assert_eq!(serial, parallel);
}

#[test]
fn malformed_module_fails_alone() {
    let broken = TestModule::new("broken")
        .parameter(Quantity::new("geometry.k", QuantityCategory::Geometric, "").with_value(1.0))
        .parameter(Quantity::new("geometry.k", QuantityCategory::Geometric, "").with_value(2.0));
    let modules: Vec<Box<dyn SsotModule>> = vec![
        Box::new(healthy_module("first")),
        Box::new(broken),
        Box::new(healthy_module("last")),
    ];
    let entries = audit_modules(
        &modules,
        &references(),
        &AuditPolicy::default(),
        &AuditOpts::default(),
        &CancelToken::new(),
    )
    .unwrap();

    assert!(entries[0].report().is_some());
    assert!(entries[2].report().is_some());
    match &entries[1].outcome {
        ModuleOutcome::Failed(SsotError::DuplicateKey(info)) => {
            assert_eq!(info.code, "registry.duplicate");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn cancelled_batches_produce_no_reports() {
    let token = CancelToken::new();
    token.cancel();
    let entries = audit_modules(
        &batch(3),
        &references(),
        &AuditPolicy::default(),
        &AuditOpts { concurrency: 2 },
        &token,
    )
    .unwrap();
    assert!(entries
        .iter()
        .all(|entry| entry.outcome == ModuleOutcome::Cancelled));
}

#[test]
fn cancellation_between_stages_discards_partial_results() {
    let token = CancelToken::new();
    let trigger = token.clone();
    let module = healthy_module("interrupted").check(SelfCheck::new("pull_the_plug", move |_| {
        trigger.cancel();
        Ok(CheckOutcome::pass("cancel requested"))
    }));

    let err = audit_module(&module, &references(), &AuditPolicy::default(), &token).unwrap_err();
    match err {
        SsotError::Cancelled(info) => {
            assert_eq!(info.context.get("stage").map(String::as_str), Some("consistency"));
            assert_eq!(info.context.get("module").map(String::as_str), Some("interrupted"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(token.is_cancelled());
}
