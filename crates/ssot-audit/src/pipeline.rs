//! Stage orchestration for one module and parallel batches of modules.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use rayon::prelude::*;
use ssot_cert::CertificateEngine;
use ssot_core::errors::{ErrorInfo, SsotError};
use ssot_core::{AuditPolicy, ReferenceTable};
use ssot_validate::SelfValidationRunner;
use tracing::{debug, info, warn};

use crate::consistency::{check_consistency, ConsistencyInput};
use crate::module::{ModuleSnapshot, SsotModule};
use crate::report::{CertificateRecord, ModuleReport, ReportProvenance};
use crate::status::summarize;

/// Coarse cancellation flag shared by every module of a batch.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Fresh, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation of every module not yet finished.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    fn checkpoint(&self, module_id: &str, stage: &str) -> Result<(), SsotError> {
        if !self.is_cancelled() {
            return Ok(());
        }
        Err(SsotError::Cancelled(
            ErrorInfo::new("audit.cancelled", "module audit cancelled")
                .with_context("module", module_id)
                .with_context("stage", stage),
        ))
    }
}

/// Options governing batch execution.
#[derive(Debug, Clone)]
pub struct AuditOpts {
    /// Number of modules audited in parallel.
    pub concurrency: usize,
}

impl Default for AuditOpts {
    fn default() -> Self {
        Self {
            concurrency: thread::available_parallelism().map_or(1, NonZeroUsize::get),
        }
    }
}

/// Result of auditing one module of a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum ModuleOutcome {
    /// The audit ran to completion.
    Completed(Box<ModuleReport>),
    /// The audit was cancelled; partial results were discarded.
    Cancelled,
    /// The module could not be built.
    Failed(SsotError),
}

/// One entry of a batch result, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchEntry {
    /// Identifier of the audited module.
    pub module_id: String,
    /// Outcome of the audit.
    pub outcome: ModuleOutcome,
}

impl BatchEntry {
    /// Completed report, if any.
    pub fn report(&self) -> Option<&ModuleReport> {
        match &self.outcome {
            ModuleOutcome::Completed(report) => Some(report),
            ModuleOutcome::Cancelled | ModuleOutcome::Failed(_) => None,
        }
    }
}

/// Runs every stage over an already frozen snapshot.
pub fn audit_snapshot(
    snapshot: &ModuleSnapshot,
    references: &ReferenceTable,
    policy: &AuditPolicy,
    cancel: &CancelToken,
) -> Result<ModuleReport, SsotError> {
    let module_id = snapshot.module_id();

    cancel.checkpoint(module_id, "certificates")?;
    let engine = CertificateEngine::new(snapshot.parameters(), references, policy);
    let evaluations = engine.evaluate_all(snapshot.certificates());
    debug!(module = module_id, certificates = evaluations.len(), "certificates evaluated");

    cancel.checkpoint(module_id, "self_validation")?;
    let runner = SelfValidationRunner::new(
        snapshot.parameters(),
        snapshot.formulas(),
        references,
        policy,
    );
    let validation = runner.run(snapshot.checks());
    debug!(
        module = module_id,
        checks = validation.checks().len(),
        passed = validation.passed_count(),
        "self-validation finished"
    );

    cancel.checkpoint(module_id, "consistency")?;
    let issues = check_consistency(&ConsistencyInput {
        snapshot,
        evaluations: &evaluations,
        validation: &validation,
        references,
        policy,
    });
    debug!(module = module_id, issues = issues.len(), "consistency checked");

    cancel.checkpoint(module_id, "report")?;
    let status = summarize(snapshot, &validation, &issues, policy);
    info!(
        module = module_id,
        verdict = ?status.verdict,
        critical = status.issue_counts.critical,
        high = status.issue_counts.high,
        "module audited"
    );

    let certificates = snapshot
        .certificates()
        .list()
        .cloned()
        .zip(evaluations)
        .map(|(certificate, evaluation)| CertificateRecord {
            certificate,
            evaluation,
        })
        .collect();
    ModuleReport::new(
        module_id.to_string(),
        status,
        snapshot.formulas().list().cloned().collect(),
        snapshot.parameters().list().cloned().collect(),
        certificates,
        validation,
        issues,
        ReportProvenance::capture(policy, references)?,
    )
}

/// Builds, freezes and audits a single module.
pub fn audit_module(
    module: &dyn SsotModule,
    references: &ReferenceTable,
    policy: &AuditPolicy,
    cancel: &CancelToken,
) -> Result<ModuleReport, SsotError> {
    cancel.checkpoint(module.module_id(), "build")?;
    let snapshot = ModuleSnapshot::build(module)?;
    debug!(
        module = snapshot.module_id(),
        formulas = snapshot.formulas().len(),
        parameters = snapshot.parameters().len(),
        "snapshot frozen"
    );
    audit_snapshot(&snapshot, references, policy, cancel)
}

/// Audits modules in parallel; entries come back in input order.
///
/// Every module is isolated: a build failure or cancellation only affects its
/// own entry.
pub fn audit_modules(
    modules: &[Box<dyn SsotModule>],
    references: &ReferenceTable,
    policy: &AuditPolicy,
    opts: &AuditOpts,
    cancel: &CancelToken,
) -> Result<Vec<BatchEntry>, SsotError> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(opts.concurrency.max(1))
        .build()
        .map_err(|err| {
            SsotError::Runtime(
                ErrorInfo::new("audit.thread_pool", err.to_string())
                    .with_context("concurrency", opts.concurrency.to_string()),
            )
        })?;

    let entries = pool.install(|| {
        modules
            .par_iter()
            .map(|module| {
                let module_id = module.module_id().to_string();
                let outcome = match audit_module(module.as_ref(), references, policy, cancel) {
                    Ok(report) => ModuleOutcome::Completed(Box::new(report)),
                    Err(SsotError::Cancelled(_)) => {
                        debug!(module = %module_id, "module audit cancelled");
                        ModuleOutcome::Cancelled
                    }
                    Err(err) => {
                        warn!(module = %module_id, error = %err, "module failed to build");
                        ModuleOutcome::Failed(err)
                    }
                };
                BatchEntry { module_id, outcome }
            })
            .collect::<Vec<_>>()
    });
    Ok(entries)
}
