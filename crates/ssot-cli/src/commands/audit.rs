use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Args;
use serde::Serialize;
use ssot_audit::{
    audit_modules, AuditOpts, BatchEntry, CancelToken, IssueCounts, ModuleManifest,
    ModuleOutcome, SsotModule, Verdict,
};
use ssot_core::{to_canonical_json_bytes, AuditPolicy, ReferenceTable};
use tracing::{info, warn};

#[derive(Args, Debug)]
pub struct AuditArgs {
    /// Module manifest (YAML or JSON); repeat for several modules.
    #[arg(long = "manifest", value_name = "PATH", required = true)]
    pub manifests: Vec<PathBuf>,
    /// Reference constants table.
    #[arg(long)]
    pub references: PathBuf,
    /// Optional tolerance policy overriding the defaults.
    #[arg(long)]
    pub policy: Option<PathBuf>,
    /// Output directory for reports.
    #[arg(long, default_value = "ssot-reports")]
    pub out: PathBuf,
    /// Number of modules audited in parallel.
    #[arg(long)]
    pub jobs: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
enum SummaryOutcome {
    Completed {
        verdict: Verdict,
        issue_counts: IssueCounts,
        report_hash: String,
    },
    Cancelled,
    Failed {
        code: String,
        error: String,
    },
}

#[derive(Debug, Serialize)]
struct SummaryEntry {
    module_id: String,
    #[serde(flatten)]
    outcome: SummaryOutcome,
}

#[derive(Debug, Serialize)]
struct AuditSummary {
    modules: Vec<SummaryEntry>,
    needs_review: usize,
}

pub fn run(args: &AuditArgs) -> Result<ExitCode, Box<dyn Error>> {
    let references = ReferenceTable::load(&args.references)?;
    let policy = match &args.policy {
        Some(path) => AuditPolicy::load(path)?,
        None => AuditPolicy::default(),
    };
    let modules = args
        .manifests
        .iter()
        .map(|path| {
            ModuleManifest::load(path).map(|manifest| Box::new(manifest) as Box<dyn SsotModule>)
        })
        .collect::<Result<Vec<_>, _>>()?;
    let opts = match args.jobs {
        Some(concurrency) => AuditOpts { concurrency },
        None => AuditOpts::default(),
    };
    info!(modules = modules.len(), jobs = opts.concurrency, "starting audit");

    let entries = audit_modules(&modules, &references, &policy, &opts, &CancelToken::new())?;
    fs::create_dir_all(&args.out)?;
    let summary = write_reports(&args.out, entries)?;
    fs::write(
        args.out.join("summary.json"),
        to_canonical_json_bytes(&summary)?,
    )?;

    info!(
        modules = summary.modules.len(),
        needs_review = summary.needs_review,
        out = %args.out.display(),
        "audit finished"
    );
    if summary.needs_review > 0 {
        return Ok(ExitCode::from(1));
    }
    Ok(ExitCode::SUCCESS)
}

fn write_reports(out: &Path, entries: Vec<BatchEntry>) -> Result<AuditSummary, Box<dyn Error>> {
    let mut modules = Vec::with_capacity(entries.len());
    let mut needs_review = 0;
    for entry in entries {
        let outcome = match entry.outcome {
            ModuleOutcome::Completed(report) => {
                let path = out.join(format!("{}.report.json", report.module_id));
                fs::write(&path, report.to_bytes()?)?;
                let status = report.ssot_status;
                if status.verdict.needs_review() {
                    needs_review += 1;
                    warn!(module = %entry.module_id, "module needs review");
                }
                SummaryOutcome::Completed {
                    verdict: status.verdict,
                    issue_counts: status.issue_counts,
                    report_hash: report.report_hash,
                }
            }
            ModuleOutcome::Cancelled => SummaryOutcome::Cancelled,
            ModuleOutcome::Failed(err) => {
                needs_review += 1;
                SummaryOutcome::Failed {
                    code: err.info().code.clone(),
                    error: err.to_string(),
                }
            }
        };
        modules.push(SummaryEntry {
            module_id: entry.module_id,
            outcome,
        });
    }
    Ok(AuditSummary {
        modules,
        needs_review,
    })
}
