use std::error::Error;
use std::path::PathBuf;

use clap::Args;

use super::read_report;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Module report to summarize.
    #[arg(long)]
    pub report: PathBuf,
    /// Also list every consistency issue.
    #[arg(long)]
    pub issues: bool,
}

pub fn run(args: &StatusArgs) -> Result<(), Box<dyn Error>> {
    let report = read_report(&args.report)?;
    let status = serde_json::to_string_pretty(&report.ssot_status)?;
    println!("{}", report.module_id);
    println!("{status}");
    if args.issues {
        for issue in &report.consistency_issues {
            println!(
                "{:?}\t{:?}\t{}\t{}",
                issue.severity, issue.kind, issue.subject, issue.detail
            );
        }
    }
    Ok(())
}
