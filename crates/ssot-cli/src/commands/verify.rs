use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use tracing::info;

use super::read_report;

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Module report to verify.
    #[arg(long)]
    pub report: PathBuf,
}

pub fn run(args: &VerifyArgs) -> Result<(), Box<dyn Error>> {
    let report = read_report(&args.report)?;
    report.verify_hash()?;
    info!(module = %report.module_id, hash = %report.report_hash, "report hash verified");
    println!("{} {}", report.module_id, report.report_hash);
    Ok(())
}
