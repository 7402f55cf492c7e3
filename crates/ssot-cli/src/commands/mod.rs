pub mod audit;
pub mod status;
pub mod verify;

use std::error::Error;
use std::fs;
use std::path::Path;

use ssot_audit::ModuleReport;

pub(crate) fn read_report(path: &Path) -> Result<ModuleReport, Box<dyn Error>> {
    let bytes = fs::read(path)?;
    Ok(ModuleReport::from_bytes(&bytes)?)
}
