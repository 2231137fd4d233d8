// retail-dwh-core/src/application/report.rs

use std::path::{Path, PathBuf};
use tracing::info;

use crate::application::pipeline::BatchReport;
use crate::error::EtlError;
use crate::infrastructure::fs::write_json;

pub const REPORT_DIR: &str = "batches";

/// Writes `<target_dir>/batches/<batch_id>.json` and returns its path.
pub fn write_report(target_dir: &Path, report: &BatchReport) -> Result<PathBuf, EtlError> {
    let path = target_dir
        .join(REPORT_DIR)
        .join(format!("{}.json", report.batch.batch_id));
    write_json(&path, report)?;
    info!(path = %path.display(), "Run report written");
    Ok(path)
}
