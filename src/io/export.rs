//! Export run records to JSON.

use std::fs::File;
use std::path::Path;

use crate::domain::RunRecord;
use crate::error::AppError;

pub fn write_run_json(path: &Path, record: &RunRecord) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, record)
        .map_err(|e| AppError::new(2, format!("Failed to write export JSON: {e}")))?;
    Ok(())
}

pub fn read_run_json(path: &Path) -> Result<RunRecord, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open run record '{}': {e}", path.display())))?;
    serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid run record JSON: {e}")))
}
