//! Read/write dataset JSON files.
//!
//! Schema (`domain::DatasetFile`):
//!
//! ```json
//! { "x": [[1.0, 2.0], [0.5, -1.0]], "y": [3.0, 4.0], "beta": [0.0, 0.0] }
//! ```
//!
//! Only shape is checked here; length and dimension agreement is enforced by
//! the estimator so the error taxonomy stays in one place.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::domain::DatasetFile;
use crate::error::AppError;

pub fn read_dataset_json(path: &Path) -> Result<DatasetFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open dataset '{}': {e}", path.display())))?;
    let dataset: DatasetFile = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| AppError::new(3, format!("Invalid dataset JSON '{}': {e}", path.display())))?;
    if dataset.y.is_empty() {
        return Err(AppError::new(3, format!("Dataset '{}' has no samples.", path.display())));
    }
    Ok(dataset)
}

pub fn write_dataset_json(path: &Path, dataset: &DatasetFile) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create dataset '{}': {e}", path.display())))?;
    serde_json::to_writer(file, dataset)
        .map_err(|e| AppError::new(2, format!("Failed to write dataset JSON: {e}")))?;
    Ok(())
}
