//! Rendering of extracted test cases, requirement lists and traceability
//! matrices.

mod export;
mod types;

use thiserror::Error;

pub use export::{export_matrix, export_requirements, export_test_cases, write_export};
pub use types::ExportFormat;

#[derive(Error, Debug)]
pub enum ReportingError {
    #[error("failed to serialize JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to write export: {0}")]
    Io(#[from] std::io::Error),
}
