use std::path::Path;

use thiserror::Error;

pub mod classify;
pub mod config;
pub mod requirements;
pub mod scenario;
pub mod text_processing;

pub use classify::{LineClass, LineClassifier, RuleKind};
pub use config::{DEFAULT_REQUIREMENT_PREFIX, ParserConfig, ParserConfigBuilder};
pub use requirements::extract_requirement_ids;
pub use scenario::{ScenarioParser, parse_lines};
// Re-export domain types from core (canonical definitions live there)
pub use tracematrix_core::{
    BackendError, DocumentText, ExtractionResult, RequirementId, RequirementSet, TestCaseRecord,
    TextBackend,
};

#[derive(Error, Debug)]
pub enum ParsingError {
    #[error("backend error: {0}")]
    Backend(#[from] tracematrix_core::BackendError),
}

/// Parse test cases out of already-extracted document text.
///
/// Pages without text are skipped; the remaining pages are split into
/// trimmed, non-empty lines and fed through a fresh [`ScenarioParser`].
pub fn parse_document(doc: &DocumentText, config: &ParserConfig) -> ExtractionResult {
    let doc = text_processing::normalize_document(doc);
    let stats = doc.stats();
    let records = parse_lines(doc.lines(), config);
    ExtractionResult { records, stats }
}

/// Collect the master requirement set from already-extracted document text.
pub fn requirements_from_document(doc: &DocumentText, config: &ParserConfig) -> RequirementSet {
    let doc = text_processing::normalize_document(doc);
    RequirementSet {
        ids: extract_requirement_ids(doc.lines(), config),
        stats: doc.stats(),
    }
}

/// Extract test cases from a protocol using the given backend for text extraction.
///
/// Pipeline:
/// 1. Extract per-page text via `backend`
/// 2. Expand ligatures, split pages into trimmed lines, drop blank lines
/// 3. Classify each line and fold it through the scenario state machine
/// 4. Flush the last open test case
pub fn extract_test_cases(
    path: &Path,
    backend: &dyn TextBackend,
    config: &ParserConfig,
) -> Result<ExtractionResult, ParsingError> {
    let doc = backend.extract_pages(path)?;
    let result = parse_document(&doc, config);
    tracing::info!(
        path = %path.display(),
        pages = result.stats.pages,
        empty_pages = result.stats.empty_pages,
        records = result.records.len(),
        "extracted test cases"
    );
    Ok(result)
}

/// Extract the master requirement set from a requirements document.
pub fn extract_requirements(
    path: &Path,
    backend: &dyn TextBackend,
    config: &ParserConfig,
) -> Result<RequirementSet, ParsingError> {
    let doc = backend.extract_pages(path)?;
    let set = requirements_from_document(&doc, config);
    tracing::info!(
        path = %path.display(),
        pages = set.stats.pages,
        requirements = set.ids.len(),
        "extracted requirement ids"
    );
    Ok(set)
}
