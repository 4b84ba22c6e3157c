use std::path::Path;

use thiserror::Error;

use crate::DocumentText;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("failed to open document: {0}")]
    OpenError(String),
    #[error("failed to extract text: {0}")]
    ExtractionError(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for document text extraction backends.
///
/// Implementors linearize each page into text in reading order; the
/// scenario parser and requirement scanner in `tracematrix_parsing` only
/// ever see the resulting lines.
pub trait TextBackend: Send + Sync {
    /// Extract the text of every page, in document order.
    ///
    /// Pages that carry no text are reported as `None` rather than skipped,
    /// so page counts stay meaningful.
    fn extract_pages(&self, path: &Path) -> Result<DocumentText, BackendError>;
}

/// Backend for documents that were already converted to text.
///
/// Pages are separated by form feeds (`\x0c`), which is what `pdftotext`
/// and most text dumps emit between pages.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextBackend;

impl PlainTextBackend {
    pub fn new() -> Self {
        Self
    }

    /// Split already-loaded text into pages.
    pub fn split_pages(text: &str) -> DocumentText {
        let pages = text
            .split('\x0c')
            .map(|page| {
                if page.trim().is_empty() {
                    None
                } else {
                    Some(page.to_string())
                }
            })
            .collect();
        DocumentText { pages }
    }
}

impl TextBackend for PlainTextBackend {
    fn extract_pages(&self, path: &Path) -> Result<DocumentText, BackendError> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::split_pages(&text))
    }
}
