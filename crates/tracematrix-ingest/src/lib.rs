use std::path::Path;

use thiserror::Error;

use tracematrix_core::{PageMargins, PlainTextBackend, TextBackend};
use tracematrix_parsing::ParserConfig;

// Re-export domain types for convenience
pub use tracematrix_core::{ExtractionResult, RequirementSet, TestCaseRecord};

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("parsing error: {0}")]
    Parsing(#[from] tracematrix_parsing::ParsingError),
    #[error("text extraction error: {0}")]
    Backend(#[from] tracematrix_core::BackendError),
    #[error("file not found: {0}")]
    NotFound(String),
    #[cfg(not(feature = "pdf"))]
    #[error("PDF support not compiled in (enable the `pdf` feature of tracematrix-ingest)")]
    NoPdfSupport,
}

/// Kind of input document, decided by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    PlainText,
    Pdf,
}

impl DocumentKind {
    /// `.txt` / `.text` are plain text; anything else is treated as PDF.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "txt" | "text" => DocumentKind::PlainText,
            _ => DocumentKind::Pdf,
        }
    }
}

/// Pick the text backend for `path`.
///
/// Dispatches on file extension:
/// - `.txt`, `.text` → plain text, pages split on form feeds
/// - anything else → PDF (requires `pdf` feature / mupdf)
///
/// `margins` only applies to PDFs; plain text has no page geometry.
pub fn backend_for(
    path: &Path,
    margins: PageMargins,
) -> Result<Box<dyn TextBackend>, IngestError> {
    if !path.exists() {
        return Err(IngestError::NotFound(path.display().to_string()));
    }

    let kind = DocumentKind::from_path(path);
    tracing::debug!(path = %path.display(), ?kind, "selecting text backend");

    match kind {
        DocumentKind::PlainText => Ok(Box::new(PlainTextBackend::new())),
        DocumentKind::Pdf => pdf_backend(margins),
    }
}

#[cfg(feature = "pdf")]
fn mupdf_backend(margins: PageMargins) -> tracematrix_pdf_mupdf::MupdfBackend {
    tracematrix_pdf_mupdf::MupdfBackend::with_margins(margins)
}

#[cfg(feature = "pdf")]
fn pdf_backend(margins: PageMargins) -> Result<Box<dyn TextBackend>, IngestError> {
    Ok(Box::new(mupdf_backend(margins)))
}

#[cfg(not(feature = "pdf"))]
fn pdf_backend(_margins: PageMargins) -> Result<Box<dyn TextBackend>, IngestError> {
    Err(IngestError::NoPdfSupport)
}

/// Load a test protocol and parse its test cases.
pub fn extract_test_cases(
    path: &Path,
    config: &ParserConfig,
    margins: PageMargins,
) -> Result<ExtractionResult, IngestError> {
    let backend = backend_for(path, margins)?;
    Ok(tracematrix_parsing::extract_test_cases(
        path,
        backend.as_ref(),
        config,
    )?)
}

/// Load a requirements document and collect its requirement ids.
pub fn extract_requirements(
    path: &Path,
    config: &ParserConfig,
    margins: PageMargins,
) -> Result<RequirementSet, IngestError> {
    let backend = backend_for(path, margins)?;
    Ok(tracematrix_parsing::extract_requirements(
        path,
        backend.as_ref(),
        config,
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn text_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn kind_from_extension() {
        assert_eq!(
            DocumentKind::from_path(Path::new("protocol.TXT")),
            DocumentKind::PlainText
        );
        assert_eq!(
            DocumentKind::from_path(Path::new("dump.text")),
            DocumentKind::PlainText
        );
        assert_eq!(
            DocumentKind::from_path(Path::new("protocol.pdf")),
            DocumentKind::Pdf
        );
        assert_eq!(DocumentKind::from_path(Path::new("noext")), DocumentKind::Pdf);
    }

    #[test]
    fn missing_file_is_reported() {
        let err = extract_test_cases(
            Path::new("/no/such/protocol.pdf"),
            &ParserConfig::default(),
            PageMargins::default(),
        )
        .unwrap_err();
        assert!(matches!(err, IngestError::NotFound(_)));
    }

    #[test]
    fn text_backend_splits_pages() {
        let file = text_file("one\x0c\x0cthree");
        let backend = backend_for(file.path(), PageMargins::default()).unwrap();
        let doc = backend.extract_pages(file.path()).unwrap();
        assert_eq!(doc.pages.len(), 3);
        assert_eq!(doc.empty_pages(), 1);
    }

    #[test]
    fn margins_do_not_affect_plain_text() {
        let file = text_file("Scenario: Boot Id: TC-1\nRCM_SW-1\n");
        let margins = PageMargins {
            header: 0.5,
            footer: 0.4,
        };
        let result = extract_test_cases(file.path(), &ParserConfig::default(), margins).unwrap();
        assert_eq!(result.records.len(), 1);
    }

    #[cfg(feature = "pdf")]
    #[test]
    fn margins_reach_mupdf_backend() {
        let backend = mupdf_backend(PageMargins {
            header: 0.1,
            footer: 0.08,
        });
        assert_eq!(backend.header_exclusion(), Some(0.1));
        assert_eq!(backend.footer_exclusion(), Some(0.08));
    }

    #[test]
    fn plain_text_protocol_round_trip() {
        let file = text_file("Scenario: Boot Id: TC-1\nRCM_SW-1\n\x0cScenario: Halt\nRCM_SW-2\n");
        let result =
            extract_test_cases(file.path(), &ParserConfig::default(), PageMargins::default())
                .unwrap();
        assert_eq!(result.records.len(), 2);
        assert_eq!(result.records[1].scenario, "Halt");
        assert_eq!(result.stats.pages, 2);
    }

    #[test]
    fn plain_text_requirements() {
        let file = text_file("RCM_SW-3 shall\nRCM_SW-1 shall\x0cRCM_SW-3 again\n");
        let set =
            extract_requirements(file.path(), &ParserConfig::default(), PageMargins::default())
                .unwrap();
        let ids: Vec<&str> = set.ids.iter().map(|id| id.as_str()).collect();
        assert_eq!(ids, vec!["RCM_SW-1", "RCM_SW-3"]);
    }
}
