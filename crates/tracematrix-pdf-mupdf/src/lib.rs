use std::path::Path;

use mupdf::{Document, TextPageFlags};

use tracematrix_core::{BackendError, DocumentText, PageMargins, TextBackend};

/// MuPDF-based implementation of [`TextBackend`].
///
/// This crate is the sole AGPL island: it isolates the mupdf dependency so
/// that the parsing and reconciliation crates do not transitively depend on it.
///
/// Every page is returned, in order. A page whose text is blank (scanned
/// images, separator sheets) comes back as `None`.
///
/// Header and footer exclusion is off by default because protocol templates
/// often carry scenario ids in running headers. When enabled, blocks in the
/// top/bottom fraction of the page are dropped before linearization.
#[derive(Debug, Clone, Default)]
pub struct MupdfBackend {
    /// Fraction of page height from bottom to exclude as footer (0.0–1.0).
    footer_exclusion_ratio: Option<f32>,
    /// Fraction of page height from top to exclude as header (0.0–1.0).
    header_exclusion_ratio: Option<f32>,
}

impl MupdfBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend excluding the given header and footer bands.
    pub fn with_margins(margins: PageMargins) -> Self {
        Self::new()
            .with_header_exclusion(margins.header)
            .with_footer_exclusion(margins.footer)
    }

    pub fn header_exclusion(&self) -> Option<f32> {
        self.header_exclusion_ratio
    }

    pub fn footer_exclusion(&self) -> Option<f32> {
        self.footer_exclusion_ratio
    }

    /// Set the footer exclusion ratio. Pass `0.0` to disable.
    pub fn with_footer_exclusion(mut self, ratio: f32) -> Self {
        self.footer_exclusion_ratio = if ratio > 0.0 { Some(ratio) } else { None };
        self
    }

    /// Set the header exclusion ratio. Pass `0.0` to disable.
    pub fn with_header_exclusion(mut self, ratio: f32) -> Self {
        self.header_exclusion_ratio = if ratio > 0.0 { Some(ratio) } else { None };
        self
    }
}

impl TextBackend for MupdfBackend {
    fn extract_pages(&self, path: &Path) -> Result<DocumentText, BackendError> {
        let path_str = path
            .to_str()
            .ok_or_else(|| BackendError::OpenError("invalid path encoding".into()))?;

        let document =
            Document::open(path_str).map_err(|e| BackendError::OpenError(e.to_string()))?;

        let mut pages = Vec::new();

        for page_result in document
            .pages()
            .map_err(|e| BackendError::ExtractionError(e.to_string()))?
        {
            let page = page_result.map_err(|e| BackendError::ExtractionError(e.to_string()))?;
            let text_page = page
                .to_text_page(TextPageFlags::empty())
                .map_err(|e| BackendError::ExtractionError(e.to_string()))?;

            let page_bounds = page
                .bounds()
                .map_err(|e| BackendError::ExtractionError(e.to_string()))?;
            let page_height = page_bounds.y1 - page_bounds.y0;

            let header_threshold = self
                .header_exclusion_ratio
                .map(|r| page_bounds.y0 + page_height * r);
            let footer_threshold = self
                .footer_exclusion_ratio
                .map(|r| page_bounds.y1 - page_height * r);

            // Block/line iteration keeps reading order within each block
            let mut page_text = String::new();
            for block in text_page.blocks() {
                let block_bounds = block.bounds();

                if let Some(threshold) = header_threshold
                    && block_bounds.y1 <= threshold
                {
                    continue;
                }
                if let Some(threshold) = footer_threshold
                    && block_bounds.y0 >= threshold
                {
                    continue;
                }

                for line in block.lines() {
                    let line_text: String = line
                        .chars()
                        .map(|c| c.char().unwrap_or('\u{FFFD}'))
                        .collect();
                    page_text.push_str(&line_text);
                    page_text.push('\n');
                }
            }

            if page_text.trim().is_empty() {
                tracing::debug!(page = pages.len() + 1, "page has no extractable text");
                pages.push(None);
            } else {
                pages.push(Some(page_text));
            }
        }

        Ok(DocumentText { pages })
    }
}
