use once_cell::sync::Lazy;
use regex::Regex;

use tracematrix_core::DocumentText;

/// Expand common typographic ligatures found in PDFs.
pub fn expand_ligatures(text: &str) -> String {
    text.replace('\u{FB00}', "ff")
        .replace('\u{FB01}', "fi")
        .replace('\u{FB02}', "fl")
        .replace('\u{FB03}', "ffi")
        .replace('\u{FB04}', "ffl")
        .replace(['\u{FB05}', '\u{FB06}'], "st")
}

/// Apply [`expand_ligatures`] to every page, keeping empty pages as `None`.
pub fn normalize_document(doc: &DocumentText) -> DocumentText {
    DocumentText {
        pages: doc
            .pages
            .iter()
            .map(|page| page.as_deref().map(expand_ligatures))
            .collect(),
    }
}

/// Collapse runs of whitespace to a single space and trim.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove a dangling `Trace` word (optionally followed by `:`, `.` or dashes)
/// from the end of scenario text.
///
/// Protocols that put the `Trace:` label on the same visual line as the end
/// of the scenario leave this behind once the ids themselves are captured.
pub fn strip_trailing_trace_artifact(text: &str) -> String {
    static RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?i)\bTrace\b[\s:.\-–—]*$").unwrap());

    RE.replace(text, "").trim().to_string()
}
