use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub mod backend;
pub mod config_file;
pub mod reconcile;

pub use backend::{BackendError, PlainTextBackend, TextBackend};
pub use reconcile::{TraceMapping, explode, reconcile};

/// A requirement identifier token such as `RCM_SW-1042`.
///
/// Equality is exact and case-sensitive; the only normalization applied is
/// trimming surrounding whitespace.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequirementId(String);

impl RequirementId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(id.as_ref().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequirementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RequirementId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RequirementId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A test case extracted from a test protocol.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCaseRecord {
    /// Whitespace-normalized scenario description.
    pub scenario: String,
    pub id: Option<String>,
    /// Requirement ids traced by this test case, in document order.
    /// Duplicates are preserved.
    pub trace: Vec<RequirementId>,
}

impl TestCaseRecord {
    /// True when the record carries no scenario text, no id and no trace.
    pub fn is_empty(&self) -> bool {
        self.scenario.is_empty() && self.id.is_none() && self.trace.is_empty()
    }
}

/// Coverage status of a requirement in the traceability matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageStatus {
    Tested,
    NotCovered,
}

impl CoverageStatus {
    /// Human-readable column label.
    pub fn label(&self) -> &'static str {
        match self {
            CoverageStatus::Tested => "Tested",
            CoverageStatus::NotCovered => "Not Covered",
        }
    }
}

impl fmt::Display for CoverageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for CoverageStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tested" => Ok(CoverageStatus::Tested),
            "not-covered" | "not_covered" | "notcovered" | "not covered" => {
                Ok(CoverageStatus::NotCovered)
            }
            other => Err(format!(
                "unknown status '{}' (expected 'tested' or 'not-covered')",
                other
            )),
        }
    }
}

/// One line of the traceability matrix.
///
/// Tested rows carry the scenario and id of the matching test case;
/// uncovered rows leave both empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceabilityRow {
    pub requirement: RequirementId,
    pub scenario: Option<String>,
    pub id: Option<String>,
    pub status: CoverageStatus,
}

/// Aggregate coverage counts over the master requirement set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageSummary {
    /// Number of distinct requirements in the master set.
    pub total: usize,
    /// Distinct master requirements with at least one tested row.
    pub covered: usize,
}

impl CoverageSummary {
    pub fn not_covered(&self) -> usize {
        self.total.saturating_sub(self.covered)
    }

    /// Coverage in percent. An empty master set yields `0.0`.
    pub fn coverage_pct(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.covered as f64 / self.total as f64 * 100.0
        }
    }
}

/// Result of reconciling a master requirement set against test cases.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraceabilityReport {
    pub rows: Vec<TraceabilityRow>,
    pub summary: CoverageSummary,
    /// Trace ids referenced by test cases but missing from the master set.
    /// They never produce rows.
    pub orphans: Vec<RequirementId>,
}

impl TraceabilityReport {
    /// Rows whose status is one of `statuses`, in matrix order.
    pub fn filter_status(&self, statuses: &[CoverageStatus]) -> Vec<&TraceabilityRow> {
        self.rows
            .iter()
            .filter(|row| statuses.contains(&row.status))
            .collect()
    }
}

/// Fractions of page height dropped from the top and bottom of every PDF
/// page before text extraction. `0.0` keeps the whole page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PageMargins {
    pub header: f32,
    pub footer: f32,
}

impl PageMargins {
    pub fn is_valid(&self) -> bool {
        (0.0..1.0).contains(&self.header)
            && (0.0..1.0).contains(&self.footer)
            && self.header + self.footer < 1.0
    }
}

/// Per-page text produced by a [`TextBackend`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentText {
    /// One entry per page; `None` when the page yielded no text.
    pub pages: Vec<Option<String>>,
}

impl DocumentText {
    pub fn from_pages<I, S>(pages: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        Self {
            pages: pages.into_iter().map(|p| p.map(Into::into)).collect(),
        }
    }

    pub fn empty_pages(&self) -> usize {
        self.pages.iter().filter(|p| p.is_none()).count()
    }

    /// Trimmed, non-empty lines across all pages in document order.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.pages
            .iter()
            .flatten()
            .flat_map(|page| page.lines())
            .map(str::trim)
            .filter(|line| !line.is_empty())
    }

    pub fn stats(&self) -> ExtractionStats {
        ExtractionStats {
            pages: self.pages.len(),
            empty_pages: self.empty_pages(),
            lines: self.lines().count(),
        }
    }
}

/// Counters gathered while linearizing a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionStats {
    pub pages: usize,
    /// Pages skipped because the backend found no text on them.
    pub empty_pages: usize,
    pub lines: usize,
}

/// Test cases extracted from one protocol document.
#[derive(Debug, Clone, Default)]
pub struct ExtractionResult {
    pub records: Vec<TestCaseRecord>,
    pub stats: ExtractionStats,
}

/// Master requirement ids extracted from one requirements document.
#[derive(Debug, Clone, Default)]
pub struct RequirementSet {
    /// Sorted, deduplicated ids.
    pub ids: Vec<RequirementId>,
    pub stats: ExtractionStats,
}

/// How a line starting with `Trace:` affects scenario text collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TraceLabelPolicy {
    /// The label is consumed and leaves scenario collection untouched.
    #[default]
    Marker,
    /// The label is consumed and ends scenario text collection.
    EndsScenario,
    /// The label is not recognized; the line is ordinary text.
    Continuation,
}

impl FromStr for TraceLabelPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "marker" => Ok(TraceLabelPolicy::Marker),
            "ends-scenario" | "ends_scenario" => Ok(TraceLabelPolicy::EndsScenario),
            "continuation" => Ok(TraceLabelPolicy::Continuation),
            other => Err(format!(
                "unknown trace label policy '{}' (expected marker, ends-scenario or continuation)",
                other
            )),
        }
    }
}

/// Behavioral toggles for test case extraction and export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionPolicy {
    /// Remove a dangling `Trace` word left at the end of scenario text by
    /// malformed protocols.
    pub strip_trailing_trace_artifact: bool,
    /// Export one row per traced requirement instead of one row per test case.
    pub explode_on_export: bool,
    pub trace_label: TraceLabelPolicy,
    /// Keep a record assembled from lines that precede the first
    /// `Scenario:` label.
    pub keep_leading_record: bool,
}

impl Default for ExtractionPolicy {
    fn default() -> Self {
        Self {
            strip_trailing_trace_artifact: true,
            explode_on_export: false,
            trace_label: TraceLabelPolicy::Marker,
            keep_leading_record: true,
        }
    }
}
