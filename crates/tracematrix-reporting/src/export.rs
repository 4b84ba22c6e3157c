use std::io::Write;
use std::path::Path;

use serde::Serialize;

use tracematrix_core::{
    CoverageStatus, CoverageSummary, RequirementId, TestCaseRecord, TraceMapping,
    TraceabilityReport, TraceabilityRow, explode,
};

use crate::ReportingError;
use crate::types::ExportFormat;

/// Render the test-case table.
///
/// With `explode` set, each record becomes one row per traced requirement
/// (`Scenario, Id, SW Requirement ID`). Otherwise a record is one row and
/// its trace list is joined with newlines into a single cell.
pub fn export_test_cases(
    records: &[TestCaseRecord],
    format: ExportFormat,
    explode_traces: bool,
) -> Result<String, ReportingError> {
    if explode_traces {
        let mappings = explode(records);
        return Ok(match format {
            ExportFormat::Json => serde_json::to_string_pretty(&mappings)? + "\n",
            ExportFormat::Csv => mappings_csv(&mappings),
            ExportFormat::Markdown => mappings_markdown(&mappings),
            ExportFormat::Text => mappings_text(&mappings),
        });
    }

    Ok(match format {
        ExportFormat::Json => serde_json::to_string_pretty(records)? + "\n",
        ExportFormat::Csv => records_csv(records),
        ExportFormat::Markdown => records_markdown(records),
        ExportFormat::Text => records_text(records),
    })
}

/// Render the traceability matrix, keeping only rows whose status is in
/// `statuses`. The coverage summary always reflects the full report.
pub fn export_matrix(
    report: &TraceabilityReport,
    statuses: &[CoverageStatus],
    format: ExportFormat,
) -> Result<String, ReportingError> {
    let rows = report.filter_status(statuses);
    Ok(match format {
        ExportFormat::Json => matrix_json(report, &rows)?,
        ExportFormat::Csv => matrix_csv(&rows),
        ExportFormat::Markdown => matrix_markdown(report, &rows),
        ExportFormat::Text => matrix_text(report, &rows),
    })
}

/// Render the master requirement id list, one id per row.
pub fn export_requirements(
    ids: &[RequirementId],
    format: ExportFormat,
) -> Result<String, ReportingError> {
    Ok(match format {
        ExportFormat::Json => serde_json::to_string_pretty(ids)? + "\n",
        ExportFormat::Csv => {
            let mut out = String::from("SW Requirement ID\n");
            for id in ids {
                out.push_str(&csv_escape(id.as_str()));
                out.push('\n');
            }
            out
        }
        ExportFormat::Markdown => {
            let mut out = String::from("# SW Requirements\n\n| SW Requirement ID |\n|---|\n");
            for id in ids {
                out.push_str(&format!("| {} |\n", md_escape(id.as_str())));
            }
            out
        }
        ExportFormat::Text => {
            let mut out = String::new();
            for id in ids {
                out.push_str(id.as_str());
                out.push('\n');
            }
            out
        }
    })
}

/// Write rendered content to `path`, creating or truncating the file.
pub fn write_export(content: &str, path: &Path) -> Result<(), ReportingError> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

fn csv_escape(s: &str) -> String {
    if s.contains('"') || s.contains(',') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

fn md_escape(s: &str) -> String {
    s.replace('|', "\\|")
}

fn join_trace(trace: &[RequirementId], sep: &str) -> String {
    trace
        .iter()
        .map(RequirementId::as_str)
        .collect::<Vec<_>>()
        .join(sep)
}

fn records_csv(records: &[TestCaseRecord]) -> String {
    let mut out = String::from("Scenario,Id,Trace\n");
    for r in records {
        out.push_str(&format!(
            "{},{},{}\n",
            csv_escape(&r.scenario),
            csv_escape(r.id.as_deref().unwrap_or("")),
            csv_escape(&join_trace(&r.trace, "\n")),
        ));
    }
    out
}

fn records_markdown(records: &[TestCaseRecord]) -> String {
    let mut out = String::from("# Test Cases\n\n| Scenario | Id | Trace |\n|---|---|---|\n");
    for r in records {
        out.push_str(&format!(
            "| {} | {} | {} |\n",
            md_escape(&r.scenario),
            md_escape(r.id.as_deref().unwrap_or("")),
            md_escape(&join_trace(&r.trace, "<br>")),
        ));
    }
    out
}

fn records_text(records: &[TestCaseRecord]) -> String {
    let mut out = String::new();
    for (i, r) in records.iter().enumerate() {
        out.push_str(&format!(
            "[{}] {} - {}\n",
            i + 1,
            r.id.as_deref().unwrap_or("-"),
            r.scenario
        ));
        if r.trace.is_empty() {
            out.push_str("    Trace: (none)\n");
        } else {
            out.push_str(&format!("    Trace: {}\n", join_trace(&r.trace, ", ")));
        }
    }
    out
}

fn mappings_csv(mappings: &[TraceMapping]) -> String {
    let mut out = String::from("Scenario,Id,SW Requirement ID\n");
    for m in mappings {
        out.push_str(&format!(
            "{},{},{}\n",
            csv_escape(&m.scenario),
            csv_escape(m.id.as_deref().unwrap_or("")),
            csv_escape(m.requirement.as_str()),
        ));
    }
    out
}

fn mappings_markdown(mappings: &[TraceMapping]) -> String {
    let mut out =
        String::from("# Test Cases\n\n| Scenario | Id | SW Requirement ID |\n|---|---|---|\n");
    for m in mappings {
        out.push_str(&format!(
            "| {} | {} | {} |\n",
            md_escape(&m.scenario),
            md_escape(m.id.as_deref().unwrap_or("")),
            md_escape(m.requirement.as_str()),
        ));
    }
    out
}

fn mappings_text(mappings: &[TraceMapping]) -> String {
    let mut out = String::new();
    for m in mappings {
        out.push_str(&format!(
            "{}  {}  {}\n",
            m.requirement,
            m.id.as_deref().unwrap_or("-"),
            m.scenario
        ));
    }
    out
}

fn summary_lines(summary: &CoverageSummary) -> [String; 3] {
    [
        format!("Total Requirements: {}", summary.total),
        format!("Tested Requirements: {}", summary.covered),
        format!("Coverage: {:.1}%", summary.coverage_pct()),
    ]
}

#[derive(Serialize)]
struct SummaryJson {
    total: usize,
    covered: usize,
    not_covered: usize,
    coverage_pct: f64,
}

#[derive(Serialize)]
struct MatrixJson<'a> {
    summary: SummaryJson,
    rows: &'a [&'a TraceabilityRow],
    orphans: &'a [RequirementId],
}

fn matrix_json(
    report: &TraceabilityReport,
    rows: &[&TraceabilityRow],
) -> Result<String, ReportingError> {
    let s = &report.summary;
    let doc = MatrixJson {
        summary: SummaryJson {
            total: s.total,
            covered: s.covered,
            not_covered: s.not_covered(),
            coverage_pct: (s.coverage_pct() * 10.0).round() / 10.0,
        },
        rows,
        orphans: &report.orphans,
    };
    Ok(serde_json::to_string_pretty(&doc)? + "\n")
}

fn matrix_csv(rows: &[&TraceabilityRow]) -> String {
    let mut out = String::from("SW Requirement ID,Scenario,Id,Status\n");
    for row in rows {
        out.push_str(&format!(
            "{},{},{},{}\n",
            csv_escape(row.requirement.as_str()),
            csv_escape(row.scenario.as_deref().unwrap_or("")),
            csv_escape(row.id.as_deref().unwrap_or("")),
            row.status.label(),
        ));
    }
    out
}

fn matrix_markdown(report: &TraceabilityReport, rows: &[&TraceabilityRow]) -> String {
    let mut out = String::from("# SW Requirement Traceability Matrix\n\n");
    for line in summary_lines(&report.summary) {
        out.push_str(&format!("- {}\n", line));
    }
    out.push('\n');

    out.push_str("| SW Requirement ID | Scenario | Id | Status |\n|---|---|---|---|\n");
    for row in rows {
        let status = match row.status {
            CoverageStatus::Tested => row.status.label().to_string(),
            CoverageStatus::NotCovered => format!("**{}**", row.status.label()),
        };
        out.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            md_escape(row.requirement.as_str()),
            md_escape(row.scenario.as_deref().unwrap_or("")),
            md_escape(row.id.as_deref().unwrap_or("")),
            status,
        ));
    }

    if !report.orphans.is_empty() {
        out.push_str("\n## Trace ids not in the requirement set\n\n");
        for id in &report.orphans {
            out.push_str(&format!("- {}\n", md_escape(id.as_str())));
        }
    }
    out
}

fn matrix_text(report: &TraceabilityReport, rows: &[&TraceabilityRow]) -> String {
    let mut out = String::from("SW Requirement Traceability Matrix\n");
    out.push_str(&"=".repeat(60));
    out.push('\n');
    for line in summary_lines(&report.summary) {
        out.push_str(&format!("  {}\n", line));
    }
    out.push('\n');

    let width = rows
        .iter()
        .map(|r| r.requirement.as_str().len())
        .max()
        .unwrap_or(0);
    for row in rows {
        match row.status {
            CoverageStatus::Tested => out.push_str(&format!(
                "  {:<width$}  {:<11}  {} - {}\n",
                row.requirement.as_str(),
                row.status.label(),
                row.id.as_deref().unwrap_or("-"),
                row.scenario.as_deref().unwrap_or(""),
            )),
            CoverageStatus::NotCovered => out.push_str(&format!(
                "  {:<width$}  {}\n",
                row.requirement.as_str(),
                row.status.label(),
            )),
        }
    }

    if !report.orphans.is_empty() {
        out.push_str(&format!(
            "\nTrace ids not in the requirement set: {}\n",
            join_trace(&report.orphans, ", ")
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracematrix_core::reconcile;

    fn record(scenario: &str, id: Option<&str>, trace: &[&str]) -> TestCaseRecord {
        TestCaseRecord {
            scenario: scenario.to_string(),
            id: id.map(String::from),
            trace: trace.iter().map(|t| RequirementId::new(t)).collect(),
        }
    }

    fn ids(raw: &[&str]) -> Vec<RequirementId> {
        raw.iter().map(|t| RequirementId::new(t)).collect()
    }

    fn sample_report() -> TraceabilityReport {
        let records = vec![
            record("Power-on self test", Some("TC-001"), &["RCM_SW-100", "RCM_SW-101"]),
            record("Alarm, audible", Some("TC-002"), &["RCM_SW-101", "RCM_SW-999"]),
        ];
        reconcile(&ids(&["RCM_SW-100", "RCM_SW-101", "RCM_SW-102"]), &records)
    }

    const ALL: [CoverageStatus; 2] = [CoverageStatus::Tested, CoverageStatus::NotCovered];

    #[test]
    fn test_csv_escape_quotes() {
        assert_eq!(csv_escape(r#"He said "hi""#), r#""He said ""hi""""#);
    }

    #[test]
    fn test_csv_escape_comma() {
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
    }

    #[test]
    fn test_csv_escape_newline() {
        assert_eq!(csv_escape("a\nb"), "\"a\nb\"");
    }

    #[test]
    fn test_csv_escape_clean() {
        assert_eq!(csv_escape("RCM_SW-100"), "RCM_SW-100");
    }

    #[test]
    fn test_md_escape_pipe() {
        assert_eq!(md_escape("A | B"), "A \\| B");
    }

    #[test]
    fn test_records_csv_joins_trace_with_newlines() {
        let records = vec![record("Boot", Some("TC-1"), &["RCM_SW-1", "RCM_SW-2"])];
        let out = export_test_cases(&records, ExportFormat::Csv, false).unwrap();
        assert_eq!(out, "Scenario,Id,Trace\nBoot,TC-1,\"RCM_SW-1\nRCM_SW-2\"\n");
    }

    #[test]
    fn test_records_csv_missing_id_is_empty_cell() {
        let records = vec![record("Boot", None, &[])];
        let out = export_test_cases(&records, ExportFormat::Csv, false).unwrap();
        assert_eq!(out, "Scenario,Id,Trace\nBoot,,\n");
    }

    #[test]
    fn test_exploded_csv_one_row_per_trace() {
        let records = vec![
            record("Boot", Some("TC-1"), &["RCM_SW-1", "RCM_SW-2"]),
            record("Idle", Some("TC-2"), &[]),
        ];
        let out = export_test_cases(&records, ExportFormat::Csv, true).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Scenario,Id,SW Requirement ID",
                "Boot,TC-1,RCM_SW-1",
                "Boot,TC-1,RCM_SW-2",
            ]
        );
    }

    #[test]
    fn test_records_json_is_array_of_records() {
        let records = vec![record("Boot", Some("TC-1"), &["RCM_SW-1"])];
        let out = export_test_cases(&records, ExportFormat::Json, false).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value[0]["scenario"], "Boot");
        assert_eq!(value[0]["id"], "TC-1");
        assert_eq!(value[0]["trace"][0], "RCM_SW-1");
    }

    #[test]
    fn test_records_markdown_uses_br_for_trace() {
        let records = vec![record("A | B", Some("TC-1"), &["RCM_SW-1", "RCM_SW-2"])];
        let out = export_test_cases(&records, ExportFormat::Markdown, false).unwrap();
        assert!(out.contains("| A \\| B | TC-1 | RCM_SW-1<br>RCM_SW-2 |"));
    }

    #[test]
    fn test_records_text_marks_untraced() {
        let records = vec![record("Idle", None, &[])];
        let out = export_test_cases(&records, ExportFormat::Text, false).unwrap();
        assert_eq!(out, "[1] - - Idle\n    Trace: (none)\n");
    }

    #[test]
    fn test_matrix_csv_rows_and_labels() {
        let out = export_matrix(&sample_report(), &ALL, ExportFormat::Csv).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines,
            vec![
                "SW Requirement ID,Scenario,Id,Status",
                "RCM_SW-100,Power-on self test,TC-001,Tested",
                "RCM_SW-101,Power-on self test,TC-001,Tested",
                "RCM_SW-101,\"Alarm, audible\",TC-002,Tested",
                "RCM_SW-102,,,Not Covered",
            ]
        );
    }

    #[test]
    fn test_matrix_status_filter() {
        let out = export_matrix(
            &sample_report(),
            &[CoverageStatus::NotCovered],
            ExportFormat::Csv,
        )
        .unwrap();
        assert_eq!(
            out,
            "SW Requirement ID,Scenario,Id,Status\nRCM_SW-102,,,Not Covered\n"
        );
    }

    #[test]
    fn test_matrix_json_summary_and_orphans() {
        let out = export_matrix(&sample_report(), &ALL, ExportFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["summary"]["total"], 3);
        assert_eq!(value["summary"]["covered"], 2);
        assert_eq!(value["summary"]["not_covered"], 1);
        assert_eq!(value["summary"]["coverage_pct"], 66.7);
        assert_eq!(value["rows"].as_array().unwrap().len(), 4);
        assert_eq!(value["rows"][3]["status"], "not_covered");
        assert_eq!(value["orphans"][0], "RCM_SW-999");
    }

    #[test]
    fn test_matrix_markdown_summary() {
        let out = export_matrix(&sample_report(), &ALL, ExportFormat::Markdown).unwrap();
        assert!(out.starts_with("# SW Requirement Traceability Matrix\n"));
        assert!(out.contains("- Total Requirements: 3\n"));
        assert!(out.contains("- Tested Requirements: 2\n"));
        assert!(out.contains("- Coverage: 66.7%\n"));
        assert!(out.contains("| RCM_SW-102 |  |  | **Not Covered** |"));
        assert!(out.contains("- RCM_SW-999\n"));
    }

    #[test]
    fn test_matrix_text_summary_survives_filter() {
        let out = export_matrix(&sample_report(), &[], ExportFormat::Text).unwrap();
        assert!(out.contains("Coverage: 66.7%"));
        assert!(!out.contains("RCM_SW-100"));
    }

    #[test]
    fn test_empty_master_reports_zero_coverage() {
        let report = reconcile(&[], &[record("Boot", Some("TC-1"), &["RCM_SW-1"])]);
        let out = export_matrix(&report, &ALL, ExportFormat::Text).unwrap();
        assert!(out.contains("Total Requirements: 0"));
        assert!(out.contains("Coverage: 0.0%"));
    }

    #[test]
    fn test_requirements_csv() {
        let out =
            export_requirements(&ids(&["RCM_SW-1", "RCM_SW-2"]), ExportFormat::Csv).unwrap();
        assert_eq!(out, "SW Requirement ID\nRCM_SW-1\nRCM_SW-2\n");
    }

    #[test]
    fn test_write_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("matrix.csv");
        write_export("a,b\n", &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a,b\n");
    }
}
