use std::collections::BTreeSet;
use std::io::Write;

use owo_colors::OwoColorize;
use tracematrix_core::{
    CoverageStatus, ExtractionStats, RequirementId, TestCaseRecord, TraceabilityReport, explode,
};

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let cut: String = s.chars().take(max).collect();
        format!("{}...", cut)
    } else {
        s.to_string()
    }
}

fn print_header(w: &mut dyn Write, title: &str, color: ColorMode) -> std::io::Result<()> {
    let sep = "=".repeat(60);
    if color.enabled() {
        writeln!(w, "{}", sep.bold())?;
        writeln!(w, "{}", title.bold())?;
        writeln!(w, "{}", sep.bold())?;
    } else {
        writeln!(w, "{}", sep)?;
        writeln!(w, "{}", title)?;
        writeln!(w, "{}", sep)?;
    }
    Ok(())
}

/// Print what was pulled out of a document before showing results.
pub fn print_extraction_summary(
    w: &mut dyn Write,
    file_name: &str,
    stats: &ExtractionStats,
    color: ColorMode,
) -> std::io::Result<()> {
    writeln!(
        w,
        "Extracted {} lines from {} ({} pages)",
        stats.lines, file_name, stats.pages
    )?;
    if stats.empty_pages > 0 {
        let msg = format!("(Skipped {} pages without text)", stats.empty_pages);
        if color.enabled() {
            writeln!(w, "{}", msg.dimmed())?;
        } else {
            writeln!(w, "{}", msg)?;
        }
    }
    writeln!(w)?;
    Ok(())
}

pub fn print_no_test_cases(w: &mut dyn Write, color: ColorMode) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(w, "{}", "No test cases found.".yellow())
    } else {
        writeln!(w, "No test cases found.")
    }
}

/// Print extracted test cases, one block per record.
pub fn print_test_cases(
    w: &mut dyn Write,
    records: &[TestCaseRecord],
    color: ColorMode,
) -> std::io::Result<()> {
    for (i, record) in records.iter().enumerate() {
        let id = record.id.as_deref().unwrap_or("-");
        let scenario = truncate(&record.scenario, 100);
        if color.enabled() {
            writeln!(w, "[{}] {} {}", i + 1, id.cyan().bold(), scenario)?;
        } else {
            writeln!(w, "[{}] {} {}", i + 1, id, scenario)?;
        }

        if record.trace.is_empty() {
            if color.enabled() {
                writeln!(w, "      {}", "no trace".dimmed())?;
            } else {
                writeln!(w, "      no trace")?;
            }
        } else {
            let trace: Vec<&str> = record.trace.iter().map(RequirementId::as_str).collect();
            writeln!(w, "      Trace: {}", trace.join(", "))?;
        }
    }

    let unique: BTreeSet<&RequirementId> = records.iter().flat_map(|r| &r.trace).collect();
    writeln!(w)?;
    let msg = format!(
        "Total unique SW Requirement IDs covered: {}",
        unique.len()
    );
    if color.enabled() {
        writeln!(w, "{}", msg.green())?;
    } else {
        writeln!(w, "{}", msg)?;
    }
    Ok(())
}

/// Print one line per (requirement, test case) pair.
pub fn print_mappings(
    w: &mut dyn Write,
    records: &[TestCaseRecord],
    color: ColorMode,
) -> std::io::Result<()> {
    let mappings = explode(records);
    let width = mappings
        .iter()
        .map(|m| m.requirement.as_str().len())
        .max()
        .unwrap_or(0);

    for m in &mappings {
        let req = format!("{:<width$}", m.requirement.as_str());
        let id = m.id.as_deref().unwrap_or("-");
        let scenario = truncate(&m.scenario, 80);
        if color.enabled() {
            writeln!(w, "  {}  {}  {}", req.cyan(), id.bold(), scenario)?;
        } else {
            writeln!(w, "  {}  {}  {}", req, id, scenario)?;
        }
    }

    let unique: BTreeSet<&RequirementId> = mappings.iter().map(|m| &m.requirement).collect();
    writeln!(w)?;
    writeln!(w, "{} Scenario-Requirement mappings", mappings.len())?;
    let msg = format!(
        "Total unique SW Requirement IDs covered: {}",
        unique.len()
    );
    if color.enabled() {
        writeln!(w, "{}", msg.green())?;
    } else {
        writeln!(w, "{}", msg)?;
    }
    Ok(())
}

/// Print the master requirement list.
pub fn print_requirements(
    w: &mut dyn Write,
    ids: &[RequirementId],
    color: ColorMode,
) -> std::io::Result<()> {
    for id in ids {
        writeln!(w, "  {}", id)?;
    }
    writeln!(w)?;
    if color.enabled() {
        writeln!(w, "{} {}", "Requirements found:".bold(), ids.len())?;
    } else {
        writeln!(w, "Requirements found: {}", ids.len())?;
    }
    Ok(())
}

/// Print the traceability matrix rows matching `statuses`, then the
/// coverage summary over the whole report.
pub fn print_matrix(
    w: &mut dyn Write,
    report: &TraceabilityReport,
    statuses: &[CoverageStatus],
    color: ColorMode,
) -> std::io::Result<()> {
    let rows = report.filter_status(statuses);
    let width = rows
        .iter()
        .map(|r| r.requirement.as_str().len())
        .max()
        .unwrap_or(0);

    for row in &rows {
        let req = format!("{:<width$}", row.requirement.as_str());
        match row.status {
            CoverageStatus::Tested => {
                let id = row.id.as_deref().unwrap_or("-");
                let scenario = truncate(row.scenario.as_deref().unwrap_or(""), 70);
                if color.enabled() {
                    writeln!(
                        w,
                        "  {}  {}  {} {}",
                        req,
                        "TESTED     ".green(),
                        id.cyan(),
                        scenario
                    )?;
                } else {
                    writeln!(w, "  {}  TESTED       {} {}", req, id, scenario)?;
                }
            }
            CoverageStatus::NotCovered => {
                if color.enabled() {
                    writeln!(w, "  {}  {}", req, "NOT COVERED".red().bold())?;
                } else {
                    writeln!(w, "  {}  NOT COVERED", req)?;
                }
            }
        }
    }

    writeln!(w)?;
    print_header(w, "COVERAGE SUMMARY", color)?;
    let s = &report.summary;
    writeln!(w, "  Total Requirements: {}", s.total)?;
    if color.enabled() {
        writeln!(w, "  Tested Requirements: {}", s.covered.green())?;
        if s.not_covered() > 0 {
            writeln!(w, "  Not Covered: {}", s.not_covered().red())?;
        } else {
            writeln!(w, "  Not Covered: {}", s.not_covered())?;
        }
        writeln!(
            w,
            "  Coverage: {}",
            format!("{:.1}%", s.coverage_pct()).bold()
        )?;
    } else {
        writeln!(w, "  Tested Requirements: {}", s.covered)?;
        writeln!(w, "  Not Covered: {}", s.not_covered())?;
        writeln!(w, "  Coverage: {:.1}%", s.coverage_pct())?;
    }
    Ok(())
}

/// Warn about trace ids that do not appear in the requirement set.
pub fn print_orphans(
    w: &mut dyn Write,
    orphans: &[RequirementId],
    color: ColorMode,
) -> std::io::Result<()> {
    if orphans.is_empty() {
        return Ok(());
    }
    let list: Vec<&str> = orphans.iter().map(RequirementId::as_str).collect();
    let msg = format!(
        "{} traced id(s) not in the requirement set: {}",
        orphans.len(),
        list.join(", ")
    );
    if color.enabled() {
        writeln!(w, "{} {}", "WARNING:".yellow(), msg)
    } else {
        writeln!(w, "WARNING: {}", msg)
    }
}
