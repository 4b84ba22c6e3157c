//! End-to-end tests over protocol-shaped text.
//!
//! The fixtures mimic what a PDF text backend returns for a typical
//! verification protocol: page headers, revision tables, scenarios that
//! wrap across lines and pages, and trace ids scattered after `Trace:`
//! labels.

use tracematrix_core::{CoverageStatus, DocumentText, RequirementId, TraceLabelPolicy, reconcile};
use tracematrix_parsing::{
    ParserConfig, ParserConfigBuilder, parse_document, requirements_from_document,
};

const PROTOCOL_PAGE_1: &str = "\
LC2530 Software Verification Protocol
Revision history
Rev A   Initial release
Scenario: Power-on self test Id: TC-001
Trace: RCM_SW-100
RCM_SW-101
Steps: press the power button
Expected: the green LED lights within 2 s
Scenario: Verify that the pump stops
when the occlusion sensor
";

const PROTOCOL_PAGE_2: &str = "\
Page 2 of 3
reports a blocked line Trace
Id: TC-002
RCM_SW-205, RCM_SW-206
Steps:
1. Clamp the tubing
Scenario: Alarm volume can be adjusted Id: TC-003
Steps: open settings
";

const SRS_TEXT: &str = "\
3.1 Start-up
RCM_SW-100 The device shall run a self test at power-on.
RCM_SW-101 The self test shall complete within 2 s.
3.2 Occlusion
RCM_SW-205 The pump shall stop on occlusion.
RCM_SW-206 An occlusion alarm shall be raised.
RCM_SW-300 The alarm volume shall be adjustable.
See also RCM_SW-100.
";

fn protocol() -> DocumentText {
    DocumentText::from_pages([Some(PROTOCOL_PAGE_1), None, Some(PROTOCOL_PAGE_2)])
}

fn ids(raw: &[&str]) -> Vec<RequirementId> {
    raw.iter().map(|s| RequirementId::new(s)).collect()
}

#[test]
fn protocol_yields_three_test_cases() {
    let result = parse_document(&protocol(), &ParserConfig::default());
    let records = &result.records;
    assert_eq!(records.len(), 3);

    assert_eq!(records[0].scenario, "Power-on self test");
    assert_eq!(records[0].id.as_deref(), Some("TC-001"));
    assert_eq!(records[0].trace, ids(&["RCM_SW-100", "RCM_SW-101"]));

    // "Page 2 of 3" is picked up as scenario text; the trailing "Trace"
    // artifact is removed.
    assert_eq!(
        records[1].scenario,
        "Verify that the pump stops when the occlusion sensor Page 2 of 3 reports a blocked line"
    );
    assert_eq!(records[1].id.as_deref(), Some("TC-002"));
    assert_eq!(records[1].trace, ids(&["RCM_SW-205", "RCM_SW-206"]));

    assert_eq!(records[2].scenario, "Alarm volume can be adjusted");
    assert_eq!(records[2].id.as_deref(), Some("TC-003"));
    assert!(records[2].trace.is_empty());

    assert_eq!(result.stats.pages, 3);
    assert_eq!(result.stats.empty_pages, 1);
}

#[test]
fn artifact_survives_when_stripping_disabled() {
    let config = ParserConfigBuilder::new()
        .strip_trailing_trace_artifact(false)
        .build()
        .unwrap();
    let result = parse_document(&protocol(), &config);
    assert!(result.records[1].scenario.ends_with("blocked line Trace"));
}

#[test]
fn every_variant_captures_the_same_traces() {
    let traces = |policy: TraceLabelPolicy| {
        let config = ParserConfigBuilder::new().trace_label(policy).build().unwrap();
        parse_document(&protocol(), &config)
            .records
            .into_iter()
            .map(|r| r.trace)
            .collect::<Vec<_>>()
    };
    let marker = traces(TraceLabelPolicy::Marker);
    assert_eq!(marker, traces(TraceLabelPolicy::EndsScenario));
    assert_eq!(marker, traces(TraceLabelPolicy::Continuation));
}

#[test]
fn srs_and_protocol_reconcile() {
    let config = ParserConfig::default();
    let master = requirements_from_document(
        &DocumentText::from_pages([Some(SRS_TEXT)]),
        &config,
    );
    assert_eq!(
        master.ids,
        ids(&["RCM_SW-100", "RCM_SW-101", "RCM_SW-205", "RCM_SW-206", "RCM_SW-300"])
    );

    let records = parse_document(&protocol(), &config).records;
    let report = reconcile(&master.ids, &records);

    assert_eq!(report.summary.total, 5);
    assert_eq!(report.summary.covered, 4);
    assert_eq!(format!("{:.1}", report.summary.coverage_pct()), "80.0");

    let uncovered = report.filter_status(&[CoverageStatus::NotCovered]);
    assert_eq!(uncovered.len(), 1);
    assert_eq!(uncovered[0].requirement.as_str(), "RCM_SW-300");
    assert!(report.orphans.is_empty());
}

#[test]
fn empty_document_produces_no_records() {
    let doc = DocumentText::from_pages([None::<&str>, None]);
    let result = parse_document(&doc, &ParserConfig::default());
    assert!(result.records.is_empty());
    assert_eq!(result.stats.lines, 0);
}
