use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::{
    CoverageStatus, CoverageSummary, RequirementId, TestCaseRecord, TraceabilityReport,
    TraceabilityRow,
};

/// One (requirement, test case) pair obtained by exploding a record's trace list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceMapping {
    pub requirement: RequirementId,
    pub scenario: String,
    pub id: Option<String>,
}

/// Flatten records into one mapping per trace entry.
///
/// A record with an empty trace list contributes nothing.
pub fn explode(records: &[TestCaseRecord]) -> Vec<TraceMapping> {
    records
        .iter()
        .flat_map(|record| {
            record.trace.iter().map(move |requirement| TraceMapping {
                requirement: requirement.clone(),
                scenario: record.scenario.clone(),
                id: record.id.clone(),
            })
        })
        .collect()
}

/// Left outer join of the master requirement set against the test cases.
///
/// Rows follow the order of `master`. Each master id yields one `Tested` row
/// per exploded mapping that references it, or a single `NotCovered` row
/// when nothing does. Trace ids absent from `master` are reported in
/// [`TraceabilityReport::orphans`] and never become rows.
pub fn reconcile(master: &[RequirementId], records: &[TestCaseRecord]) -> TraceabilityReport {
    let mappings = explode(records);

    let mut by_requirement: HashMap<&RequirementId, Vec<&TraceMapping>> = HashMap::new();
    for mapping in &mappings {
        by_requirement
            .entry(&mapping.requirement)
            .or_default()
            .push(mapping);
    }

    let mut rows = Vec::with_capacity(master.len().max(mappings.len()));
    let mut seen: HashSet<&RequirementId> = HashSet::new();
    let mut covered = 0;

    for requirement in master {
        if !seen.insert(requirement) {
            continue;
        }
        match by_requirement.get(requirement) {
            Some(matches) => {
                covered += 1;
                rows.extend(matches.iter().map(|m| TraceabilityRow {
                    requirement: requirement.clone(),
                    scenario: Some(m.scenario.clone()),
                    id: m.id.clone(),
                    status: CoverageStatus::Tested,
                }));
            }
            None => rows.push(TraceabilityRow {
                requirement: requirement.clone(),
                scenario: None,
                id: None,
                status: CoverageStatus::NotCovered,
            }),
        }
    }

    let orphans: BTreeSet<RequirementId> = mappings
        .iter()
        .filter(|m| !seen.contains(&m.requirement))
        .map(|m| m.requirement.clone())
        .collect();

    let summary = CoverageSummary {
        total: seen.len(),
        covered,
    };

    tracing::debug!(
        total = summary.total,
        covered = summary.covered,
        orphans = orphans.len(),
        "reconciled requirements"
    );

    TraceabilityReport {
        rows,
        summary,
        orphans: orphans.into_iter().collect(),
    }
}
