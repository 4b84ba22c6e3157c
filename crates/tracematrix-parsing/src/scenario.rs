use tracematrix_core::{ExtractionPolicy, RequirementId, TestCaseRecord, TraceLabelPolicy};

use crate::classify::{LineClass, LineClassifier};
use crate::config::ParserConfig;
use crate::text_processing::{normalize_whitespace, strip_trailing_trace_artifact};

/// The test case currently being assembled.
#[derive(Debug, Default)]
struct Accumulator {
    scenario: String,
    id: Option<String>,
    trace: Vec<RequirementId>,
    /// Whether plain lines extend the scenario text.
    collecting: bool,
}

/// Line-driven state machine turning a protocol's lines into test cases.
///
/// A record opens at each `Scenario:` line and stays open, collecting trace
/// ids, until the next `Scenario:` line or [`finish`](Self::finish).
/// `Steps:` and `Id:` lines only stop scenario text collection.
#[derive(Debug)]
pub struct ScenarioParser {
    classifier: LineClassifier,
    policy: ExtractionPolicy,
    current: Accumulator,
    seen_scenario: bool,
    records: Vec<TestCaseRecord>,
}

impl ScenarioParser {
    pub fn new(config: &ParserConfig) -> Self {
        Self {
            classifier: LineClassifier::new(config),
            policy: *config.policy(),
            current: Accumulator::default(),
            seen_scenario: false,
            records: Vec::new(),
        }
    }

    /// Feed a sequence of lines. Lines are trimmed and blank ones ignored.
    pub fn consume<I, S>(&mut self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for line in lines {
            self.push_line(line.as_ref());
        }
    }

    pub fn push_line(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        let class = self.classifier.classify(line);
        self.apply(class);
    }

    /// Advance the state machine by one classified line.
    pub fn apply(&mut self, class: LineClass) {
        match class {
            LineClass::Trace(ids) => self.current.trace.extend(ids),
            LineClass::ScenarioStart { scenario, id } => {
                self.flush();
                self.seen_scenario = true;
                self.current.scenario = scenario;
                self.current.id = id;
                self.current.collecting = true;
            }
            LineClass::Id(id) => {
                if !id.is_empty() {
                    self.current.id = Some(id);
                }
                self.current.collecting = false;
            }
            LineClass::TraceLabel => {
                if self.policy.trace_label == TraceLabelPolicy::EndsScenario {
                    self.current.collecting = false;
                }
            }
            LineClass::Steps => self.current.collecting = false,
            LineClass::Continuation(text) => {
                if self.current.collecting {
                    self.current.scenario.push(' ');
                    self.current.scenario.push_str(&text);
                } else {
                    tracing::trace!(line = %text, "dropping line outside scenario text");
                }
            }
        }
    }

    /// Whether plain lines are currently appended to the scenario text.
    pub fn is_collecting(&self) -> bool {
        self.current.collecting
    }

    /// Records completed so far.
    pub fn records(&self) -> &[TestCaseRecord] {
        &self.records
    }

    /// Finalize the open record and reset the accumulator.
    ///
    /// Empty records are dropped, as is a record assembled before the first
    /// `Scenario:` line when the policy does not keep leading records.
    pub fn flush(&mut self) {
        let Accumulator {
            scenario, id, trace, ..
        } = std::mem::take(&mut self.current);

        let mut scenario = normalize_whitespace(&scenario);
        if self.policy.strip_trailing_trace_artifact {
            scenario = strip_trailing_trace_artifact(&scenario);
        }

        let record = TestCaseRecord {
            scenario,
            id,
            trace,
        };

        if record.is_empty() {
            return;
        }
        if !self.seen_scenario && !self.policy.keep_leading_record {
            tracing::debug!(
                trace = record.trace.len(),
                "discarding record that precedes the first scenario"
            );
            return;
        }

        tracing::debug!(
            id = record.id.as_deref().unwrap_or(""),
            trace = record.trace.len(),
            "test case complete"
        );
        self.records.push(record);
    }

    /// Flush the last record and return everything in source order.
    pub fn finish(mut self) -> Vec<TestCaseRecord> {
        self.flush();
        self.records
    }
}

/// Parse a complete line sequence with a fresh parser.
pub fn parse_lines<I, S>(lines: I, config: &ParserConfig) -> Vec<TestCaseRecord>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut parser = ScenarioParser::new(config);
    parser.consume(lines);
    parser.finish()
}
