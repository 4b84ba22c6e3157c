use once_cell::sync::Lazy;
use regex::Regex;

use tracematrix_core::{RequirementId, TraceLabelPolicy};

use crate::config::ParserConfig;
use crate::text_processing::normalize_whitespace;

pub const SCENARIO_LABEL: &str = "Scenario:";
pub const ID_LABEL: &str = "Id:";
pub const TRACE_LABEL: &str = "Trace:";
pub const STEPS_LABEL: &str = "Steps:";

/// Classification of a single trimmed protocol line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineClass {
    /// Line contains requirement ids; nothing else on it is used.
    Trace(Vec<RequirementId>),
    /// `Scenario:` line with the label, any inline `Id:` fragment and any
    /// literal `Trace:` removed.
    ScenarioStart {
        scenario: String,
        id: Option<String>,
    },
    /// `Id:` line; holds the trimmed remainder, possibly empty.
    Id(String),
    TraceLabel,
    Steps,
    Continuation(String),
}

/// Identifies an entry of the ranked rule table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Trace,
    ScenarioStart,
    Id,
    TraceLabel,
    Steps,
}

type Extractor = fn(&LineClassifier, &str) -> Option<LineClass>;

/// Rules in priority order. The first extractor returning `Some` decides the
/// line; a line no rule claims is a continuation.
static RULES: [(RuleKind, Extractor); 5] = [
    (RuleKind::Trace, LineClassifier::match_trace),
    (RuleKind::ScenarioStart, LineClassifier::match_scenario),
    (RuleKind::Id, LineClassifier::match_id),
    (RuleKind::TraceLabel, LineClassifier::match_trace_label),
    (RuleKind::Steps, LineClassifier::match_steps),
];

/// Stateless line classifier.
#[derive(Debug, Clone)]
pub struct LineClassifier {
    requirement_re: Regex,
    trace_label: TraceLabelPolicy,
}

impl LineClassifier {
    pub fn new(config: &ParserConfig) -> Self {
        Self {
            requirement_re: config.requirement_re().clone(),
            trace_label: config.trace_label(),
        }
    }

    /// Active rules in evaluation order.
    pub fn rules(&self) -> impl Iterator<Item = RuleKind> + '_ {
        RULES
            .iter()
            .map(|(kind, _)| *kind)
            .filter(|kind| self.is_enabled(*kind))
    }

    fn is_enabled(&self, kind: RuleKind) -> bool {
        match kind {
            RuleKind::TraceLabel => self.trace_label != TraceLabelPolicy::Continuation,
            _ => true,
        }
    }

    /// Classify one trimmed, non-empty line.
    pub fn classify(&self, line: &str) -> LineClass {
        RULES
            .iter()
            .filter(|(kind, _)| self.is_enabled(*kind))
            .find_map(|(_, extract)| extract(self, line))
            .unwrap_or_else(|| LineClass::Continuation(line.to_string()))
    }

    /// All requirement ids in `line`, in order, duplicates kept.
    pub fn find_requirement_ids(&self, line: &str) -> Vec<RequirementId> {
        self.requirement_re
            .find_iter(line)
            .map(|m| RequirementId::new(m.as_str()))
            .collect()
    }

    fn match_trace(&self, line: &str) -> Option<LineClass> {
        let ids = self.find_requirement_ids(line);
        if ids.is_empty() {
            None
        } else {
            Some(LineClass::Trace(ids))
        }
    }

    fn match_scenario(&self, line: &str) -> Option<LineClass> {
        static INLINE_ID_RE: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"\bId:\s*([A-Za-z0-9_-]+)").unwrap());

        let rest = line.strip_prefix(SCENARIO_LABEL)?;

        let inline = INLINE_ID_RE
            .captures(rest)
            .and_then(|caps| Some((caps.get(0)?, caps.get(1)?)));
        let (id, working) = match inline {
            Some((whole, token)) => (
                Some(token.as_str().to_string()),
                format!("{} {}", &rest[..whole.start()], &rest[whole.end()..]),
            ),
            None => (None, rest.to_string()),
        };

        let working = working.replace(TRACE_LABEL, " ");
        Some(LineClass::ScenarioStart {
            scenario: normalize_whitespace(&working),
            id,
        })
    }

    fn match_id(&self, line: &str) -> Option<LineClass> {
        line.strip_prefix(ID_LABEL)
            .map(|rest| LineClass::Id(rest.trim().to_string()))
    }

    fn match_trace_label(&self, line: &str) -> Option<LineClass> {
        line.starts_with(TRACE_LABEL).then_some(LineClass::TraceLabel)
    }

    fn match_steps(&self, line: &str) -> Option<LineClass> {
        line.starts_with(STEPS_LABEL).then_some(LineClass::Steps)
    }
}
