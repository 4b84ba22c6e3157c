use once_cell::sync::Lazy;
use regex::Regex;

use tracematrix_core::{ExtractionPolicy, TraceLabelPolicy};

/// Requirement prefix used when nothing else is configured.
pub const DEFAULT_REQUIREMENT_PREFIX: &str = "RCM_SW";

/// Configuration for scenario parsing and requirement scanning.
///
/// `requirement_re` is `None` when the built-in `RCM_SW-<digits>` pattern
/// applies. Use [`ParserConfigBuilder`] to set a different prefix or pattern.
#[derive(Debug, Clone, Default)]
pub struct ParserConfig {
    /// Regex matching a single requirement id token.
    pub(crate) requirement_re: Option<Regex>,
    pub(crate) policy: ExtractionPolicy,
}

impl ParserConfig {
    pub fn policy(&self) -> &ExtractionPolicy {
        &self.policy
    }

    pub fn trace_label(&self) -> TraceLabelPolicy {
        self.policy.trace_label
    }

    /// The configured requirement id regex, or the built-in `RCM_SW-<digits>`.
    pub fn requirement_re(&self) -> &Regex {
        static DEFAULT_RE: Lazy<Regex> =
            Lazy::new(|| Regex::new(&prefix_pattern(DEFAULT_REQUIREMENT_PREFIX)).unwrap());

        self.requirement_re.as_ref().unwrap_or(&DEFAULT_RE)
    }
}

/// Builder for [`ParserConfig`].
///
/// Accepts string patterns that are compiled to `Regex` in [`build()`](Self::build).
/// Fails fast with `regex::Error` if the pattern is invalid.
#[derive(Debug, Clone, Default)]
pub struct ParserConfigBuilder {
    requirement_prefix: Option<String>,
    requirement_re: Option<String>,
    policy: ExtractionPolicy,
}

impl ParserConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Match ids of the form `<prefix>-<digits>`. The prefix is matched literally.
    pub fn requirement_prefix(mut self, prefix: &str) -> Self {
        self.requirement_prefix = Some(prefix.to_string());
        self
    }

    /// Replace the id pattern entirely. Takes precedence over the prefix.
    pub fn requirement_regex(mut self, pattern: &str) -> Self {
        self.requirement_re = Some(pattern.to_string());
        self
    }

    pub fn policy(mut self, policy: ExtractionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn strip_trailing_trace_artifact(mut self, strip: bool) -> Self {
        self.policy.strip_trailing_trace_artifact = strip;
        self
    }

    pub fn trace_label(mut self, policy: TraceLabelPolicy) -> Self {
        self.policy.trace_label = policy;
        self
    }

    pub fn keep_leading_record(mut self, keep: bool) -> Self {
        self.policy.keep_leading_record = keep;
        self
    }

    pub fn explode_on_export(mut self, explode: bool) -> Self {
        self.policy.explode_on_export = explode;
        self
    }

    /// Compile the id pattern and produce a [`ParserConfig`].
    pub fn build(self) -> Result<ParserConfig, regex::Error> {
        let pattern = match (self.requirement_re, self.requirement_prefix) {
            (Some(pattern), _) => Some(pattern),
            (None, Some(prefix)) => Some(prefix_pattern(&prefix)),
            (None, None) => None,
        };

        Ok(ParserConfig {
            requirement_re: pattern.map(|p| Regex::new(&p)).transpose()?,
            policy: self.policy,
        })
    }
}

/// Regex source for `<prefix>-<digits>` with the prefix escaped.
pub fn prefix_pattern(prefix: &str) -> String {
    format!(r"{}-\d+", regex::escape(prefix.trim()))
}
