use std::collections::BTreeSet;

use tracematrix_core::RequirementId;

use crate::config::ParserConfig;

/// Collect every distinct requirement id in `lines`.
///
/// Unlike scenario parsing, no line rules apply: every match on every line
/// counts. The result is sorted.
pub fn extract_requirement_ids<I, S>(lines: I, config: &ParserConfig) -> Vec<RequirementId>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let re = config.requirement_re();
    let ids: BTreeSet<RequirementId> = lines
        .into_iter()
        .flat_map(|line| {
            re.find_iter(line.as_ref())
                .map(|m| RequirementId::new(m.as_str()))
                .collect::<Vec<_>>()
        })
        .collect();
    ids.into_iter().collect()
}
