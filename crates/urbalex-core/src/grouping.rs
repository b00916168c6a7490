//! Category grouping for the moderation view.
//!
//! The console renders the working set as one section per category. This is
//! a pure derived view: filter first, then partition, recomputed on every
//! render. Rules keep their source order within a group; group keys come
//! out in lexicographic order (BTreeMap), which is also how the sections
//! are rendered.

use std::collections::BTreeMap;

use crate::rule::Rule;

/// Bucket for rules with an empty or absent category.
pub const UNCATEGORIZED: &str = "uncategorized";

/// Case-insensitive substring match against a rule's id and title.
///
/// An empty filter passes every rule.
pub fn matches_filter(rule: &Rule, text_filter: &str) -> bool {
    if text_filter.is_empty() {
        return true;
    }
    let needle = text_filter.to_lowercase();
    rule.id.to_lowercase().contains(&needle) || rule.title.to_lowercase().contains(&needle)
}

/// Partition the displayed rules by category, after applying the text filter.
///
/// Grouping key is the rule's category when present and non-empty, else the
/// literal [`UNCATEGORIZED`] bucket. Within a group, rules appear in the
/// order they appear in the filtered input.
pub fn group_by_category<'a>(
    rules: &'a [Rule],
    text_filter: &str,
) -> BTreeMap<String, Vec<&'a Rule>> {
    let mut groups: BTreeMap<String, Vec<&Rule>> = BTreeMap::new();
    for rule in rules.iter().filter(|r| matches_filter(r, text_filter)) {
        let key = match rule.category.as_deref() {
            Some(c) if !c.is_empty() => c.to_string(),
            _ => UNCATEGORIZED.to_string(),
        };
        groups.entry(key).or_default().push(rule);
    }
    groups
}
