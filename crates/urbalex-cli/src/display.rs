//! Console rendering for grouped rule sets and sync reports.

use std::collections::BTreeMap;

use urbalex_core::Rule;
use urbalex_sync::SyncReport;

const MAX_PARAMS: usize = 8;

/// Print the working set one section per category, rules in source order.
pub fn print_groups(groups: &BTreeMap<String, Vec<&Rule>>) {
    if groups.is_empty() {
        println!("(no rules match)");
        return;
    }
    for (category, rules) in groups {
        println!("── {category} ({}) ──", rules.len());
        for rule in rules {
            print_rule(rule);
        }
        println!();
    }
}

pub fn print_rule(rule: &Rule) {
    println!("[{}] {}  ({})", rule.status, rule.id, rule.title);
    if !rule.description.is_empty() {
        println!("    {}", rule.description);
    }
    if let Some(condition) = &rule.condition {
        for line in condition.to_input().lines() {
            println!("    | {line}");
        }
    }
    if !rule.key_parameters.is_empty() {
        let shown: Vec<&str> = rule
            .key_parameters
            .iter()
            .take(MAX_PARAMS)
            .map(String::as_str)
            .collect();
        let suffix = if rule.key_parameters.len() > MAX_PARAMS {
            format!(" … +{}", rule.key_parameters.len() - MAX_PARAMS)
        } else {
            String::new()
        };
        println!("    params: {}{}", shown.join(", "), suffix);
    }
    if !rule.document_version.is_empty() {
        println!("    doc: {}", rule.document_version);
    }
}

/// Print a per-operation summary of a finalize run.
pub fn print_report(report: &SyncReport) {
    println!(
        "synced {} change(s) in {} batch(es): {} ok, {} failed",
        report.total(),
        report.batches,
        report.succeeded_count(),
        report.failed_count()
    );
    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(()) => println!("  ok    {:<8} {}", outcome.op, outcome.rule_id),
            Err(error) => println!("  FAIL  {:<8} {}  ({error})", outcome.op, outcome.rule_id),
        }
    }
}
