pub mod dynamic;
pub mod grouping;
pub mod rule;

pub use dynamic::DynamicValue;
pub use grouping::{UNCATEGORIZED, group_by_category};
pub use rule::{Rule, RulePatch, RuleStatus};
