//! Seam to the reglas backend.
//!
//! The review session and the synchronizer only ever talk to this trait;
//! the HTTP implementation lives in [`http`](crate::http) behind the `http`
//! feature, and tests substitute in-process mocks.

use async_trait::async_trait;
use urbalex_core::{Rule, RuleStatus};

use crate::SyncError;

#[async_trait]
pub trait RuleBackend: Send + Sync {
    /// Fetch the working set for a status filter and optional category.
    async fn fetch_rules(
        &self,
        status: RuleStatus,
        category: Option<&str>,
    ) -> Result<Vec<Rule>, SyncError>;

    /// Mark a rule approved (status-only update).
    async fn approve_rule(&self, id: &str) -> Result<(), SyncError>;

    /// Replace a rule with its edited payload.
    async fn update_rule(&self, rule: &Rule) -> Result<(), SyncError>;

    /// Hard-delete a rejected rule.
    async fn delete_rule(&self, id: &str) -> Result<(), SyncError>;
}
