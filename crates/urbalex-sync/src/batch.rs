//! Finalize-review batch synchronizer.
//!
//! Pending changes become typed tasks (approve / reject / modify), issued
//! against the backend in fixed-size batches with an inter-batch delay to
//! stay under the gateway's rate limits. Tasks within a batch dispatch
//! concurrently; batch N+1 never starts before batch N has fully settled.
//!
//! Per-task failures are recorded, not retried: the run always proceeds to
//! the end and the caller reconciles from the [`SyncReport`].

use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tokio::time::sleep;
use tracing::{info, warn};
use urbalex_core::{Rule, RuleStatus};

use crate::SyncError;
use crate::backend::RuleBackend;

/// Tasks issued per batch.
pub const BATCH_SIZE: usize = 10;

/// Pause between consecutive batches; skipped after the final batch.
pub const BATCH_DELAY: Duration = Duration::from_millis(500);

/// The three operations a pending change can become.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOp {
    /// Status-only update to `approved`.
    Approve,
    /// Hard delete.
    Reject,
    /// Full-payload update.
    Modify,
}

impl SyncOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Modify => "modify",
        }
    }
}

impl std::fmt::Display for SyncOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// One unit of work for the synchronizer.
#[derive(Debug, Clone)]
pub struct SyncTask {
    pub op: SyncOp,
    pub rule: Rule,
}

/// Partition pending rules into a flat task list: approvals first, then
/// rejections, then modifications.
///
/// A `proposed` rule is not a valid pending change (the session never
/// registers one); it is skipped with a warning rather than guessed at.
pub fn plan_tasks(pending: impl IntoIterator<Item = Rule>) -> Vec<SyncTask> {
    let mut approvals = Vec::new();
    let mut rejections = Vec::new();
    let mut modifications = Vec::new();

    for rule in pending {
        match rule.status {
            RuleStatus::Approved => approvals.push(SyncTask {
                op: SyncOp::Approve,
                rule,
            }),
            RuleStatus::Rejected => rejections.push(SyncTask {
                op: SyncOp::Reject,
                rule,
            }),
            RuleStatus::Modified => modifications.push(SyncTask {
                op: SyncOp::Modify,
                rule,
            }),
            RuleStatus::Proposed => {
                warn!(rule_id = %rule.id, "proposed rule in pending set, skipping");
            }
        }
    }

    approvals.extend(rejections);
    approvals.extend(modifications);
    approvals
}

/// Result of a single task.
#[derive(Debug)]
pub struct TaskOutcome {
    pub rule_id: String,
    pub op: SyncOp,
    pub result: Result<(), SyncError>,
}

impl TaskOutcome {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

/// Per-task outcomes of a finalize run, in issuance order.
#[derive(Debug)]
pub struct SyncReport {
    pub outcomes: Vec<TaskOutcome>,
    pub batches: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SyncReport {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.total() - self.succeeded_count()
    }

    pub fn any_succeeded(&self) -> bool {
        self.outcomes.iter().any(|o| o.succeeded())
    }

    /// Ids whose task succeeded, in issuance order.
    pub fn succeeded_ids(&self) -> impl Iterator<Item = &str> {
        self.outcomes
            .iter()
            .filter(|o| o.succeeded())
            .map(|o| o.rule_id.as_str())
    }

    /// Ids whose task failed, in issuance order.
    pub fn failed_ids(&self) -> impl Iterator<Item = &str> {
        self.outcomes
            .iter()
            .filter(|o| !o.succeeded())
            .map(|o| o.rule_id.as_str())
    }
}

/// Executes a task list against the backend in paced batches.
pub struct Synchronizer<B> {
    backend: B,
    batch_size: usize,
    batch_delay: Duration,
}

impl<B: RuleBackend> Synchronizer<B> {
    /// Synchronizer with the production pacing ([`BATCH_SIZE`], [`BATCH_DELAY`]).
    pub fn new(backend: B) -> Self {
        Self::with_pacing(backend, BATCH_SIZE, BATCH_DELAY)
    }

    /// Synchronizer with explicit pacing. `batch_size` is clamped to at
    /// least 1.
    pub fn with_pacing(backend: B, batch_size: usize, batch_delay: Duration) -> Self {
        Self {
            backend,
            batch_size: batch_size.max(1),
            batch_delay,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Run the task list to completion and report per-task outcomes.
    ///
    /// Never aborts on task failure: each error is logged, recorded, and the
    /// remaining tasks still run.
    pub async fn run(&self, tasks: Vec<SyncTask>) -> SyncReport {
        let started_at = Utc::now();
        let mut outcomes = Vec::with_capacity(tasks.len());
        let mut batches = 0;

        for (index, batch) in tasks.chunks(self.batch_size).enumerate() {
            if index > 0 {
                sleep(self.batch_delay).await;
            }
            let settled = join_all(batch.iter().map(|task| self.dispatch(task))).await;
            outcomes.extend(settled);
            batches += 1;
            info!(batch = index + 1, size = batch.len(), "batch settled");
        }

        let report = SyncReport {
            outcomes,
            batches,
            started_at,
            finished_at: Utc::now(),
        };
        info!(
            total = report.total(),
            failed = report.failed_count(),
            batches = report.batches,
            "sync run complete"
        );
        report
    }

    async fn dispatch(&self, task: &SyncTask) -> TaskOutcome {
        let result = match task.op {
            SyncOp::Approve => self.backend.approve_rule(&task.rule.id).await,
            SyncOp::Reject => self.backend.delete_rule(&task.rule.id).await,
            SyncOp::Modify => self.backend.update_rule(&task.rule).await,
        };
        if let Err(error) = &result {
            warn!(rule_id = %task.rule.id, op = %task.op, %error, "sync task failed");
        }
        TaskOutcome {
            rule_id: task.rule.id.clone(),
            op: task.op,
            result,
        }
    }
}
