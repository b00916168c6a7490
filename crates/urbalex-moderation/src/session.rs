//! The admin's review session over one fetched working set.
//!
//! All moderation is optimistic: actions mutate the displayed list
//! immediately and record intent in the [`DiffStore`]; nothing reaches the
//! backend until [`finalize`](ReviewSession::finalize).
//!
//! Diff membership invariant: a rule has an entry iff its displayed status
//! differs from its status at load time (the baseline), or it was edited in
//! this fetch cycle. The entry always agrees with the displayed status.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::info;
use urbalex_core::{Rule, RulePatch, RuleStatus, group_by_category};
use urbalex_sync::{RuleBackend, SyncReport, Synchronizer, plan_tasks};

use crate::diff::DiffStore;
use crate::error::ModerationError;
use crate::events::{EventBus, RULES_UPDATED};

pub struct ReviewSession<B> {
    sync: Synchronizer<B>,
    bus: EventBus,
    rules: Vec<Rule>,
    /// Status each rule had when the working set was loaded.
    baseline: HashMap<String, RuleStatus>,
    /// Ids edited in this fetch cycle; an edit always counts as pending.
    edited: HashSet<String>,
    diff: DiffStore,
}

impl<B: RuleBackend> ReviewSession<B> {
    pub fn new(backend: B, bus: EventBus) -> Self {
        Self::with_synchronizer(Synchronizer::new(backend), bus)
    }

    /// Session over a synchronizer with non-default pacing.
    pub fn with_synchronizer(sync: Synchronizer<B>, bus: EventBus) -> Self {
        Self {
            sync,
            bus,
            rules: Vec::new(),
            baseline: HashMap::new(),
            edited: HashSet::new(),
            diff: DiffStore::new(),
        }
    }

    /// Replace the working set with a fresh fetch.
    ///
    /// On failure the current list and diff store stay untouched. On
    /// success pending intent from the previous cycle is discarded along
    /// with the old list.
    pub async fn load(
        &mut self,
        status: RuleStatus,
        category: Option<&str>,
    ) -> Result<usize, ModerationError> {
        let rules = self.sync.backend().fetch_rules(status, category).await?;
        self.baseline = rules.iter().map(|r| (r.id.clone(), r.status)).collect();
        self.edited.clear();
        self.diff.clear();
        let count = rules.len();
        self.rules = rules;
        info!(count, estado = %status, "loaded working set");
        Ok(count)
    }

    /// The displayed list, in fetch order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// The displayed list filtered and partitioned by category.
    pub fn grouped(&self, text_filter: &str) -> BTreeMap<String, Vec<&Rule>> {
        group_by_category(&self.rules, text_filter)
    }

    pub fn diff(&self) -> &DiffStore {
        &self.diff
    }

    /// Count shown on the finalize affordance.
    pub fn pending_count(&self) -> usize {
        self.diff.len()
    }

    pub fn is_dirty(&self) -> bool {
        !self.diff.is_empty()
    }

    /// Mark a rule approved. Returns `false` for an unknown id.
    pub fn approve(&mut self, id: &str) -> bool {
        self.set_status(id, RuleStatus::Approved)
    }

    /// Mark a rule rejected. Returns `false` for an unknown id.
    pub fn reject(&mut self, id: &str) -> bool {
        self.set_status(id, RuleStatus::Rejected)
    }

    /// Approve every displayed rule not already approved. Returns how many
    /// rules changed.
    pub fn approve_all(&mut self) -> usize {
        self.set_status_all(RuleStatus::Approved)
    }

    /// Reject every displayed rule not already rejected. Returns how many
    /// rules changed.
    pub fn reject_all(&mut self) -> usize {
        self.set_status_all(RuleStatus::Rejected)
    }

    /// Merge an edit-form payload into a rule and force it `modified`.
    ///
    /// An edit always registers as a pending change, even when every field
    /// is unchanged, and overwrites any earlier approve/reject intent for
    /// the same id. Returns the updated rule.
    pub fn edit_and_save(&mut self, id: &str, patch: RulePatch) -> Result<Rule, ModerationError> {
        let rule = self
            .rules
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| ModerationError::UnknownRule(id.to_string()))?;
        rule.apply_patch(patch);
        rule.status = RuleStatus::Modified;
        let updated = rule.clone();
        self.edited.insert(updated.id.clone());
        self.diff.upsert(updated.clone());
        Ok(updated)
    }

    /// Drain the diff store to the backend in paced batches and reconcile.
    ///
    /// Only rules whose task succeeded leave the displayed list and the
    /// diff store; failed intent survives for a retry. Publishes
    /// [`RULES_UPDATED`] when at least one change persisted.
    pub async fn finalize(&mut self) -> Result<SyncReport, ModerationError> {
        if self.diff.is_empty() {
            return Err(ModerationError::NothingPending);
        }
        info!(pending = self.diff.len(), "finalizing review");

        let pending: Vec<Rule> = self.diff.values().cloned().collect();
        let report = self.sync.run(plan_tasks(pending)).await;

        let succeeded: HashSet<String> = report.succeeded_ids().map(str::to_string).collect();
        self.rules.retain(|r| !succeeded.contains(&r.id));
        for id in &succeeded {
            self.diff.remove(id);
            self.edited.remove(id);
            self.baseline.remove(id);
        }

        if report.any_succeeded() {
            self.bus.publish(RULES_UPDATED);
        }
        Ok(report)
    }

    fn set_status(&mut self, id: &str, target: RuleStatus) -> bool {
        let Some(rule) = self.rules.iter_mut().find(|r| r.id == id) else {
            return false;
        };
        rule.status = target;
        let current = rule.clone();
        self.reconcile(current);
        true
    }

    fn set_status_all(&mut self, target: RuleStatus) -> usize {
        let ids: Vec<String> = self
            .rules
            .iter()
            .filter(|r| r.status != target)
            .map(|r| r.id.clone())
            .collect();
        for id in &ids {
            self.set_status(id, target);
        }
        ids.len()
    }

    /// Re-derive diff membership for a rule from the invariant.
    fn reconcile(&mut self, rule: Rule) {
        let dirty = self.edited.contains(&rule.id)
            || self.baseline.get(&rule.id).copied() != Some(rule.status);
        if dirty {
            self.diff.upsert(rule);
        } else {
            self.diff.remove(&rule.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;
    use urbalex_sync::{SyncError, SyncOp};

    fn rule(id: &str, status: RuleStatus, category: Option<&str>) -> Rule {
        Rule {
            id: id.into(),
            title: format!("regla {id}"),
            description: String::new(),
            category: category.map(Into::into),
            status,
            key_parameters: vec![],
            document_version: "v1".into(),
            condition: None,
        }
    }

    /// Serves a canned working set; fails listed ids on write, or the
    /// whole fetch on demand.
    #[derive(Default)]
    struct MockBackend {
        served: Vec<Rule>,
        fail_fetch: AtomicBool,
        fail_ids: Vec<String>,
        calls: Mutex<Vec<(SyncOp, String)>>,
    }

    impl MockBackend {
        fn serving(rules: Vec<Rule>) -> Self {
            Self {
                served: rules,
                ..Default::default()
            }
        }

        fn write(&self, op: SyncOp, id: &str) -> Result<(), SyncError> {
            self.calls.lock().unwrap().push((op, id.to_string()));
            if self.fail_ids.iter().any(|f| f == id) {
                return Err(SyncError::Server {
                    status: 503,
                    body: "rate limited".into(),
                });
            }
            Ok(())
        }
    }

    #[async_trait]
    impl RuleBackend for MockBackend {
        async fn fetch_rules(
            &self,
            _status: RuleStatus,
            _category: Option<&str>,
        ) -> Result<Vec<Rule>, SyncError> {
            if self.fail_fetch.load(Ordering::SeqCst) {
                return Err(SyncError::Server {
                    status: 500,
                    body: "down".into(),
                });
            }
            Ok(self.served.clone())
        }

        async fn approve_rule(&self, id: &str) -> Result<(), SyncError> {
            self.write(SyncOp::Approve, id)
        }

        async fn update_rule(&self, rule: &Rule) -> Result<(), SyncError> {
            self.write(SyncOp::Modify, &rule.id)
        }

        async fn delete_rule(&self, id: &str) -> Result<(), SyncError> {
            self.write(SyncOp::Reject, id)
        }
    }

    fn session_with(backend: MockBackend) -> ReviewSession<MockBackend> {
        // zero inter-batch delay keeps the tests fast
        ReviewSession::with_synchronizer(
            Synchronizer::with_pacing(backend, 10, Duration::ZERO),
            EventBus::new(),
        )
    }

    async fn loaded_session(rules: Vec<Rule>) -> ReviewSession<MockBackend> {
        let mut session = session_with(MockBackend::serving(rules));
        session.load(RuleStatus::Proposed, None).await.unwrap();
        session
    }

    fn proposed(ids: &[&str]) -> Vec<Rule> {
        ids.iter()
            .map(|id| rule(id, RuleStatus::Proposed, None))
            .collect()
    }

    #[tokio::test]
    async fn approve_reject_approve_leaves_one_approved_entry() {
        let mut session = loaded_session(proposed(&["r1"])).await;
        session.approve("r1");
        session.reject("r1");
        session.approve("r1");

        assert_eq!(session.pending_count(), 1);
        assert_eq!(session.diff().get("r1").unwrap().status, RuleStatus::Approved);
        assert_eq!(session.rules()[0].status, RuleStatus::Approved);
    }

    #[tokio::test]
    async fn edit_registers_even_when_fields_are_unchanged() {
        let mut session = loaded_session(proposed(&["r1"])).await;
        assert_eq!(session.pending_count(), 0);

        let updated = session.edit_and_save("r1", RulePatch::default()).unwrap();
        assert_eq!(updated.status, RuleStatus::Modified);
        assert_eq!(session.pending_count(), 1);
        assert_eq!(session.diff().get("r1").unwrap().status, RuleStatus::Modified);
        // optimistic: the displayed list shows it immediately
        assert_eq!(session.rules()[0].status, RuleStatus::Modified);
    }

    #[tokio::test]
    async fn edit_overwrites_prior_approve_intent() {
        let mut session = loaded_session(proposed(&["r1"])).await;
        session.approve("r1");
        session
            .edit_and_save(
                "r1",
                RulePatch {
                    title: Some("Altura máxima corregida".into()),
                    ..Default::default()
                },
            )
            .unwrap();

        let entry = session.diff().get("r1").unwrap();
        assert_eq!(entry.status, RuleStatus::Modified);
        assert_eq!(entry.title, "Altura máxima corregida");
        assert_eq!(session.pending_count(), 1);
    }

    #[tokio::test]
    async fn approve_all_is_idempotent() {
        let mut session = loaded_session(proposed(&["r1", "r2", "r3"])).await;
        session.reject("r2");

        assert_eq!(session.approve_all(), 3);
        let statuses: Vec<RuleStatus> = session.rules().iter().map(|r| r.status).collect();
        let pending = session.pending_count();

        assert_eq!(session.approve_all(), 0);
        assert_eq!(
            session.rules().iter().map(|r| r.status).collect::<Vec<_>>(),
            statuses
        );
        assert_eq!(session.pending_count(), pending);
        assert!(statuses.iter().all(|s| *s == RuleStatus::Approved));
    }

    #[tokio::test]
    async fn moderating_back_to_baseline_unregisters() {
        let mut session = loaded_session(vec![rule("r1", RuleStatus::Approved, None)]).await;
        session.reject("r1");
        assert_eq!(session.pending_count(), 1);

        session.approve("r1");
        assert_eq!(session.pending_count(), 0);
        assert_eq!(session.rules()[0].status, RuleStatus::Approved);
    }

    #[tokio::test]
    async fn unknown_id_is_a_noop() {
        let mut session = loaded_session(proposed(&["r1"])).await;
        assert!(!session.approve("nope"));
        assert!(!session.reject("nope"));
        assert!(matches!(
            session.edit_and_save("nope", RulePatch::default()),
            Err(ModerationError::UnknownRule(_))
        ));
        assert_eq!(session.pending_count(), 0);
    }

    #[tokio::test]
    async fn finalize_without_pending_changes_errors() {
        let mut session = loaded_session(proposed(&["r1"])).await;
        assert!(matches!(
            session.finalize().await,
            Err(ModerationError::NothingPending)
        ));
    }

    #[tokio::test]
    async fn finalize_clears_store_and_view_on_success() {
        let mut session = loaded_session(proposed(&["r1", "r2", "r3", "r4"])).await;
        session.approve("r1");
        session.reject("r2");
        session.edit_and_save("r3", RulePatch::default()).unwrap();

        let report = session.finalize().await.unwrap();
        assert_eq!(report.total(), 3);
        assert_eq!(report.failed_count(), 0);

        assert!(!session.is_dirty());
        let ids: Vec<&str> = session.rules().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["r4"]);
    }

    #[tokio::test]
    async fn finalize_issues_delete_for_rejections() {
        let mut session = loaded_session(proposed(&["r1", "r2"])).await;
        session.approve("r1");
        session.reject("r2");
        session.finalize().await.unwrap();

        let calls = session.sync.backend().calls.lock().unwrap();
        assert!(calls.contains(&(SyncOp::Approve, "r1".into())));
        assert!(calls.contains(&(SyncOp::Reject, "r2".into())));
    }

    #[tokio::test]
    async fn finalize_keeps_failed_entries_for_retry() {
        let mut backend = MockBackend::serving(proposed(&["r1", "r2"]));
        backend.fail_ids = vec!["r2".into()];
        let mut session = session_with(backend);
        session.load(RuleStatus::Proposed, None).await.unwrap();
        session.approve("r1");
        session.approve("r2");

        let report = session.finalize().await.unwrap();
        assert_eq!(report.succeeded_count(), 1);
        assert_eq!(report.failed_count(), 1);

        // the failed intent survives, the succeeded one is gone
        assert_eq!(session.pending_count(), 1);
        assert!(session.diff().contains("r2"));
        let ids: Vec<&str> = session.rules().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["r2"]);
    }

    #[tokio::test]
    async fn finalize_publishes_rules_updated() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe(RULES_UPDATED);
        let mut session = ReviewSession::with_synchronizer(
            Synchronizer::with_pacing(
                MockBackend::serving(proposed(&["r1"])),
                10,
                Duration::ZERO,
            ),
            bus,
        );
        session.load(RuleStatus::Proposed, None).await.unwrap();
        session.approve("r1");
        session.finalize().await.unwrap();
        assert!(sub.notified().await);
    }

    #[tokio::test]
    async fn all_tasks_failing_publishes_nothing() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe(RULES_UPDATED);
        let mut backend = MockBackend::serving(proposed(&["r1"]));
        backend.fail_ids = vec!["r1".into()];
        let mut session = ReviewSession::with_synchronizer(
            Synchronizer::with_pacing(backend, 10, Duration::ZERO),
            bus,
        );
        session.load(RuleStatus::Proposed, None).await.unwrap();
        session.approve("r1");
        session.finalize().await.unwrap();
        assert!(!sub.try_notified());
        assert_eq!(session.pending_count(), 1);
    }

    #[tokio::test]
    async fn reload_discards_pending_intent() {
        let mut session = loaded_session(proposed(&["r1"])).await;
        session.approve("r1");
        assert!(session.is_dirty());

        session.load(RuleStatus::Proposed, None).await.unwrap();
        assert!(!session.is_dirty());
        assert_eq!(session.rules()[0].status, RuleStatus::Proposed);
    }

    #[tokio::test]
    async fn failed_load_leaves_the_list_untouched() {
        let mut session = loaded_session(proposed(&["r1"])).await;
        session.approve("r1");

        session.sync.backend().fail_fetch.store(true, Ordering::SeqCst);
        assert!(session.load(RuleStatus::Proposed, None).await.is_err());

        // previous working set and pending intent both survive
        assert_eq!(session.rules()[0].id, "r1");
        assert_eq!(session.rules()[0].status, RuleStatus::Approved);
        assert!(session.is_dirty());
    }

    #[tokio::test]
    async fn grouped_view_follows_displayed_list() {
        let mut session = loaded_session(vec![
            rule("r1", RuleStatus::Proposed, Some("alturas")),
            rule("r2", RuleStatus::Proposed, None),
        ])
        .await;
        session.approve("r1");

        let groups = session.grouped("");
        assert_eq!(groups["alturas"][0].status, RuleStatus::Approved);
        assert_eq!(groups["uncategorized"][0].id, "r2");
    }
}
