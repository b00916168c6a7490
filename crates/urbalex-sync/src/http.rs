//! HTTP client for the reglas gateway.

use async_trait::async_trait;
use serde_json::json;
use tracing::info;
use urbalex_core::{Rule, RuleStatus};

use crate::SyncError;
use crate::backend::RuleBackend;

/// HTTP client for the gateway's `/api/reglas` endpoints.
pub struct RuleApi {
    client: reqwest::Client,
    base_url: String,
}

impl RuleApi {
    /// Create a new client for the given gateway base URL.
    ///
    /// `base_url` should be like `https://admin.urbalex.io` (no trailing
    /// slash).
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn collection_url(&self) -> String {
        format!("{}/api/reglas", self.base_url)
    }

    fn rule_url(&self, id: &str) -> String {
        format!("{}/api/reglas/{}", self.base_url, id)
    }
}

async fn ensure_success(resp: reqwest::Response) -> Result<reqwest::Response, SyncError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(SyncError::Server {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl RuleBackend for RuleApi {
    async fn fetch_rules(
        &self,
        status: RuleStatus,
        category: Option<&str>,
    ) -> Result<Vec<Rule>, SyncError> {
        let url = self.collection_url();
        let mut query: Vec<(&str, String)> = vec![("estado", status.as_str().to_string())];
        if let Some(category) = category {
            query.push(("categoria", category.to_string()));
        }

        info!(url = %url, estado = %status, "fetching rules");
        let resp = self.client.get(&url).query(&query).send().await?;
        let rules: Vec<Rule> = ensure_success(resp).await?.json().await?;
        info!(count = rules.len(), "fetched rules");
        Ok(rules)
    }

    async fn approve_rule(&self, id: &str) -> Result<(), SyncError> {
        let url = self.rule_url(id);
        info!(url = %url, "approving rule");
        let resp = self
            .client
            .put(&url)
            .json(&json!({ "status": RuleStatus::Approved.as_str() }))
            .send()
            .await?;
        ensure_success(resp).await?;
        Ok(())
    }

    async fn update_rule(&self, rule: &Rule) -> Result<(), SyncError> {
        let url = self.rule_url(&rule.id);
        info!(url = %url, "updating rule");
        let resp = self.client.put(&url).json(rule).send().await?;
        ensure_success(resp).await?;
        Ok(())
    }

    async fn delete_rule(&self, id: &str) -> Result<(), SyncError> {
        let url = self.rule_url(id);
        info!(url = %url, "deleting rule");
        let resp = self.client.delete(&url).send().await?;
        ensure_success(resp).await?;
        Ok(())
    }
}
