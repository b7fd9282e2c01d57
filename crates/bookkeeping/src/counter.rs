use std::{collections::HashMap, sync::Arc};

use harvestflow_core::{AppError, AppResult};
use harvestflow_storage::{CounterStore, models::PolicyCounter};
use serde::Deserialize;
use serde_json::Value;

use crate::validate;

/// Body of a single counter update.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetHighest {
    pub policy_id: Option<String>,
    pub token_id: Option<Value>,
}

/// One observed (policy, token id) pair in a bulk initialisation batch.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkEntry {
    pub policy_id: Option<String>,
    pub token_id: Option<Value>,
}

impl BulkEntry {
    pub fn new(policy_id: &str, token_id: u64) -> Self {
        Self {
            policy_id: Some(policy_id.to_string()),
            token_id: Some(Value::from(token_id)),
        }
    }

    fn parse(&self) -> Option<(&str, u64)> {
        let policy_id = validate::required("policyId", self.policy_id.as_deref()).ok()?;
        let token_id = validate::token_id(self.token_id.as_ref()?)?;
        Some((policy_id, token_id))
    }
}

/// Tracks the highest issued token id per policy.
#[derive(Clone)]
pub struct TokenCounterService {
    store: Arc<dyn CounterStore>,
}

impl TokenCounterService {
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        Self { store }
    }

    /// Highest token id for the policy, or 0 if none was ever recorded.
    pub async fn get_highest(&self, policy_id: &str) -> AppResult<u64> {
        let policy_id = validate::required("policyId", Some(policy_id))?;
        Ok(self.store.highest(policy_id).await?.unwrap_or(0))
    }

    /// Raise the counter to `candidate`. Lower values are accepted and ignored.
    /// Returns the value stored afterwards.
    pub async fn set_highest(&self, policy_id: &str, candidate: u64) -> AppResult<u64> {
        let policy_id = validate::required("policyId", Some(policy_id))?;
        let stored = self.store.raise_highest(policy_id, candidate).await?;
        tracing::debug!(policy_id, candidate, stored, "Counter updated");
        Ok(stored)
    }

    /// Validate a request body and apply it.
    pub async fn set_from_request(&self, request: &SetHighest) -> AppResult<u64> {
        let policy_id = validate::required("policyId", request.policy_id.as_deref())?;
        let token_id = request
            .token_id
            .as_ref()
            .ok_or_else(|| AppError::validation("tokenId is required"))?;
        let candidate = validate::token_id(token_id)
            .ok_or_else(|| AppError::validation("tokenId must be a non-negative integer"))?;
        self.set_highest(policy_id, candidate).await
    }

    /// Reduce the batch to a maximum per policy and apply each one. Malformed
    /// entries are skipped. Returns the number of policies written.
    pub async fn bulk_initialize(&self, entries: &[BulkEntry]) -> AppResult<usize> {
        let mut highest: HashMap<&str, u64> = HashMap::new();
        for entry in entries {
            match entry.parse() {
                Some((policy_id, token_id)) => {
                    let slot = highest.entry(policy_id).or_insert(token_id);
                    *slot = (*slot).max(token_id);
                }
                None => tracing::debug!(?entry, "Skipping malformed bulk entry"),
            }
        }

        for (policy_id, token_id) in &highest {
            self.store.raise_highest(policy_id, *token_id).await?;
        }

        tracing::info!(
            entries = entries.len(),
            policies = highest.len(),
            "Bulk counter initialisation complete"
        );
        Ok(highest.len())
    }

    /// The id the next mint under this policy should use.
    pub async fn next_token_id(&self, policy_id: &str) -> AppResult<u64> {
        self.get_highest(policy_id)
            .await?
            .checked_add(1)
            .ok_or_else(|| AppError::validation(format!("token ids exhausted for {policy_id}")))
    }

    /// Claim the next id for a mint. Unlike [`Self::next_token_id`] this
    /// advances the counter, so concurrent callers never receive the same id.
    pub async fn reserve_next_token_id(&self, policy_id: &str) -> AppResult<u64> {
        let policy_id = validate::required("policyId", Some(policy_id))?;
        let reserved = self.store.reserve_next(policy_id).await?;
        if reserved > validate::MAX_TOKEN_ID {
            return Err(AppError::validation(format!("token ids exhausted for {policy_id}")));
        }
        tracing::debug!(policy_id, reserved, "Token id reserved");
        Ok(reserved)
    }

    pub async fn list_counters(&self) -> AppResult<Vec<PolicyCounter>> {
        self.store.all_counters().await
    }
}
