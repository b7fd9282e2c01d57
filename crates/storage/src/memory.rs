use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use harvestflow_core::AppResult;
use tokio::sync::RwLock;

use crate::{models::*, store::*};

/// Process-local store. Each call holds the lock for its whole
/// read-modify-write, so a single `raise_highest` never loses a value.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    counters: BTreeMap<String, u64>,
    /// Insertion order; `status_index` points into it.
    statuses: Vec<NftStatusRecord>,
    status_index: HashMap<(String, u64), usize>,
    events: Vec<TokenEvent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CounterStore for MemoryStore {
    async fn highest(&self, policy_id: &str) -> AppResult<Option<u64>> {
        Ok(self.inner.read().await.counters.get(policy_id).copied())
    }

    async fn raise_highest(&self, policy_id: &str, candidate: u64) -> AppResult<u64> {
        let mut inner = self.inner.write().await;
        let stored = inner.counters.entry(policy_id.to_string()).or_insert(0);
        *stored = (*stored).max(candidate);
        Ok(*stored)
    }

    async fn reserve_next(&self, policy_id: &str) -> AppResult<u64> {
        let mut inner = self.inner.write().await;
        let stored = inner.counters.entry(policy_id.to_string()).or_insert(0);
        *stored += 1;
        Ok(*stored)
    }

    async fn all_counters(&self) -> AppResult<Vec<PolicyCounter>> {
        let inner = self.inner.read().await;
        Ok(inner
            .counters
            .iter()
            .map(|(policy_id, &highest_token_id)| PolicyCounter {
                policy_id: policy_id.clone(),
                highest_token_id,
            })
            .collect())
    }
}

#[async_trait]
impl StatusStore for MemoryStore {
    async fn get_status(
        &self,
        project_id: &str,
        token_id: u64,
    ) -> AppResult<Option<NftStatusRecord>> {
        let inner = self.inner.read().await;
        Ok(inner
            .status_index
            .get(&(project_id.to_string(), token_id))
            .map(|&pos| inner.statuses[pos].clone()))
    }

    async fn put_status(&self, record: &NftStatusRecord) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        let key = (record.project_id.clone(), record.token_id);
        match inner.status_index.get(&key).copied() {
            Some(pos) => inner.statuses[pos] = record.clone(),
            None => {
                let pos = inner.statuses.len();
                inner.statuses.push(record.clone());
                inner.status_index.insert(key, pos);
            }
        }
        Ok(())
    }

    async fn statuses_by_owner(&self, owner: &str) -> AppResult<Vec<NftStatusRecord>> {
        let inner = self.inner.read().await;
        Ok(inner
            .statuses
            .iter()
            .filter(|r| r.owner.as_deref() == Some(owner))
            .cloned()
            .collect())
    }

    async fn project_statuses(&self, project_id: &str) -> AppResult<Vec<NftStatusRecord>> {
        let inner = self.inner.read().await;
        Ok(inner
            .statuses
            .iter()
            .filter(|r| r.project_id == project_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn insert_event(&self, event: &NewTokenEvent) -> AppResult<TokenEvent> {
        let mut inner = self.inner.write().await;
        let stored = TokenEvent {
            id: inner.events.len() as i64 + 1,
            wallet_address: event.wallet_address.clone(),
            project_id: event.project_id.clone(),
            token_ids: event.token_ids.clone(),
            amount: event.amount.clone(),
            event: event.event,
            tx_hash: event.tx_hash.clone(),
            created_at: Utc::now(),
        };
        inner.events.push(stored.clone());
        Ok(stored)
    }

    async fn query_events(&self, filter: &EventFilter) -> AppResult<Vec<TokenEvent>> {
        let inner = self.inner.read().await;
        let limit = filter.limit.map_or(usize::MAX, |l| l as usize);
        Ok(inner
            .events
            .iter()
            .rev()
            .filter(|e| filter.matches(e))
            .take(limit)
            .cloned()
            .collect())
    }
}
