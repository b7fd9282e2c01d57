//! Storage seams the bookkeeping services are written against.
//!
//! # Implementations
//!
//! - [`MemoryStore`](crate::memory::MemoryStore): process-local, lost on restart
//! - [`PgStore`](crate::postgres::PgStore): PostgreSQL tables from `migrations/`

use async_trait::async_trait;
use harvestflow_core::AppResult;

use crate::models::*;

/// Per-policy highest token id.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Returns `None` if nothing has been recorded for the policy.
    async fn highest(&self, policy_id: &str) -> AppResult<Option<u64>>;

    /// Store `max(stored, candidate)` and return the value now stored.
    ///
    /// Creates the counter if it doesn't exist.
    async fn raise_highest(&self, policy_id: &str, candidate: u64) -> AppResult<u64>;

    /// Atomically advance the counter by one and return the new value,
    /// creating the counter at 1 if it doesn't exist.
    async fn reserve_next(&self, policy_id: &str) -> AppResult<u64>;

    /// All counters, ordered by policy id.
    async fn all_counters(&self) -> AppResult<Vec<PolicyCounter>>;
}

/// NFT mint status records keyed by (project_id, token_id).
#[async_trait]
pub trait StatusStore: Send + Sync {
    async fn get_status(&self, project_id: &str, token_id: u64)
    -> AppResult<Option<NftStatusRecord>>;

    /// Insert or replace the record for its key, keeping the original
    /// insertion position.
    async fn put_status(&self, record: &NftStatusRecord) -> AppResult<()>;

    /// Records owned by `owner`, in insertion order.
    async fn statuses_by_owner(&self, owner: &str) -> AppResult<Vec<NftStatusRecord>>;

    /// Records of one project, in insertion order.
    async fn project_statuses(&self, project_id: &str) -> AppResult<Vec<NftStatusRecord>>;
}

/// Append-only token event log.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn insert_event(&self, event: &NewTokenEvent) -> AppResult<TokenEvent>;

    /// Matching events, newest first.
    async fn query_events(&self, filter: &EventFilter) -> AppResult<Vec<TokenEvent>>;
}
