use async_trait::async_trait;
use harvestflow_core::{AppError, AppResult};
use sqlx::PgPool;

use crate::{models::*, repos, store::*};

/// PostgreSQL-backed store over the tables created by `migrations/`.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Token ids are `BIGINT` in the schema.
fn db_id(token_id: u64) -> AppResult<i64> {
    i64::try_from(token_id)
        .map_err(|_| AppError::validation(format!("token id {token_id} is out of range")))
}

#[async_trait]
impl CounterStore for PgStore {
    async fn highest(&self, policy_id: &str) -> AppResult<Option<u64>> {
        let value = repos::get_policy_counter(&self.pool, policy_id)
            .await
            .map_err(AppError::storage)?;
        Ok(value.map(|v| v.max(0) as u64))
    }

    async fn raise_highest(&self, policy_id: &str, candidate: u64) -> AppResult<u64> {
        let stored = repos::raise_policy_counter(&self.pool, policy_id, db_id(candidate)?)
            .await
            .map_err(AppError::storage)?;
        Ok(stored.max(0) as u64)
    }

    async fn reserve_next(&self, policy_id: &str) -> AppResult<u64> {
        let reserved = repos::reserve_policy_counter(&self.pool, policy_id)
            .await
            .map_err(AppError::storage)?;
        Ok(reserved.max(0) as u64)
    }

    async fn all_counters(&self) -> AppResult<Vec<PolicyCounter>> {
        let rows = repos::get_all_policy_counters(&self.pool)
            .await
            .map_err(AppError::storage)?;
        Ok(rows.into_iter().map(PolicyCounter::from).collect())
    }
}

#[async_trait]
impl StatusStore for PgStore {
    async fn get_status(
        &self,
        project_id: &str,
        token_id: u64,
    ) -> AppResult<Option<NftStatusRecord>> {
        repos::get_nft_status(&self.pool, project_id, db_id(token_id)?)
            .await
            .map_err(AppError::storage)?
            .map(NftStatusRecord::try_from)
            .transpose()
    }

    async fn put_status(&self, record: &NftStatusRecord) -> AppResult<()> {
        repos::upsert_nft_status(&self.pool, record, db_id(record.token_id)?)
            .await
            .map_err(AppError::storage)
    }

    async fn statuses_by_owner(&self, owner: &str) -> AppResult<Vec<NftStatusRecord>> {
        repos::get_nfts_by_owner(&self.pool, owner)
            .await
            .map_err(AppError::storage)?
            .into_iter()
            .map(NftStatusRecord::try_from)
            .collect()
    }

    async fn project_statuses(&self, project_id: &str) -> AppResult<Vec<NftStatusRecord>> {
        repos::get_project_nfts(&self.pool, project_id)
            .await
            .map_err(AppError::storage)?
            .into_iter()
            .map(NftStatusRecord::try_from)
            .collect()
    }
}

#[async_trait]
impl EventStore for PgStore {
    async fn insert_event(&self, event: &NewTokenEvent) -> AppResult<TokenEvent> {
        let token_ids = event
            .token_ids
            .iter()
            .map(|&id| db_id(id))
            .collect::<AppResult<Vec<_>>>()?;

        let row = repos::insert_token_event(&self.pool, event, &token_ids)
            .await
            .map_err(AppError::storage)?;
        TokenEvent::try_from(row)
    }

    async fn query_events(&self, filter: &EventFilter) -> AppResult<Vec<TokenEvent>> {
        repos::get_token_events(&self.pool, filter)
            .await
            .map_err(AppError::storage)?
            .into_iter()
            .map(TokenEvent::try_from)
            .collect()
    }
}
