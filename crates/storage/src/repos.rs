use sqlx::{Executor, PgPool, Postgres, QueryBuilder};

use crate::models::*;

// ─── Policy Counter Queries ─────────────────────────────────────────────────

/// Get the highest token id recorded for a policy.
pub async fn get_policy_counter(pool: &PgPool, policy_id: &str) -> Result<Option<i64>, sqlx::Error> {
    let row: Option<(i64,)> =
        sqlx::query_as("SELECT highest_token_id FROM policy_counters WHERE policy_id = $1")
            .bind(policy_id)
            .fetch_optional(pool)
            .await?;
    Ok(row.map(|r| r.0))
}

/// Raise a policy counter to `candidate` if it is higher, creating the row if
/// missing. Returns the value stored afterwards.
pub async fn raise_policy_counter<'e, E>(
    executor: E,
    policy_id: &str,
    candidate: i64,
) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let row: (i64,) = sqlx::query_as(
        r#"
        INSERT INTO policy_counters (policy_id, highest_token_id)
        VALUES ($1, $2)
        ON CONFLICT (policy_id) DO UPDATE
        SET highest_token_id = GREATEST(policy_counters.highest_token_id, EXCLUDED.highest_token_id),
            updated_at = NOW()
        RETURNING highest_token_id
        "#,
    )
    .bind(policy_id)
    .bind(candidate)
    .fetch_one(executor)
    .await?;
    Ok(row.0)
}

/// Increment a policy counter in place and return the claimed id. A missing
/// counter starts at 1.
pub async fn reserve_policy_counter<'e, E>(executor: E, policy_id: &str) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let row: (i64,) = sqlx::query_as(
        r#"
        INSERT INTO policy_counters (policy_id, highest_token_id)
        VALUES ($1, 1)
        ON CONFLICT (policy_id) DO UPDATE
        SET highest_token_id = policy_counters.highest_token_id + 1,
            updated_at = NOW()
        RETURNING highest_token_id
        "#,
    )
    .bind(policy_id)
    .fetch_one(executor)
    .await?;
    Ok(row.0)
}

/// Get every policy counter.
pub async fn get_all_policy_counters(pool: &PgPool) -> Result<Vec<PolicyCounterRow>, sqlx::Error> {
    sqlx::query_as::<_, PolicyCounterRow>(
        "SELECT policy_id, highest_token_id FROM policy_counters ORDER BY policy_id",
    )
    .fetch_all(pool)
    .await
}

// ─── NFT Status Queries ─────────────────────────────────────────────────────

const STATUS_COLUMNS: &str = "project_id, token_id, asset_name, policy_id, status, tx_hash, minted_at, owner, created_at, updated_at";

/// Get a single NFT status by key.
pub async fn get_nft_status(
    pool: &PgPool,
    project_id: &str,
    token_id: i64,
) -> Result<Option<NftStatusRow>, sqlx::Error> {
    sqlx::query_as::<_, NftStatusRow>(&format!(
        "SELECT {STATUS_COLUMNS} FROM nft_statuses WHERE project_id = $1 AND token_id = $2"
    ))
    .bind(project_id)
    .bind(token_id)
    .fetch_optional(pool)
    .await
}

/// Insert or overwrite an NFT status. The row keeps its original `id` so
/// insertion order survives updates.
pub async fn upsert_nft_status<'e, E>(
    executor: E,
    record: &NftStatusRecord,
    token_id: i64,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        r#"
        INSERT INTO nft_statuses (project_id, token_id, asset_name, policy_id, status, tx_hash, minted_at, owner, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ON CONFLICT (project_id, token_id) DO UPDATE
        SET asset_name = $3,
            policy_id = $4,
            status = $5,
            tx_hash = $6,
            minted_at = $7,
            owner = $8,
            updated_at = $10
        "#,
    )
    .bind(&record.project_id)
    .bind(token_id)
    .bind(&record.asset_name)
    .bind(&record.policy_id)
    .bind(record.status.as_str())
    .bind(&record.tx_hash)
    .bind(record.minted_at)
    .bind(&record.owner)
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(executor)
    .await?;
    Ok(())
}

/// Get all NFTs held by an owner, oldest first.
pub async fn get_nfts_by_owner(pool: &PgPool, owner: &str) -> Result<Vec<NftStatusRow>, sqlx::Error> {
    sqlx::query_as::<_, NftStatusRow>(&format!(
        "SELECT {STATUS_COLUMNS} FROM nft_statuses WHERE owner = $1 ORDER BY id"
    ))
    .bind(owner)
    .fetch_all(pool)
    .await
}

/// Get all NFTs of a project, oldest first.
pub async fn get_project_nfts(pool: &PgPool, project_id: &str) -> Result<Vec<NftStatusRow>, sqlx::Error> {
    sqlx::query_as::<_, NftStatusRow>(&format!(
        "SELECT {STATUS_COLUMNS} FROM nft_statuses WHERE project_id = $1 ORDER BY id"
    ))
    .bind(project_id)
    .fetch_all(pool)
    .await
}

// ─── Token Event Queries ────────────────────────────────────────────────────

/// Append one token event and return the stored row.
pub async fn insert_token_event<'e, E>(
    executor: E,
    event: &NewTokenEvent,
    token_ids: &[i64],
) -> Result<TokenEventRow, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as::<_, TokenEventRow>(
        r#"
        INSERT INTO token_events (wallet_address, project_id, token_ids, amount, event, tx_hash)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, wallet_address, project_id, token_ids, amount, event, tx_hash, created_at
        "#,
    )
    .bind(&event.wallet_address)
    .bind(&event.project_id)
    .bind(token_ids)
    .bind(&event.amount)
    .bind(event.event.as_str())
    .bind(&event.tx_hash)
    .fetch_one(executor)
    .await
}

/// Get events for a wallet, optionally narrowed by project and kind, newest first.
pub async fn get_token_events(
    pool: &PgPool,
    filter: &EventFilter,
) -> Result<Vec<TokenEventRow>, sqlx::Error> {
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
        "SELECT id, wallet_address, project_id, token_ids, amount, event, tx_hash, created_at FROM token_events WHERE wallet_address = ",
    );
    qb.push_bind(&filter.wallet_address);

    if let Some(project_id) = &filter.project_id {
        qb.push(" AND project_id = ").push_bind(project_id);
    }
    if let Some(kind) = filter.event {
        qb.push(" AND event = ").push_bind(kind.as_str());
    }

    qb.push(" ORDER BY created_at DESC, id DESC");

    if let Some(limit) = filter.limit {
        qb.push(" LIMIT ").push_bind(i64::from(limit));
    }

    qb.build_query_as::<TokenEventRow>().fetch_all(pool).await
}
