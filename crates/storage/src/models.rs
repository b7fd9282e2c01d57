use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use harvestflow_core::AppError;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ─── Policy Counter ─────────────────────────────────────────────────────────

/// Highest token id observed or issued under one policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyCounter {
    pub policy_id: String,
    pub highest_token_id: u64,
}

#[derive(Debug, Clone, FromRow)]
pub struct PolicyCounterRow {
    pub policy_id: String,
    pub highest_token_id: i64,
}

impl From<PolicyCounterRow> for PolicyCounter {
    fn from(row: PolicyCounterRow) -> Self {
        Self {
            policy_id: row.policy_id,
            highest_token_id: row.highest_token_id.max(0) as u64,
        }
    }
}

// ─── NFT Status ─────────────────────────────────────────────────────────────

/// Lifecycle of one token's on-chain issuance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NftStatus {
    #[default]
    Pending,
    Minted,
    Failed,
}

impl NftStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Minted => "minted",
            Self::Failed => "failed",
        }
    }

    /// `minted` and `failed` have no outgoing transitions.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for NftStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NftStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "minted" => Ok(Self::Minted),
            "failed" => Ok(Self::Failed),
            other => Err(AppError::validation(format!("unknown status `{other}`"))),
        }
    }
}

/// Mint bookkeeping for one NFT, keyed by (project_id, token_id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NftStatusRecord {
    pub project_id: String,
    pub token_id: u64,
    pub asset_name: String,
    pub policy_id: String,
    pub status: NftStatus,
    pub tx_hash: Option<String>,
    pub minted_at: Option<DateTime<Utc>>,
    pub owner: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct NftStatusRow {
    pub project_id: String,
    pub token_id: i64,
    pub asset_name: String,
    pub policy_id: String,
    pub status: String,
    pub tx_hash: Option<String>,
    pub minted_at: Option<DateTime<Utc>>,
    pub owner: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<NftStatusRow> for NftStatusRecord {
    type Error = AppError;

    fn try_from(row: NftStatusRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse()
            .map_err(|_| AppError::Storage(format!("corrupt status `{}`", row.status)))?;
        Ok(Self {
            project_id: row.project_id,
            token_id: row.token_id.max(0) as u64,
            asset_name: row.asset_name,
            policy_id: row.policy_id,
            status,
            tx_hash: row.tx_hash,
            minted_at: row.minted_at,
            owner: row.owner,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Aggregate mint figures for one project.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStats {
    pub total_minted: u64,
    pub last_token_id: u64,
    pub next_token_id: u64,
    /// Newest first.
    pub recent_mints: Vec<NftStatusRecord>,
}

// ─── Token Event ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Mint,
    Harvest,
    Claim,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mint => "mint",
            Self::Harvest => "harvest",
            Self::Claim => "claim",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mint" => Ok(Self::Mint),
            "harvest" => Ok(Self::Harvest),
            "claim" => Ok(Self::Claim),
            other => Err(AppError::validation(format!(
                "event must be one of mint, harvest, claim (got `{other}`)"
            ))),
        }
    }
}

/// An immutable record of a wallet's interaction with some tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenEvent {
    pub id: i64,
    pub wallet_address: String,
    pub project_id: String,
    pub token_ids: Vec<u64>,
    pub amount: String,
    pub event: EventKind,
    pub tx_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct TokenEventRow {
    pub id: i64,
    pub wallet_address: String,
    pub project_id: String,
    pub token_ids: Vec<i64>,
    pub amount: String,
    pub event: String,
    pub tx_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<TokenEventRow> for TokenEvent {
    type Error = AppError;

    fn try_from(row: TokenEventRow) -> Result<Self, Self::Error> {
        let event = row
            .event
            .parse()
            .map_err(|_| AppError::Storage(format!("corrupt event kind `{}`", row.event)))?;
        Ok(Self {
            id: row.id,
            wallet_address: row.wallet_address,
            project_id: row.project_id,
            token_ids: row.token_ids.into_iter().map(|id| id.max(0) as u64).collect(),
            amount: row.amount,
            event,
            tx_hash: row.tx_hash,
            created_at: row.created_at,
        })
    }
}

/// Insert-ready event (no `id` or `created_at`). The wallet address is
/// already lower-cased.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTokenEvent {
    pub wallet_address: String,
    pub project_id: String,
    pub token_ids: Vec<u64>,
    pub amount: String,
    pub event: EventKind,
    pub tx_hash: Option<String>,
}

/// Selection for event queries. `wallet_address` must be lower-cased.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub wallet_address: String,
    pub project_id: Option<String>,
    pub event: Option<EventKind>,
    pub limit: Option<u32>,
}

impl EventFilter {
    pub fn matches(&self, event: &TokenEvent) -> bool {
        event.wallet_address == self.wallet_address
            && self
                .project_id
                .as_deref()
                .is_none_or(|p| p == event.project_id)
            && self.event.is_none_or(|k| k == event.event)
    }
}
