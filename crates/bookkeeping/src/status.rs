use std::sync::Arc;

use chrono::Utc;
use harvestflow_core::{AppError, AppResult};
use harvestflow_storage::{
    StatusStore,
    models::{NftStatus, NftStatusRecord, ProjectStats},
};
use serde::Deserialize;

use crate::validate;

/// How many minted records `project_stats` returns.
pub const RECENT_MINTS: usize = 10;

/// Fields to merge into an NFT's status record. Absent fields keep their
/// stored value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub asset_name: Option<String>,
    pub policy_id: Option<String>,
    pub status: Option<String>,
    pub tx_hash: Option<String>,
    pub owner: Option<String>,
}

impl StatusUpdate {
    pub fn with_status(status: NftStatus) -> Self {
        Self {
            status: Some(status.as_str().to_string()),
            ..Default::default()
        }
    }
}

#[derive(Clone)]
pub struct StatusService {
    store: Arc<dyn StatusStore>,
}

impl StatusService {
    pub fn new(store: Arc<dyn StatusStore>) -> Self {
        Self { store }
    }

    /// Merge `update` into the record for (project_id, token_id), creating it
    /// as `pending` when absent. `minted_at` is stamped on the transition
    /// into `minted` and preserved otherwise.
    pub async fn upsert(
        &self,
        project_id: &str,
        token_id: u64,
        update: StatusUpdate,
    ) -> AppResult<NftStatusRecord> {
        let project_id = validate::required("projectId", Some(project_id))?;
        let next = update
            .status
            .as_deref()
            .map(|s| s.trim().parse::<NftStatus>())
            .transpose()?;
        let now = Utc::now();

        let record = match self.store.get_status(project_id, token_id).await? {
            Some(mut record) => {
                if let Some(next) = next {
                    if record.status.is_terminal() && next != record.status {
                        return Err(AppError::validation(format!(
                            "{project_id}/{token_id} is already {} and cannot become {next}",
                            record.status
                        )));
                    }
                    if next == NftStatus::Minted && record.status != NftStatus::Minted {
                        record.minted_at = Some(now);
                    }
                    record.status = next;
                }
                if let Some(asset_name) = validate::optional(update.asset_name) {
                    record.asset_name = asset_name;
                }
                if let Some(policy_id) = validate::optional(update.policy_id) {
                    record.policy_id = policy_id;
                }
                if let Some(tx_hash) = validate::optional(update.tx_hash) {
                    record.tx_hash = Some(tx_hash);
                }
                if let Some(owner) = validate::optional(update.owner) {
                    record.owner = Some(owner);
                }
                record.updated_at = now;
                record
            }
            None => {
                let asset_name =
                    validate::required("assetName", update.asset_name.as_deref())?.to_string();
                let policy_id =
                    validate::required("policyId", update.policy_id.as_deref())?.to_string();
                let status = next.unwrap_or_default();
                NftStatusRecord {
                    project_id: project_id.to_string(),
                    token_id,
                    asset_name,
                    policy_id,
                    status,
                    tx_hash: validate::optional(update.tx_hash),
                    minted_at: (status == NftStatus::Minted).then_some(now),
                    owner: validate::optional(update.owner),
                    created_at: now,
                    updated_at: now,
                }
            }
        };

        self.store.put_status(&record).await?;
        tracing::info!(
            project_id,
            token_id,
            status = %record.status,
            "NFT status recorded"
        );
        Ok(record)
    }

    pub async fn find(&self, project_id: &str, token_id: u64) -> AppResult<NftStatusRecord> {
        self.store
            .get_status(project_id, token_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("NFT {project_id}/{token_id}")))
    }

    pub async fn find_by_owner(&self, owner: &str) -> AppResult<Vec<NftStatusRecord>> {
        let owner = validate::required("owner", Some(owner))?;
        self.store.statuses_by_owner(owner).await
    }

    pub async fn project_stats(&self, project_id: &str) -> AppResult<ProjectStats> {
        let records = self.store.project_statuses(project_id).await?;

        let total_minted = records
            .iter()
            .filter(|r| r.status == NftStatus::Minted)
            .count() as u64;
        let last_token_id = records.iter().map(|r| r.token_id).max().unwrap_or(0);
        let recent_mints = records
            .into_iter()
            .rev()
            .filter(|r| r.status == NftStatus::Minted)
            .take(RECENT_MINTS)
            .collect();

        Ok(ProjectStats {
            total_minted,
            last_token_id,
            next_token_id: last_token_id.saturating_add(1),
            recent_mints,
        })
    }
}
