//! Server-side mint orchestration.
//!
//! Flow:
//! 1. Reserve the next unused token id for the policy
//! 2. Record the NFT as `pending`
//! 3. Submit the payment through the wallet
//! 4. Record `minted` (status and a `mint` event) or `failed`

use std::sync::Arc;

use harvestflow_chain::{PaymentOutput, Wallet};
use harvestflow_core::{AppError, AppResult};
use harvestflow_storage::models::NftStatus;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{AppendEvent, Bookkeeping, StatusUpdate, validate};

/// Reserved ids that may already carry a status record before giving up.
const MAX_RESERVE_ATTEMPTS: usize = 64;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintRequest {
    pub policy_id: Option<String>,
    /// Prepended to the token id to form the asset name.
    #[serde(default)]
    pub asset_prefix: String,
    /// Defaults to the wallet's own address.
    pub owner: Option<String>,
    /// Recipient of the mint payment.
    pub pay_to: Option<String>,
    /// Payment in base units.
    pub amount: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MintReceipt {
    pub token_id: u64,
    pub asset_name: String,
    pub tx_hash: String,
}

#[derive(Clone)]
pub struct MintFlow {
    books: Bookkeeping,
    wallet: Arc<dyn Wallet>,
}

impl MintFlow {
    pub fn new(books: Bookkeeping, wallet: Arc<dyn Wallet>) -> Self {
        Self { books, wallet }
    }

    pub fn wallet(&self) -> &Arc<dyn Wallet> {
        &self.wallet
    }

    pub async fn mint(&self, project_id: &str, request: MintRequest) -> AppResult<MintReceipt> {
        let project_id = validate::required("projectId", Some(project_id))?;
        let policy_id = validate::required("policyId", request.policy_id.as_deref())?;
        let pay_to = validate::required("payTo", request.pay_to.as_deref())?;
        let amount = request
            .amount
            .as_ref()
            .and_then(validate::token_id)
            .ok_or_else(|| AppError::validation("amount must be a non-negative integer"))?;

        let owner = match validate::optional(request.owner.clone()) {
            Some(owner) => owner,
            None => self.wallet.get_change_address().await?,
        };

        let token_id = self.reserve_token_id(project_id, policy_id).await?;
        let asset_name = format!("{}{token_id}", request.asset_prefix.trim());

        self.books
            .statuses
            .upsert(
                project_id,
                token_id,
                StatusUpdate {
                    asset_name: Some(asset_name.clone()),
                    policy_id: Some(policy_id.to_string()),
                    status: Some(NftStatus::Pending.as_str().to_string()),
                    owner: Some(owner.clone()),
                    tx_hash: None,
                },
            )
            .await?;

        let outputs = [PaymentOutput {
            address: pay_to.to_string(),
            amount: amount.to_string(),
        }];

        let tx_hash = match self.wallet.build_and_sign_and_submit(&outputs).await {
            Ok(hash) => hash,
            Err(err) => {
                tracing::error!(project_id, token_id, error = %err, "Mint payment failed");
                self.books
                    .statuses
                    .upsert(project_id, token_id, StatusUpdate::with_status(NftStatus::Failed))
                    .await?;
                return Err(err);
            }
        };

        self.books
            .statuses
            .upsert(
                project_id,
                token_id,
                StatusUpdate {
                    tx_hash: Some(tx_hash.clone()),
                    ..StatusUpdate::with_status(NftStatus::Minted)
                },
            )
            .await?;
        self.books
            .events
            .append(AppendEvent {
                wallet_address: Some(owner),
                project_id: Some(project_id.to_string()),
                token_ids: Some(vec![Value::from(token_id)]),
                amount: Some(Value::from(amount)),
                event: Some("mint".into()),
                tx_hash: Some(tx_hash.clone()),
            })
            .await?;

        tracing::info!(project_id, policy_id, token_id, tx = %tx_hash, "Minted");
        Ok(MintReceipt {
            token_id,
            asset_name,
            tx_hash,
        })
    }

    /// Claim ids from the policy counter until one has no status record in
    /// the project. Ids used by earlier failed mints or written directly
    /// through a status update are skipped.
    async fn reserve_token_id(&self, project_id: &str, policy_id: &str) -> AppResult<u64> {
        for _ in 0..MAX_RESERVE_ATTEMPTS {
            let token_id = self.books.counters.reserve_next_token_id(policy_id).await?;
            match self.books.statuses.find(project_id, token_id).await {
                Err(AppError::NotFound(_)) => return Ok(token_id),
                Ok(existing) => tracing::debug!(
                    project_id,
                    token_id,
                    status = %existing.status,
                    "Token id already recorded, skipping"
                ),
                Err(err) => return Err(err),
            }
        }
        Err(AppError::validation(format!(
            "no free token id for {project_id} under {policy_id} after {MAX_RESERVE_ATTEMPTS} attempts"
        )))
    }
}
