use async_trait::async_trait;
use harvestflow_core::AppResult;
use serde::{Deserialize, Serialize};

/// One recipient of a payment and the amount in base units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOutput {
    pub address: String,
    /// Decimal integer string (wei, lovelace, ...).
    pub amount: String,
}

/// The three wallet capabilities the bookkeeping flows depend on.
#[async_trait]
pub trait Wallet: Send + Sync {
    /// Build a transaction paying `outputs`, sign it, submit it, and return
    /// its hash.
    async fn build_and_sign_and_submit(&self, outputs: &[PaymentOutput]) -> AppResult<String>;

    /// Spendable balance in base units, as a decimal string.
    async fn get_balance(&self) -> AppResult<String>;

    /// Address that receives change, which is also the wallet's own address.
    async fn get_change_address(&self) -> AppResult<String>;
}
