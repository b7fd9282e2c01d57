use std::sync::Arc;

use harvestflow_core::{AppError, AppResult};
use harvestflow_storage::{
    EventStore,
    models::{EventFilter, EventKind, NewTokenEvent, TokenEvent},
};
use serde::Deserialize;
use serde_json::Value;

use crate::validate;

/// Body of an event append. Every field except `txHash` is required.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendEvent {
    pub wallet_address: Option<String>,
    pub project_id: Option<String>,
    pub token_ids: Option<Vec<Value>>,
    pub amount: Option<Value>,
    pub event: Option<String>,
    pub tx_hash: Option<String>,
}

/// Event selection as received from a caller.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventQuery {
    #[serde(alias = "walletAddress")]
    pub wallet: Option<String>,
    #[serde(alias = "project_id")]
    pub project_id: Option<String>,
    pub event: Option<String>,
    pub limit: Option<u32>,
}

impl AppendEvent {
    fn validate(self) -> AppResult<NewTokenEvent> {
        let wallet_address = validate::required("walletAddress", self.wallet_address.as_deref())?
            .to_lowercase();
        let project_id = validate::required("projectId", self.project_id.as_deref())?.to_string();

        let token_ids = match self.token_ids {
            Some(ids) if !ids.is_empty() => ids
                .iter()
                .map(|v| {
                    validate::token_id(v).ok_or_else(|| {
                        AppError::validation(format!("tokenIds contains an invalid id: {v}"))
                    })
                })
                .collect::<AppResult<Vec<_>>>()?,
            _ => return Err(AppError::validation("tokenIds is required")),
        };

        let amount = self
            .amount
            .as_ref()
            .ok_or_else(|| AppError::validation("amount is required"))?;
        let amount = validate::amount(amount)
            .ok_or_else(|| AppError::validation("amount must be a non-negative number"))?;

        let event = validate::required("event", self.event.as_deref())?.parse::<EventKind>()?;

        Ok(NewTokenEvent {
            wallet_address,
            project_id,
            token_ids,
            amount,
            event,
            tx_hash: validate::optional(self.tx_hash),
        })
    }
}

/// Append-only wallet activity log.
#[derive(Clone)]
pub struct TokenEventLog {
    store: Arc<dyn EventStore>,
}

impl TokenEventLog {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    /// Validate and store one event. Nothing is written if validation fails.
    pub async fn append(&self, event: AppendEvent) -> AppResult<TokenEvent> {
        let new_event = event.validate()?;
        let stored = self.store.insert_event(&new_event).await?;
        tracing::info!(
            id = stored.id,
            wallet = %stored.wallet_address,
            project_id = %stored.project_id,
            event = %stored.event,
            "Token event recorded"
        );
        Ok(stored)
    }

    /// Events for a wallet, newest first.
    pub async fn query(&self, query: EventQuery) -> AppResult<Vec<TokenEvent>> {
        let wallet_address = validate::required("wallet", query.wallet.as_deref())?.to_lowercase();
        let event = validate::optional(query.event)
            .map(|e| e.parse::<EventKind>())
            .transpose()?;

        let filter = EventFilter {
            wallet_address,
            project_id: validate::optional(query.project_id),
            event,
            limit: query.limit,
        };
        self.store.query_events(&filter).await
    }
}
