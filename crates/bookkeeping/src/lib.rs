//! Token-id counters, NFT mint status and the wallet event log.

pub mod counter;
pub mod events;
pub mod mint;
pub mod status;
mod validate;

pub use counter::{BulkEntry, SetHighest, TokenCounterService};
pub use events::{AppendEvent, EventQuery, TokenEventLog};
pub use mint::{MintFlow, MintReceipt, MintRequest};
pub use status::{StatusService, StatusUpdate};
pub use validate::{MAX_TOKEN_ID, parse_token_id};

use std::sync::Arc;

use harvestflow_storage::{CounterStore, EventStore, StatusStore};

/// The three bookkeeping services sharing one store.
#[derive(Clone)]
pub struct Bookkeeping {
    pub counters: TokenCounterService,
    pub statuses: StatusService,
    pub events: TokenEventLog,
}

impl Bookkeeping {
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: CounterStore + StatusStore + EventStore + 'static,
    {
        Self {
            counters: TokenCounterService::new(store.clone()),
            statuses: StatusService::new(store.clone()),
            events: TokenEventLog::new(store),
        }
    }
}
