//! Harvest Flow API Server — token-id counters, mint status and wallet events.

use std::{net::SocketAddr, sync::Arc};

use api::AppState;
use harvestflow_bookkeeping::{Bookkeeping, MintFlow};
use harvestflow_core::{Settings, StorageBackend, telemetry};
use harvestflow_storage::{self as storage, MemoryStore, PgStore};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    telemetry::init();
    let settings = Settings::from_env()?;

    tracing::info!(backend = ?settings.storage_backend, "Starting Harvest Flow API Server");

    let books = match settings.storage_backend {
        StorageBackend::Postgres => {
            let pool = storage::connect(&settings.database_url).await?;
            storage::migrate(&pool).await?;
            tracing::info!("Database ready");
            Bookkeeping::from_store(Arc::new(PgStore::new(pool)))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; counters and logs are lost on restart");
            Bookkeeping::from_store(Arc::new(MemoryStore::new()))
        }
    };

    let minter = match &settings.wallet {
        Some(wallet) => {
            let wallet = harvestflow_chain::create_wallet(&wallet.rpc_url, &wallet.private_key)?;
            Some(MintFlow::new(books.clone(), Arc::new(wallet)))
        }
        None => {
            tracing::info!("No wallet configured, mint endpoints disabled");
            None
        }
    };

    let app = api::router(Arc::new(AppState { books, minter }));

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.api_port));
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Shutting down gracefully…");
        })
        .await?;

    Ok(())
}
