pub mod config;
pub mod error;
pub mod telemetry;

pub use config::{Settings, StorageBackend, WalletSettings};
pub use error::{AppError, AppResult};
