use thiserror::Error;

/// Shared error type used across all Harvest Flow crates.
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or malformed input supplied by the caller.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The backing store is unavailable or a query failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// The wallet or its RPC endpoint rejected the request.
    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] eyre::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Wrap any displayable backend error as a storage failure.
    pub fn storage(err: impl std::fmt::Display) -> Self {
        Self::Storage(err.to_string())
    }

    pub fn wallet(err: impl std::fmt::Display) -> Self {
        Self::Wallet(err.to_string())
    }

    /// True for errors caused by the caller rather than by the service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::NotFound(_))
    }
}
