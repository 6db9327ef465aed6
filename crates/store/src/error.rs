use common::UserId;
use thiserror::Error;

/// Errors that can occur when interacting with a storage backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The target row of an update no longer exists.
    #[error("{0} row missing")]
    Missing(&'static str),

    /// A second driver profile was inserted for the same account.
    #[error("driver profile already exists for account {0}")]
    DuplicateDriver(UserId),

    /// A stored enum string could not be decoded.
    #[error("corrupt row: {0}")]
    Decode(String),

    /// A database error occurred.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl From<StoreError> for domain::Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateDriver(account) => domain::Error::DriverProfileExists(account),
            other => domain::Error::Store(other.to_string()),
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
