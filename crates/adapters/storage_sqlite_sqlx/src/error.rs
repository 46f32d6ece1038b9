//! Storage-specific error type wrapping sqlx errors.

use valvehub_domain::error::ValveHubError;

/// Errors originating from the `SQLite` storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A query or connection failed.
    #[error("database error")]
    Database(#[from] sqlx::Error),

    /// Failed to serialize event data.
    #[error("JSON serialization error")]
    Json(#[from] serde_json::Error),

    /// Failed to run migrations.
    #[error("migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A valve index does not fit an `SQLite` integer.
    #[error("valve index {0} out of storable range")]
    ValveIndex(usize),
}

impl From<StorageError> for ValveHubError {
    fn from(err: StorageError) -> Self {
        Self::Storage(Box::new(err))
    }
}
