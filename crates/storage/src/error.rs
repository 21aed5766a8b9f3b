use loansplit_core::{LoanSplitError, TransactionId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Transaction {0} already has an interest split entry")]
    DuplicateSplit(TransactionId),
    #[error("{0} not found")]
    NotFound(String),
    #[error(transparent)]
    Domain(#[from] LoanSplitError),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StorageError {
    /// Maps a uniqueness failure on the split table to the domain error.
    pub(crate) fn from_split_insert(err: sqlx::Error, transaction: TransactionId) -> Self {
        match err {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                StorageError::DuplicateSplit(transaction)
            }
            other => StorageError::Database(other),
        }
    }
}
