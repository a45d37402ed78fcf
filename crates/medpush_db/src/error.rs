//! Error types of the persistence layer

use thiserror::Error;

/// Failures of the database client and the repositories
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Database error: {0}")]
    SqlxError(#[from] sqlx::Error),

    /// The `[database]` section is missing or incomplete
    #[error("Database configuration error: {0}")]
    ConfigError(String),

    #[error("Database URL error: {0}")]
    UrlError(String),

    /// No connection could be established or handed out
    #[error("Database pool error: {0}")]
    PoolError(String),

    /// A statement was rejected; the message names the repository operation
    #[error("Database query error: {0}")]
    QueryError(String),

    /// A stored value could not be turned back into a domain value
    #[error("Database decode error: {0}")]
    DecodeError(String),

    #[error("Database transaction error: {0}")]
    TransactionError(String),
}

impl DbError {
    /// Whether the database itself could not be reached, as opposed to a
    /// single statement failing.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            DbError::PoolError(_) | DbError::SqlxError(sqlx::Error::PoolTimedOut)
        )
    }
}

impl From<DbError> for medpush_common::MedpushError {
    fn from(err: DbError) -> Self {
        medpush_common::MedpushError::DatabaseError(err.to_string())
    }
}
