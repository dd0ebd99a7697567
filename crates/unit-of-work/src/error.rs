use thiserror::Error;

/// Errors that can occur while driving a unit of work.
#[derive(Debug, Error)]
pub enum UnitOfWorkError {
    /// `commit`, `rollback` or a transactional read/write was called
    /// outside of `start`/`commit`.
    #[error("No active transaction")]
    NoActiveTransaction,

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The transaction provider refused the operation.
    #[error("Transaction provider error: {0}")]
    Provider(String),
}

/// Result type for unit of work operations.
pub type Result<T> = std::result::Result<T, UnitOfWorkError>;
