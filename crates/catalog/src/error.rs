//! Catalog error types.

use application::ApplicationError;
use common::{EntityValidationError, NotFoundError};
use domain::VideoError;
use thiserror::Error;
use unit_of_work::UnitOfWorkError;

/// Errors returned by the catalog use cases.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Input failed validation; every failing field is reported.
    #[error(transparent)]
    Validation(#[from] EntityValidationError),

    /// A referenced entity does not exist.
    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    /// The video refused the change.
    #[error("Video error: {0}")]
    Video(#[from] VideoError),

    /// Running the operation failed.
    #[error("Application error: {0}")]
    Application(#[from] ApplicationError),

    /// Storage transaction error.
    #[error("Unit of work error: {0}")]
    UnitOfWork(#[from] UnitOfWorkError),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Logging or metrics could not be set up.
    #[error("Telemetry error: {0}")]
    Telemetry(String),
}

/// Convenience type alias for catalog results.
pub type Result<T> = std::result::Result<T, CatalogError>;
