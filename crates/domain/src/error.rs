//! Domain error types.

use common::EntityValidationError;
use thiserror::Error;

use crate::video::VideoError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error occurred in the video aggregate.
    #[error("Video error: {0}")]
    Video(#[from] VideoError),

    /// An entity failed validation.
    #[error(transparent)]
    Validation(#[from] EntityValidationError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
