//! Application service error types.

use mediator::MediatorError;
use thiserror::Error;
use unit_of_work::UnitOfWorkError;

use crate::state::ServiceState;

/// Errors that can occur while running an operation.
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// Service is in an invalid state for the requested step.
    #[error("Invalid service state: expected {expected}, actual {actual}")]
    InvalidState {
        expected: ServiceState,
        actual: ServiceState,
    },

    /// Starting, committing or rolling back failed.
    #[error("Unit of work error: {0}")]
    UnitOfWork(#[from] UnitOfWorkError),

    /// A domain event handler failed before commit. The transaction was
    /// rolled back.
    #[error("Domain event handling failed: {0}")]
    DomainEvent(#[source] MediatorError),

    /// Publishing integration events failed after commit. The committed
    /// changes stay.
    #[error("Integration event publishing failed after commit: {0}")]
    IntegrationPublish(#[source] MediatorError),
}

/// Convenience type alias for application results.
pub type Result<T> = std::result::Result<T, ApplicationError>;
