//! Mediator error types.

use thiserror::Error;

/// Error type returned by event handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while publishing events.
#[derive(Debug, Error)]
pub enum MediatorError {
    /// A domain event handler failed. Publishing stopped at this event.
    #[error("Handler {handler} failed on {event_type}: {source}")]
    Handler {
        handler: &'static str,
        event_type: &'static str,
        #[source]
        source: BoxError,
    },

    /// An integration event handler failed.
    #[error("Integration handler {handler} failed on {event_name}: {source}")]
    IntegrationHandler {
        handler: &'static str,
        event_name: String,
        #[source]
        source: BoxError,
    },
}

/// Result type for mediator operations.
pub type Result<T> = std::result::Result<T, MediatorError>;
