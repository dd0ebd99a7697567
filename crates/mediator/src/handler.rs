//! Handler traits.

use async_trait::async_trait;
use domain::{DomainEvent, IntegrationEvent};

use crate::BoxError;

/// Reacts to a domain event inside the business transaction.
///
/// A failure aborts the surrounding operation and rolls its transaction
/// back.
#[async_trait]
pub trait DomainEventHandler<E: DomainEvent>: Send + Sync {
    /// Returns the name of this handler, used in logs and errors.
    fn name(&self) -> &'static str;

    /// Handles one event.
    async fn handle(&self, event: &E) -> Result<(), BoxError>;
}

/// Forwards an integration event outside the process.
///
/// Runs after the transaction committed; a failure is reported but cannot
/// undo the operation.
#[async_trait]
pub trait IntegrationEventHandler: Send + Sync {
    /// Returns the name of this handler, used in logs and errors.
    fn name(&self) -> &'static str;

    /// Handles one event.
    async fn handle(&self, event: &IntegrationEvent) -> Result<(), BoxError>;
}
