//! Application service orchestrating one transactional operation.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use domain::DomainEvent;
use mediator::EventMediator;
use tokio::sync::Mutex;
use unit_of_work::{SharedAggregate, TransactionProvider, UnitOfWork};

use crate::Result;
use crate::error::ApplicationError;
use crate::state::ServiceState;

/// Runs use cases inside a unit of work and publishes the events of the
/// aggregates they touched.
///
/// Domain events are published while the transaction is still open, so
/// their handlers take part in it. Integration events go out only after a
/// successful commit.
pub struct ApplicationService<P: TransactionProvider, E: DomainEvent> {
    uow: Arc<UnitOfWork<P, E>>,
    mediator: Arc<EventMediator<E>>,
    state: Mutex<ServiceState>,
}

impl<P: TransactionProvider, E: DomainEvent> ApplicationService<P, E> {
    /// Creates a service over a unit of work and a mediator.
    pub fn new(uow: Arc<UnitOfWork<P, E>>, mediator: Arc<EventMediator<E>>) -> Self {
        Self {
            uow,
            mediator,
            state: Mutex::new(ServiceState::Idle),
        }
    }

    /// Returns the unit of work used by this service.
    pub fn unit_of_work(&self) -> &Arc<UnitOfWork<P, E>> {
        &self.uow
    }

    /// Returns the current state.
    pub async fn state(&self) -> ServiceState {
        *self.state.lock().await
    }

    /// Opens the unit of work.
    ///
    /// Fails with [`ApplicationError::InvalidState`] while another operation
    /// is running on this service; that operation's transaction is left
    /// untouched.
    pub async fn start(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if !state.can_start() {
            return Err(ApplicationError::InvalidState {
                expected: ServiceState::Idle,
                actual: *state,
            });
        }
        self.uow.start().await?;
        *state = ServiceState::Started;
        Ok(())
    }

    /// Publishes domain events, commits, then publishes integration events.
    ///
    /// Aggregates registered by domain event handlers are published in the
    /// same pass. After commit, each aggregate whose integration events were
    /// delivered has its buffer cleared; an aggregate whose delivery failed
    /// keeps its events and the first such failure is returned as
    /// [`ApplicationError::IntegrationPublish`].
    pub async fn finish(&self) -> Result<()> {
        self.ensure_running().await?;

        let aggregates = self.publish_domain_events().await?;
        self.uow.commit().await?;
        *self.state.lock().await = ServiceState::Finished;

        let mut first_failure = None;
        for aggregate in &aggregates {
            let mut aggregate = aggregate.lock().await;
            match self.mediator.publish_integration_events(&*aggregate).await {
                Ok(()) => aggregate.buffer_mut().clear(),
                Err(err) => {
                    tracing::warn!(
                        aggregate_id = %aggregate.source_id(),
                        error = %err,
                        "integration events not published after commit"
                    );
                    first_failure.get_or_insert(err);
                }
            }
        }

        match first_failure {
            Some(err) => Err(ApplicationError::IntegrationPublish(err)),
            None => Ok(()),
        }
    }

    /// Rolls the unit of work back.
    pub async fn fail(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        *state = ServiceState::Failed;
        self.uow.rollback().await?;
        Ok(())
    }

    /// Runs `callback` as one transactional operation and returns its value.
    ///
    /// An error from the callback, from a domain event handler or from the
    /// commit rolls the transaction back (when it is still open) and is
    /// returned unchanged.
    #[tracing::instrument(skip(self, callback))]
    pub async fn run<T, Error, F, Fut>(&self, callback: F) -> std::result::Result<T, Error>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = std::result::Result<T, Error>> + Send,
        Error: From<ApplicationError> + std::fmt::Display,
    {
        let started = Instant::now();
        self.start().await?;

        let value = match callback().await {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(error = %err, "operation failed, rolling back");
                self.abort().await;
                record_outcome("failure", started);
                return Err(err);
            }
        };

        match self.finish().await {
            Ok(()) => {
                record_outcome("success", started);
                tracing::debug!("operation committed");
                Ok(value)
            }
            Err(err @ ApplicationError::IntegrationPublish(_)) => {
                record_outcome("integration_failure", started);
                Err(err.into())
            }
            Err(err) => {
                tracing::warn!(error = %err, "operation failed, rolling back");
                self.abort().await;
                record_outcome("failure", started);
                Err(err.into())
            }
        }
    }

    async fn publish_domain_events(&self) -> Result<Vec<SharedAggregate<E>>> {
        let mut published = 0;
        loop {
            let aggregates = self.uow.aggregate_roots().await;
            for aggregate in &aggregates[published..] {
                let mut aggregate = aggregate.lock().await;
                self.mediator
                    .publish(&mut *aggregate)
                    .await
                    .map_err(ApplicationError::DomainEvent)?;
            }
            if aggregates.len() == published {
                return Ok(aggregates);
            }
            published = aggregates.len();
        }
    }

    async fn ensure_running(&self) -> Result<()> {
        let actual = *self.state.lock().await;
        if !actual.is_running() {
            return Err(ApplicationError::InvalidState {
                expected: ServiceState::Started,
                actual,
            });
        }
        Ok(())
    }

    async fn abort(&self) {
        if !self.uow.is_active().await {
            *self.state.lock().await = ServiceState::Failed;
            return;
        }
        if let Err(err) = self.fail().await {
            tracing::error!(error = %err, "rollback failed");
        }
    }
}

fn record_outcome(outcome: &'static str, started: Instant) {
    metrics::counter!("application_operations_total", "outcome" => outcome).increment(1);
    metrics::histogram!("application_operation_duration_seconds")
        .record(started.elapsed().as_secs_f64());
}
