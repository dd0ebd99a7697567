//! Event routing between aggregates and handlers.

use std::collections::HashMap;
use std::sync::Arc;

use domain::{DomainEvent, EventSource};

use crate::handler::{DomainEventHandler, IntegrationEventHandler};
use crate::{MediatorError, Result};

/// Routes buffered aggregate events to registered handlers.
///
/// Handlers are registered once at startup, keyed by event kind. Domain
/// handlers run for every event not yet dispatched; integration handlers
/// run for the integration counterpart of every buffered event that has
/// one.
pub struct EventMediator<E: DomainEvent> {
    domain_handlers: HashMap<E::Kind, Vec<Arc<dyn DomainEventHandler<E>>>>,
    integration_handlers: HashMap<E::Kind, Vec<Arc<dyn IntegrationEventHandler>>>,
}

impl<E: DomainEvent> EventMediator<E> {
    /// Creates a mediator with no handlers.
    pub fn new() -> Self {
        Self {
            domain_handlers: HashMap::new(),
            integration_handlers: HashMap::new(),
        }
    }

    /// Subscribes `handler` to domain events of `kind`.
    pub fn register(
        &mut self,
        kind: E::Kind,
        handler: Arc<dyn DomainEventHandler<E>>,
    ) -> &mut Self {
        tracing::debug!(?kind, handler = handler.name(), "domain handler registered");
        self.domain_handlers.entry(kind).or_default().push(handler);
        self
    }

    /// Subscribes `handler` to the integration counterpart of events of `kind`.
    pub fn register_integration(
        &mut self,
        kind: E::Kind,
        handler: Arc<dyn IntegrationEventHandler>,
    ) -> &mut Self {
        tracing::debug!(?kind, handler = handler.name(), "integration handler registered");
        self.integration_handlers
            .entry(kind)
            .or_default()
            .push(handler);
        self
    }

    /// Number of domain handlers subscribed to `kind`.
    pub fn handler_count(&self, kind: E::Kind) -> usize {
        self.domain_handlers.get(&kind).map_or(0, Vec::len)
    }

    /// Number of integration handlers subscribed to `kind`.
    pub fn integration_handler_count(&self, kind: E::Kind) -> usize {
        self.integration_handlers.get(&kind).map_or(0, Vec::len)
    }

    /// Delivers every undispatched event of `aggregate` to its domain
    /// handlers, in buffer order.
    ///
    /// Each event is marked dispatched before its handlers run, so a second
    /// publish of the same aggregate delivers nothing twice. The first
    /// handler error stops publishing; events delivered so far stay
    /// dispatched.
    #[tracing::instrument(
        skip(self, aggregate),
        fields(aggregate_type = aggregate.source_type(), aggregate_id = %aggregate.source_id())
    )]
    pub async fn publish(&self, aggregate: &mut dyn EventSource<E>) -> Result<()> {
        let mut delivered = 0usize;

        while let Some(recorded) = aggregate.buffer().next_undispatched().cloned() {
            aggregate.buffer_mut().mark_dispatched(recorded.sequence);
            let event = recorded.event;
            let event_type = event.event_type();

            for handler in self.domain_handlers.get(&event.kind()).into_iter().flatten() {
                if let Err(source) = handler.handle(&event).await {
                    metrics::counter!("mediator_handler_failures_total", "event_type" => event_type)
                        .increment(1);
                    tracing::warn!(
                        handler = handler.name(),
                        event_type,
                        error = %source,
                        "domain event handler failed"
                    );
                    return Err(MediatorError::Handler {
                        handler: handler.name(),
                        event_type,
                        source,
                    });
                }
            }

            metrics::counter!("mediator_domain_events_dispatched_total", "event_type" => event_type)
                .increment(1);
            tracing::debug!(sequence = %recorded.sequence, event_type, "domain event dispatched");
            delivered += 1;
        }

        tracing::debug!(delivered, "publish complete");
        Ok(())
    }

    /// Delivers the integration counterpart of every buffered event of
    /// `aggregate` to its integration handlers, in buffer order.
    ///
    /// Events without an integration counterpart are skipped.
    #[tracing::instrument(
        skip(self, aggregate),
        fields(aggregate_type = aggregate.source_type(), aggregate_id = %aggregate.source_id())
    )]
    pub async fn publish_integration_events(&self, aggregate: &dyn EventSource<E>) -> Result<()> {
        for recorded in aggregate.buffer().iter() {
            let Some(integration) = recorded.event.integration_event() else {
                continue;
            };

            let handlers = self
                .integration_handlers
                .get(&recorded.event.kind())
                .into_iter()
                .flatten();
            for handler in handlers {
                if let Err(source) = handler.handle(&integration).await {
                    metrics::counter!(
                        "mediator_handler_failures_total",
                        "event_type" => recorded.event.event_type()
                    )
                    .increment(1);
                    return Err(MediatorError::IntegrationHandler {
                        handler: handler.name(),
                        event_name: integration.event_name.clone(),
                        source,
                    });
                }
            }

            metrics::counter!(
                "mediator_integration_events_dispatched_total",
                "event_name" => integration.event_name.clone()
            )
            .increment(1);
            tracing::debug!(event_name = %integration.event_name, "integration event dispatched");
        }

        Ok(())
    }
}

impl<E: DomainEvent> Default for EventMediator<E> {
    fn default() -> Self {
        Self::new()
    }
}
