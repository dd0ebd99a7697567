//! Message transport boundary and the integration event publisher.

use std::sync::Arc;

use async_trait::async_trait;
use domain::IntegrationEvent;
use mediator::{BoxError, IntegrationEventHandler};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors raised by a message transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The broker could not be reached or refused the message.
    #[error("Transport unavailable: {0}")]
    Unavailable(String),

    /// The message could not be encoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Outbound message bus.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    /// Publishes `payload` to `exchange` under `routing_key`.
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        payload: serde_json::Value,
    ) -> Result<(), TransportError>;
}

/// A message accepted by [`InMemoryMessageTransport`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishedMessage {
    pub exchange: String,
    pub routing_key: String,
    pub payload: serde_json::Value,
}

#[derive(Debug, Default)]
struct TransportState {
    messages: Vec<PublishedMessage>,
    fail_on_publish: bool,
}

/// In-memory message transport for testing and the demo binary.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMessageTransport {
    state: Arc<RwLock<TransportState>>,
}

impl InMemoryMessageTransport {
    /// Creates a transport with no messages.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the transport to reject every publish.
    pub async fn set_fail_on_publish(&self, fail: bool) {
        self.state.write().await.fail_on_publish = fail;
    }

    /// Returns every accepted message, oldest first.
    pub async fn messages(&self) -> Vec<PublishedMessage> {
        self.state.read().await.messages.clone()
    }

    /// Returns the accepted messages with the given routing key.
    pub async fn messages_for(&self, routing_key: &str) -> Vec<PublishedMessage> {
        self.state
            .read()
            .await
            .messages
            .iter()
            .filter(|m| m.routing_key == routing_key)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl MessageTransport for InMemoryMessageTransport {
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        payload: serde_json::Value,
    ) -> Result<(), TransportError> {
        let mut state = self.state.write().await;
        if state.fail_on_publish {
            return Err(TransportError::Unavailable(format!(
                "publish to {exchange}/{routing_key} rejected"
            )));
        }
        state.messages.push(PublishedMessage {
            exchange: exchange.to_string(),
            routing_key: routing_key.to_string(),
            payload,
        });
        Ok(())
    }
}

/// Forwards integration events to a message transport.
///
/// The routing key is the event name; the body is the whole integration
/// event as JSON.
pub struct IntegrationEventPublisher<T: MessageTransport> {
    transport: Arc<T>,
    exchange: String,
}

impl<T: MessageTransport> IntegrationEventPublisher<T> {
    /// Creates a publisher targeting `exchange`.
    pub fn new(transport: Arc<T>, exchange: impl Into<String>) -> Self {
        Self {
            transport,
            exchange: exchange.into(),
        }
    }
}

#[async_trait]
impl<T: MessageTransport + 'static> IntegrationEventHandler for IntegrationEventPublisher<T> {
    fn name(&self) -> &'static str {
        "IntegrationEventPublisher"
    }

    async fn handle(&self, event: &IntegrationEvent) -> Result<(), BoxError> {
        let payload = serde_json::to_value(event).map_err(TransportError::from)?;
        self.transport
            .publish(&self.exchange, &event.event_name, payload)
            .await?;
        metrics::counter!(
            "catalog_messages_published_total",
            "routing_key" => event.event_name.clone()
        )
        .increment(1);
        tracing::info!(
            exchange = %self.exchange,
            routing_key = %event.event_name,
            "integration event published"
        );
        Ok(())
    }
}
