//! In-process event mediator.
//!
//! This crate routes the events buffered on aggregates to process-wide
//! handlers:
//! - [`DomainEventHandler`] runs inside the business transaction
//! - [`IntegrationEventHandler`] runs after commit, on the flattened
//!   [`domain::IntegrationEvent`]
//! - [`EventMediator`] holds both registries and tracks delivery through
//!   each aggregate's dispatch watermark

pub mod error;
pub mod handler;
pub mod mediator;

pub use error::{BoxError, MediatorError, Result};
pub use handler::{DomainEventHandler, IntegrationEventHandler};
pub use mediator::EventMediator;
