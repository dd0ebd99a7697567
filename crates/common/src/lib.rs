//! Shared building blocks for the catalog consistency core.
//!
//! - [`AggregateId`]: value-equal identity for aggregates
//! - [`Either`]: success/failure container used by validators
//! - [`Notification`]: multi-field error accumulator
//! - [`NotFoundError`] and [`EntityValidationError`]: the expected-failure kinds

pub mod either;
pub mod error;
pub mod notification;
pub mod types;

pub use either::Either;
pub use error::{EntityValidationError, NotFoundError};
pub use notification::Notification;
pub use types::AggregateId;
