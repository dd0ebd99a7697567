//! Unit of work for the aggregate consistency core.
//!
//! A [`UnitOfWork`] owns one storage transaction and remembers which
//! aggregates were written during it. It never publishes events; the
//! application service reads the registered aggregates back when the
//! operation finishes.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod provider;
pub mod unit_of_work;

pub use error::{Result, UnitOfWorkError};
pub use memory::{InMemoryTransaction, InMemoryTransactionProvider, TransactionStats};
pub use postgres::PgTransactionProvider;
pub use provider::TransactionProvider;
pub use unit_of_work::{SharedAggregate, UnitOfWork};
