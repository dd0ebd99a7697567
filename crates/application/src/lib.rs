//! Application service for transactional aggregate operations.
//!
//! One [`ApplicationService::run`] call is one business operation:
//! 1. Start the unit of work
//! 2. Run the use-case callback, which mutates aggregates through repositories
//! 3. Publish domain events while the transaction is still open
//! 4. Commit
//! 5. Publish integration events and clear the aggregates' buffers
//!
//! A failure in steps 2 to 4 rolls the transaction back.

pub mod error;
pub mod service;
pub mod state;

pub use error::{ApplicationError, Result};
pub use service::ApplicationService;
pub use state::ServiceState;
