//! Expected-failure error kinds shared across crates.

use thiserror::Error;

use crate::notification::Notification;

/// A referenced entity does not exist.
///
/// Raised by repositories and lookups; validators translate it into a
/// [`Notification`] entry instead of letting it escape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{entity} Not Found using ID {}", .ids.join(", "))]
pub struct NotFoundError {
    /// The identifiers that could not be found.
    pub ids: Vec<String>,
    /// Name of the entity type that was looked up.
    pub entity: &'static str,
}

impl NotFoundError {
    /// Creates a not-found error for a single identifier.
    pub fn new(id: impl ToString, entity: &'static str) -> Self {
        Self {
            ids: vec![id.to_string()],
            entity,
        }
    }

    /// Creates a not-found error for several identifiers.
    pub fn many<I, S>(ids: I, entity: &'static str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        Self {
            ids: ids.into_iter().map(|id| id.to_string()).collect(),
            entity,
        }
    }
}

/// One or more validation rules failed; carries every failure at once.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Entity Validation Error: {notification}")]
pub struct EntityValidationError {
    notification: Notification,
}

impl EntityValidationError {
    /// Wraps a notification holding at least one error.
    pub fn new(notification: Notification) -> Self {
        Self { notification }
    }

    /// Returns the collected errors.
    pub fn notification(&self) -> &Notification {
        &self.notification
    }

    /// Consumes the error and returns the collected errors.
    pub fn into_notification(self) -> Notification {
        self.notification
    }
}

impl From<Notification> for EntityValidationError {
    fn from(notification: Notification) -> Self {
        Self::new(notification)
    }
}
