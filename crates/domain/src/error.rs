//! Domain error types.

use event_store::EventStoreError;
use thiserror::Error;

use crate::user::UserError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error occurred in the event store.
    #[error("Event store error: {0}")]
    EventStore(#[from] EventStoreError),

    /// The user aggregate rejected a command or an event.
    #[error("User error: {0}")]
    User(UserError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DomainError {
    /// Returns the aggregate rejection, if this error is one.
    pub fn as_user_error(&self) -> Option<&UserError> {
        match self {
            DomainError::User(e) => Some(e),
            _ => None,
        }
    }
}
