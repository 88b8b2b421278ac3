//! Saga error types.

use common::{AggregateId, OrderId};
use domain::DomainError;
use event_store::EventStoreError;
use thiserror::Error;

/// Errors that can occur while hosting buy-now processes.
#[derive(Debug, Error)]
pub enum SagaError {
    /// A follow-up command failed for a reason other than a settled order.
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Event store error.
    #[error("Event store error: {0}")]
    EventStore(#[from] EventStoreError),

    /// The triggering event belongs to a different order than the process.
    #[error("Process {process_id} tracks order {expected}, received event for order {actual}")]
    CorrelationMismatch {
        process_id: AggregateId,
        expected: OrderId,
        actual: OrderId,
    },

    /// No active process exists with the given id.
    #[error("Process not found: {0}")]
    ProcessNotFound(AggregateId),
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;
