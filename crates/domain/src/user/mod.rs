//! User aggregate and related types.

mod aggregate;
mod commands;
mod events;
mod service;
mod value_objects;

pub use aggregate::User;
pub use commands::*;
pub use events::{
    PendingOrderCanceledData, PendingOrderCompletedData, SkuPurchaseOrderedData, UserCreatedData,
    UserEvent,
};
pub use service::UserService;
pub use value_objects::PendingOrder;

use common::{OrderId, UserId};
use thiserror::Error;

/// Errors that can occur during user operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UserError {
    /// The user was already created.
    #[error("User already exists: {user_id}")]
    AlreadyExists { user_id: UserId },

    /// The command targets a user that was never created.
    #[error("User not found: {user_id}")]
    UserNotFound { user_id: UserId },

    /// Purchase quantity must be positive.
    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: i32 },

    /// The order is not pending on this user.
    #[error("Order not found: {order_id}")]
    OrderNotFound { order_id: OrderId },

    /// A stored event contradicts the user's current state.
    #[error("Inconsistent {event_type} event: {reason}")]
    InconsistentEvent {
        event_type: &'static str,
        reason: String,
    },
}
