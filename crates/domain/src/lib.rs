//! Domain layer for the shop purchase workflow.
//!
//! This crate provides:
//! - Aggregate trait for event-sourced entities with fallible replay
//! - Command trait and a CommandHandler that serializes work per aggregate
//! - The User aggregate, its commands and events, and the UserService facade

pub mod aggregate;
pub mod command;
pub mod error;
pub mod user;

pub use aggregate::{Aggregate, DomainEvent};
pub use command::{Command, CommandHandler, CommandResult};
pub use error::DomainError;
pub use user::{
    BuySkuNow, CancelPendingOrder, CompletePendingOrder, CreateUser, PendingOrder,
    PendingOrderCanceledData, PendingOrderCompletedData, SkuPurchaseOrderedData, User,
    UserCommand, UserCreatedData, UserError, UserEvent, UserService,
};
