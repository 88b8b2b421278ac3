//! User domain events.

use common::{AccountId, OrderId, SkuId, StockId, UserId};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

/// Events that can occur on a user aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum UserEvent {
    /// User was created.
    UserCreated(UserCreatedData),

    /// A sku was bought now; the order is pending until priced.
    SkuPurchaseOrdered(SkuPurchaseOrderedData),

    /// A pending order was canceled.
    PendingOrderCanceled(PendingOrderCanceledData),

    /// A pending order was completed.
    PendingOrderCompleted(PendingOrderCompletedData),
}

impl DomainEvent for UserEvent {
    fn event_type(&self) -> &'static str {
        match self {
            UserEvent::UserCreated(_) => "UserCreated",
            UserEvent::SkuPurchaseOrdered(_) => "SkuPurchaseOrdered",
            UserEvent::PendingOrderCanceled(_) => "PendingOrderCanceled",
            UserEvent::PendingOrderCompleted(_) => "PendingOrderCompleted",
        }
    }
}

/// Data for UserCreated event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCreatedData {
    pub user_id: UserId,
    pub login: String,
    pub account_id: AccountId,
}

/// Data for SkuPurchaseOrdered event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkuPurchaseOrderedData {
    pub user_id: UserId,
    pub sku_id: SkuId,
    pub quantity: i32,
    pub order_id: OrderId,
    pub stock_id: StockId,

    /// Account of the buyer, copied from the user at order time.
    pub account_id: AccountId,
}

/// Data for PendingOrderCanceled event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingOrderCanceledData {
    pub user_id: UserId,
    pub order_id: OrderId,
}

/// Data for PendingOrderCompleted event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingOrderCompletedData {
    pub user_id: UserId,
    pub order_id: OrderId,
}

// Convenience constructors for events
impl UserEvent {
    /// Creates a UserCreated event.
    pub fn user_created(user_id: UserId, login: impl Into<String>, account_id: AccountId) -> Self {
        UserEvent::UserCreated(UserCreatedData {
            user_id,
            login: login.into(),
            account_id,
        })
    }

    /// Creates a SkuPurchaseOrdered event.
    pub fn sku_purchase_ordered(data: SkuPurchaseOrderedData) -> Self {
        UserEvent::SkuPurchaseOrdered(data)
    }

    /// Creates a PendingOrderCanceled event.
    pub fn pending_order_canceled(user_id: UserId, order_id: OrderId) -> Self {
        UserEvent::PendingOrderCanceled(PendingOrderCanceledData { user_id, order_id })
    }

    /// Creates a PendingOrderCompleted event.
    pub fn pending_order_completed(user_id: UserId, order_id: OrderId) -> Self {
        UserEvent::PendingOrderCompleted(PendingOrderCompletedData { user_id, order_id })
    }

    /// Returns the user the event belongs to.
    pub fn user_id(&self) -> UserId {
        match self {
            UserEvent::UserCreated(data) => data.user_id,
            UserEvent::SkuPurchaseOrdered(data) => data.user_id,
            UserEvent::PendingOrderCanceled(data) => data.user_id,
            UserEvent::PendingOrderCompleted(data) => data.user_id,
        }
    }
}
