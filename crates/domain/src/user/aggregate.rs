//! User aggregate implementation.

use std::collections::HashMap;

use common::{AccountId, AggregateId, OrderId, UserId};
use event_store::Version;

use crate::aggregate::Aggregate;

use super::{
    BuySkuNow, CancelPendingOrder, CompletePendingOrder, CreateUser, PendingOrder, UserCommand,
    UserError, UserEvent,
    events::{SkuPurchaseOrderedData, UserCreatedData},
};

/// User aggregate root.
///
/// Owns the set of pending buy-now orders. An order id is pending from the
/// moment it is ordered until it is completed or canceled.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct User {
    id: Option<UserId>,
    version: Version,
    login: String,
    account_id: Option<AccountId>,
    pending_orders: HashMap<OrderId, PendingOrder>,
}

impl Aggregate for User {
    type Event = UserEvent;
    type Error = UserError;

    fn aggregate_type() -> &'static str {
        "User"
    }

    fn id(&self) -> Option<AggregateId> {
        self.id.map(AggregateId::from)
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) -> Result<(), Self::Error> {
        match event {
            UserEvent::UserCreated(data) => self.apply_user_created(data),
            UserEvent::SkuPurchaseOrdered(data) => {
                self.ensure_owner("SkuPurchaseOrdered", data.user_id)?;
                self.apply_sku_purchase_ordered(data);
                Ok(())
            }
            UserEvent::PendingOrderCanceled(data) => {
                self.ensure_owner("PendingOrderCanceled", data.user_id)?;
                self.pending_orders.remove(&data.order_id);
                Ok(())
            }
            UserEvent::PendingOrderCompleted(data) => {
                self.ensure_owner("PendingOrderCompleted", data.user_id)?;
                self.pending_orders.remove(&data.order_id);
                Ok(())
            }
        }
    }
}

// Query methods
impl User {
    /// Returns the user ID, or None if the user was never created.
    pub fn user_id(&self) -> Option<UserId> {
        self.id
    }

    /// Returns the login.
    pub fn login(&self) -> &str {
        &self.login
    }

    /// Returns the owning account.
    pub fn account_id(&self) -> Option<AccountId> {
        self.account_id
    }

    /// Returns all pending orders.
    pub fn pending_orders(&self) -> impl Iterator<Item = &PendingOrder> {
        self.pending_orders.values()
    }

    /// Returns a pending order by ID.
    pub fn pending_order(&self, order_id: &OrderId) -> Option<&PendingOrder> {
        self.pending_orders.get(order_id)
    }

    /// Returns the number of pending orders.
    pub fn pending_order_count(&self) -> usize {
        self.pending_orders.len()
    }
}

// Command methods (return events)
impl User {
    /// Decides the outcome of any user command.
    pub fn handle(&self, command: &UserCommand) -> Result<Vec<UserEvent>, UserError> {
        match command {
            UserCommand::CreateUser(cmd) => self.create(cmd),
            UserCommand::BuySkuNow(cmd) => self.buy_now(cmd),
            UserCommand::CancelPendingOrder(cmd) => self.cancel_order(cmd),
            UserCommand::CompletePendingOrder(cmd) => self.complete_order(cmd),
        }
    }

    /// Creates the user. Only valid on a user with no history.
    pub fn create(&self, cmd: &CreateUser) -> Result<Vec<UserEvent>, UserError> {
        if let Some(user_id) = self.id {
            return Err(UserError::AlreadyExists { user_id });
        }

        Ok(vec![UserEvent::user_created(
            cmd.user_id,
            cmd.login.clone(),
            cmd.account_id,
        )])
    }

    /// Opens a pending order for a sku under a freshly generated order id.
    ///
    /// The price is not checked here; the buy-now process settles the order.
    pub fn buy_now(&self, cmd: &BuySkuNow) -> Result<Vec<UserEvent>, UserError> {
        let (user_id, account_id) = self.require_created(cmd.user_id)?;

        if cmd.quantity <= 0 {
            return Err(UserError::InvalidQuantity {
                quantity: cmd.quantity,
            });
        }

        Ok(vec![UserEvent::sku_purchase_ordered(
            SkuPurchaseOrderedData {
                user_id,
                sku_id: cmd.sku_id,
                quantity: cmd.quantity,
                order_id: OrderId::new(),
                stock_id: cmd.stock_id,
                account_id,
            },
        )])
    }

    /// Cancels a pending order.
    pub fn cancel_order(&self, cmd: &CancelPendingOrder) -> Result<Vec<UserEvent>, UserError> {
        let (user_id, _) = self.require_created(cmd.user_id)?;
        self.require_pending(cmd.order_id)?;

        Ok(vec![UserEvent::pending_order_canceled(
            user_id,
            cmd.order_id,
        )])
    }

    /// Completes a pending order.
    pub fn complete_order(&self, cmd: &CompletePendingOrder) -> Result<Vec<UserEvent>, UserError> {
        let (user_id, _) = self.require_created(cmd.user_id)?;
        self.require_pending(cmd.order_id)?;

        Ok(vec![UserEvent::pending_order_completed(
            user_id,
            cmd.order_id,
        )])
    }

    fn require_created(&self, target: UserId) -> Result<(UserId, AccountId), UserError> {
        match (self.id, self.account_id) {
            (Some(user_id), Some(account_id)) => Ok((user_id, account_id)),
            _ => Err(UserError::UserNotFound { user_id: target }),
        }
    }

    fn require_pending(&self, order_id: OrderId) -> Result<(), UserError> {
        if self.pending_orders.contains_key(&order_id) {
            Ok(())
        } else {
            Err(UserError::OrderNotFound { order_id })
        }
    }
}

// Event application helpers
impl User {
    fn apply_user_created(&mut self, data: UserCreatedData) -> Result<(), UserError> {
        match self.id {
            None => {
                self.id = Some(data.user_id);
                self.login = data.login;
                self.account_id = Some(data.account_id);
                self.pending_orders.clear();
                Ok(())
            }
            // Redelivery of the same creation fact.
            Some(user_id)
                if user_id == data.user_id
                    && self.login == data.login
                    && self.account_id == Some(data.account_id) =>
            {
                Ok(())
            }
            Some(user_id) => Err(UserError::InconsistentEvent {
                event_type: "UserCreated",
                reason: format!("user {user_id} was already created with different data"),
            }),
        }
    }

    fn apply_sku_purchase_ordered(&mut self, data: SkuPurchaseOrderedData) {
        self.pending_orders
            .entry(data.order_id)
            .or_insert(PendingOrder {
                order_id: data.order_id,
                sku_id: data.sku_id,
                quantity: data.quantity,
                stock_id: data.stock_id,
            });
    }

    fn ensure_owner(&self, event_type: &'static str, user_id: UserId) -> Result<(), UserError> {
        match self.id {
            Some(id) if id == user_id => Ok(()),
            Some(id) => Err(UserError::InconsistentEvent {
                event_type,
                reason: format!("event for user {user_id} applied to user {id}"),
            }),
            None => Err(UserError::InconsistentEvent {
                event_type,
                reason: format!("user {user_id} has not been created"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{SkuId, StockId};

    fn created_user() -> (User, UserId, AccountId) {
        let user_id = UserId::new();
        let account_id = AccountId::new();
        let mut user = User::default();
        user.apply(UserEvent::user_created(user_id, "bob", account_id))
            .unwrap();
        (user, user_id, account_id)
    }

    fn order_one(user: &mut User, user_id: UserId) -> SkuPurchaseOrderedData {
        let events = user
            .buy_now(&BuySkuNow::new(user_id, SkuId::new(), 10, StockId::new()))
            .unwrap();
        let UserEvent::SkuPurchaseOrdered(data) = events[0].clone() else {
            panic!("Expected SkuPurchaseOrdered event");
        };
        user.apply_events(events).unwrap();
        data
    }

    #[test]
    fn create_user_initializes_state() {
        let user = User::default();
        let user_id = UserId::new();
        let account_id = AccountId::new();

        let events = user
            .create(&CreateUser::new(user_id, "bob", account_id))
            .unwrap();
        assert_eq!(events.len(), 1);

        let mut user = user;
        user.apply_events(events).unwrap();

        assert_eq!(user.user_id(), Some(user_id));
        assert_eq!(user.login(), "bob");
        assert_eq!(user.account_id(), Some(account_id));
        assert_eq!(user.pending_order_count(), 0);
    }

    #[test]
    fn create_twice_is_rejected() {
        let (user, user_id, account_id) = created_user();

        let result = user.create(&CreateUser::new(user_id, "bob", account_id));
        assert_eq!(result, Err(UserError::AlreadyExists { user_id }));
    }

    #[test]
    fn buy_now_opens_pending_order_with_account() {
        let (mut user, user_id, account_id) = created_user();
        let sku_id = SkuId::new();
        let stock_id = StockId::new();

        let events = user
            .buy_now(&BuySkuNow::new(user_id, sku_id, 10, stock_id))
            .unwrap();
        assert_eq!(events.len(), 1);

        let UserEvent::SkuPurchaseOrdered(data) = events[0].clone() else {
            panic!("Expected SkuPurchaseOrdered event");
        };
        assert_eq!(data.account_id, account_id);
        assert_eq!(data.sku_id, sku_id);
        assert_eq!(data.quantity, 10);

        user.apply_events(events).unwrap();
        let pending = user.pending_order(&data.order_id).unwrap();
        assert_eq!(pending.sku_id, sku_id);
        assert_eq!(pending.quantity, 10);
        assert_eq!(pending.stock_id, stock_id);
    }

    #[test]
    fn buy_now_generates_distinct_order_ids() {
        let (mut user, user_id, _) = created_user();
        let first = order_one(&mut user, user_id);
        let second = order_one(&mut user, user_id);

        assert_ne!(first.order_id, second.order_id);
        assert_eq!(user.pending_order_count(), 2);
    }

    #[test]
    fn buy_now_rejects_non_positive_quantity() {
        let (user, user_id, _) = created_user();

        for quantity in [0, -1] {
            let result = user.buy_now(&BuySkuNow::new(
                user_id,
                SkuId::new(),
                quantity,
                StockId::new(),
            ));
            assert_eq!(result, Err(UserError::InvalidQuantity { quantity }));
        }
    }

    #[test]
    fn commands_on_missing_user_are_rejected() {
        let user = User::default();
        let user_id = UserId::new();

        let result = user.buy_now(&BuySkuNow::new(user_id, SkuId::new(), 1, StockId::new()));
        assert_eq!(result, Err(UserError::UserNotFound { user_id }));

        let result = user.cancel_order(&CancelPendingOrder::new(user_id, OrderId::new()));
        assert_eq!(result, Err(UserError::UserNotFound { user_id }));
    }

    #[test]
    fn complete_removes_pending_order() {
        let (mut user, user_id, _) = created_user();
        let ordered = order_one(&mut user, user_id);

        let cmd = CompletePendingOrder::new(user_id, ordered.order_id);
        let events = user.complete_order(&cmd).unwrap();
        assert_eq!(
            events,
            vec![UserEvent::pending_order_completed(user_id, ordered.order_id)]
        );

        user.apply_events(events).unwrap();
        assert_eq!(user.pending_order_count(), 0);

        let again = user.complete_order(&cmd);
        assert_eq!(
            again,
            Err(UserError::OrderNotFound {
                order_id: ordered.order_id
            })
        );
    }

    #[test]
    fn cancel_removes_pending_order() {
        let (mut user, user_id, _) = created_user();
        let ordered = order_one(&mut user, user_id);

        let cmd = CancelPendingOrder::new(user_id, ordered.order_id);
        let events = user.cancel_order(&cmd).unwrap();
        user.apply_events(events).unwrap();
        assert!(user.pending_order(&ordered.order_id).is_none());

        assert!(matches!(
            user.cancel_order(&cmd),
            Err(UserError::OrderNotFound { .. })
        ));
    }

    #[test]
    fn cancel_unknown_order_is_rejected() {
        let (user, user_id, _) = created_user();
        let order_id = OrderId::new();

        let result = user.handle(&CancelPendingOrder::new(user_id, order_id).into());
        assert_eq!(result, Err(UserError::OrderNotFound { order_id }));
    }

    #[test]
    fn replaying_duplicate_purchase_keeps_one_pending_order() {
        let (mut user, user_id, account_id) = created_user();
        let ordered = UserEvent::sku_purchase_ordered(SkuPurchaseOrderedData {
            user_id,
            sku_id: SkuId::new(),
            quantity: 3,
            order_id: OrderId::new(),
            stock_id: StockId::new(),
            account_id,
        });

        user.apply(ordered.clone()).unwrap();
        user.apply(ordered).unwrap();

        assert_eq!(user.pending_order_count(), 1);
    }

    #[test]
    fn removing_absent_order_on_replay_is_noop() {
        let (mut user, user_id, _) = created_user();
        let before = user.clone();

        user.apply(UserEvent::pending_order_canceled(user_id, OrderId::new()))
            .unwrap();

        assert_eq!(user, before);
    }

    #[test]
    fn duplicate_creation_event_is_noop() {
        let (mut user, user_id, account_id) = created_user();
        let before = user.clone();

        user.apply(UserEvent::user_created(user_id, "bob", account_id))
            .unwrap();
        assert_eq!(user, before);
    }

    #[test]
    fn conflicting_creation_event_leaves_state_untouched() {
        let (mut user, user_id, account_id) = created_user();
        let before = user.clone();

        let result = user.apply(UserEvent::user_created(user_id, "alice", account_id));
        assert!(matches!(
            result,
            Err(UserError::InconsistentEvent {
                event_type: "UserCreated",
                ..
            })
        ));
        assert_eq!(user, before);
    }

    #[test]
    fn order_event_for_another_user_is_inconsistent() {
        let (mut user, _, _) = created_user();
        let before = user.clone();

        let result = user.apply(UserEvent::pending_order_completed(
            UserId::new(),
            OrderId::new(),
        ));
        assert!(matches!(result, Err(UserError::InconsistentEvent { .. })));
        assert_eq!(user, before);
    }

    #[test]
    fn handle_dispatches_every_command() {
        let user = User::default();
        let user_id = UserId::new();

        let events = user
            .handle(&CreateUser::new(user_id, "bob", AccountId::new()).into())
            .unwrap();
        assert!(matches!(events[0], UserEvent::UserCreated(_)));

        let result = user.handle(&CompletePendingOrder::new(user_id, OrderId::new()).into());
        assert_eq!(result, Err(UserError::UserNotFound { user_id }));
    }
}
