//! User service providing the command submission API.

use common::UserId;
use event_store::EventStore;

use crate::command::{CommandHandler, CommandResult};
use crate::error::DomainError;

use super::{
    BuySkuNow, CancelPendingOrder, CompletePendingOrder, CreateUser, User, UserCommand, UserError,
};

impl From<UserError> for DomainError {
    fn from(e: UserError) -> Self {
        DomainError::User(e)
    }
}

/// Service for managing users.
///
/// Every command goes through [`UserService::submit`], which routes it to the
/// addressed user, records the outcome, and returns the produced events.
pub struct UserService<S: EventStore> {
    handler: CommandHandler<S, User>,
}

impl<S: EventStore> UserService<S> {
    /// Creates a new user service with the given event store.
    pub fn new(store: S) -> Self {
        Self {
            handler: CommandHandler::new(store),
        }
    }

    /// Submits any user command.
    #[tracing::instrument(skip(self), fields(kind = command.kind(), user_id = %command.user_id()))]
    pub async fn submit(&self, command: UserCommand) -> Result<CommandResult<User>, DomainError> {
        let kind = command.kind();
        let user_id = command.user_id();

        let result = self
            .handler
            .execute(user_id.into(), |user| user.handle(&command))
            .await;

        match &result {
            Ok(outcome) => {
                metrics::counter!("user_commands_accepted_total", "kind" => kind).increment(1);
                tracing::debug!(
                    events = outcome.events.len(),
                    version = %outcome.new_version,
                    "Command accepted"
                );
            }
            Err(e) => {
                metrics::counter!("user_commands_rejected_total", "kind" => kind).increment(1);
                tracing::warn!(error = %e, "Command rejected");
            }
        }

        result
    }

    /// Creates a new user.
    pub async fn create_user(&self, cmd: CreateUser) -> Result<CommandResult<User>, DomainError> {
        self.submit(cmd.into()).await
    }

    /// Buys a sku now, opening a pending order.
    pub async fn buy_sku_now(&self, cmd: BuySkuNow) -> Result<CommandResult<User>, DomainError> {
        self.submit(cmd.into()).await
    }

    /// Cancels a pending order.
    pub async fn cancel_pending_order(
        &self,
        cmd: CancelPendingOrder,
    ) -> Result<CommandResult<User>, DomainError> {
        self.submit(cmd.into()).await
    }

    /// Completes a pending order.
    pub async fn complete_pending_order(
        &self,
        cmd: CompletePendingOrder,
    ) -> Result<CommandResult<User>, DomainError> {
        self.submit(cmd.into()).await
    }

    /// Loads a user by ID.
    ///
    /// Returns None if the user doesn't exist.
    #[tracing::instrument(skip(self))]
    pub async fn get_user(&self, user_id: UserId) -> Result<Option<User>, DomainError> {
        self.handler.load_existing(user_id.into()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::UserEvent;
    use common::{AccountId, OrderId, SkuId, StockId};
    use event_store::InMemoryEventStore;

    async fn create_bob(service: &UserService<InMemoryEventStore>) -> UserId {
        let user_id = UserId::new();
        service
            .create_user(CreateUser::new(user_id, "bob", AccountId::new()))
            .await
            .unwrap();
        user_id
    }

    #[tokio::test]
    async fn create_user() {
        let service = UserService::new(InMemoryEventStore::new());
        let user_id = UserId::new();
        let account_id = AccountId::new();

        let result = service
            .create_user(CreateUser::new(user_id, "bob", account_id))
            .await
            .unwrap();

        assert_eq!(result.aggregate.user_id(), Some(user_id));
        assert_eq!(result.aggregate.account_id(), Some(account_id));
        assert_eq!(
            result.events,
            vec![UserEvent::user_created(user_id, "bob", account_id)]
        );
    }

    #[tokio::test]
    async fn buy_then_complete() {
        let service = UserService::new(InMemoryEventStore::new());
        let user_id = create_bob(&service).await;

        let result = service
            .buy_sku_now(BuySkuNow::new(user_id, SkuId::new(), 10, StockId::new()))
            .await
            .unwrap();
        let UserEvent::SkuPurchaseOrdered(ordered) = result.events[0].clone() else {
            panic!("Expected SkuPurchaseOrdered event");
        };

        let result = service
            .complete_pending_order(CompletePendingOrder::new(user_id, ordered.order_id))
            .await
            .unwrap();
        assert_eq!(result.aggregate.pending_order_count(), 0);
    }

    #[tokio::test]
    async fn rejected_command_returns_user_error() {
        let service = UserService::new(InMemoryEventStore::new());
        let user_id = create_bob(&service).await;
        let order_id = OrderId::new();

        let result = service
            .cancel_pending_order(CancelPendingOrder::new(user_id, order_id))
            .await;

        match result {
            Err(e) => assert_eq!(
                e.as_user_error(),
                Some(&UserError::OrderNotFound { order_id })
            ),
            Ok(_) => panic!("Expected OrderNotFound"),
        }
    }

    #[tokio::test]
    async fn get_user() {
        let service = UserService::new(InMemoryEventStore::new());

        let missing = service.get_user(UserId::new()).await.unwrap();
        assert!(missing.is_none());

        let user_id = create_bob(&service).await;
        let user = service.get_user(user_id).await.unwrap().unwrap();
        assert_eq!(user.login(), "bob");
    }
}
