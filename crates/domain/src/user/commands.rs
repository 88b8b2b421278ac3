//! User commands.

use common::{AccountId, AggregateId, OrderId, SkuId, StockId, UserId};
use serde::{Deserialize, Serialize};

use crate::command::Command;

use super::User;

/// Command to create a new user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateUser {
    pub user_id: UserId,
    pub login: String,
    pub account_id: AccountId,
}

impl CreateUser {
    /// Creates a new CreateUser command.
    pub fn new(user_id: UserId, login: impl Into<String>, account_id: AccountId) -> Self {
        Self {
            user_id,
            login: login.into(),
            account_id,
        }
    }
}

impl Command for CreateUser {
    type Aggregate = User;

    fn aggregate_id(&self) -> AggregateId {
        self.user_id.into()
    }
}

/// Command to buy a sku immediately, opening a pending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuySkuNow {
    pub user_id: UserId,
    pub sku_id: SkuId,
    pub quantity: i32,
    pub stock_id: StockId,
}

impl BuySkuNow {
    /// Creates a new BuySkuNow command.
    pub fn new(user_id: UserId, sku_id: SkuId, quantity: i32, stock_id: StockId) -> Self {
        Self {
            user_id,
            sku_id,
            quantity,
            stock_id,
        }
    }
}

impl Command for BuySkuNow {
    type Aggregate = User;

    fn aggregate_id(&self) -> AggregateId {
        self.user_id.into()
    }
}

/// Command to cancel a pending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelPendingOrder {
    pub user_id: UserId,
    pub order_id: OrderId,
}

impl CancelPendingOrder {
    /// Creates a new CancelPendingOrder command.
    pub fn new(user_id: UserId, order_id: OrderId) -> Self {
        Self { user_id, order_id }
    }
}

impl Command for CancelPendingOrder {
    type Aggregate = User;

    fn aggregate_id(&self) -> AggregateId {
        self.user_id.into()
    }
}

/// Command to complete a pending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletePendingOrder {
    pub user_id: UserId,
    pub order_id: OrderId,
}

impl CompletePendingOrder {
    /// Creates a new CompletePendingOrder command.
    pub fn new(user_id: UserId, order_id: OrderId) -> Self {
        Self { user_id, order_id }
    }
}

impl Command for CompletePendingOrder {
    type Aggregate = User;

    fn aggregate_id(&self) -> AggregateId {
        self.user_id.into()
    }
}

/// Any command the user aggregate accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum UserCommand {
    CreateUser(CreateUser),
    BuySkuNow(BuySkuNow),
    CancelPendingOrder(CancelPendingOrder),
    CompletePendingOrder(CompletePendingOrder),
}

impl UserCommand {
    /// Returns the command name, used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            UserCommand::CreateUser(_) => "CreateUser",
            UserCommand::BuySkuNow(_) => "BuySkuNow",
            UserCommand::CancelPendingOrder(_) => "CancelPendingOrder",
            UserCommand::CompletePendingOrder(_) => "CompletePendingOrder",
        }
    }

    /// Returns the user the command is addressed to.
    pub fn user_id(&self) -> UserId {
        match self {
            UserCommand::CreateUser(cmd) => cmd.user_id,
            UserCommand::BuySkuNow(cmd) => cmd.user_id,
            UserCommand::CancelPendingOrder(cmd) => cmd.user_id,
            UserCommand::CompletePendingOrder(cmd) => cmd.user_id,
        }
    }
}

impl Command for UserCommand {
    type Aggregate = User;

    fn aggregate_id(&self) -> AggregateId {
        self.user_id().into()
    }
}

impl From<CreateUser> for UserCommand {
    fn from(cmd: CreateUser) -> Self {
        UserCommand::CreateUser(cmd)
    }
}

impl From<BuySkuNow> for UserCommand {
    fn from(cmd: BuySkuNow) -> Self {
        UserCommand::BuySkuNow(cmd)
    }
}

impl From<CancelPendingOrder> for UserCommand {
    fn from(cmd: CancelPendingOrder) -> Self {
        UserCommand::CancelPendingOrder(cmd)
    }
}

impl From<CompletePendingOrder> for UserCommand {
    fn from(cmd: CompletePendingOrder) -> Self {
        UserCommand::CompletePendingOrder(cmd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_target_the_user_stream() {
        let user_id = UserId::new();

        let cmd = CreateUser::new(user_id, "bob", AccountId::new());
        assert_eq!(cmd.aggregate_id(), AggregateId::from(user_id));

        let cmd = BuySkuNow::new(user_id, SkuId::new(), 2, StockId::new());
        assert_eq!(cmd.aggregate_id(), AggregateId::from(user_id));
    }

    #[test]
    fn user_command_wraps_each_kind() {
        let user_id = UserId::new();
        let order_id = OrderId::new();

        let cmd: UserCommand = CancelPendingOrder::new(user_id, order_id).into();
        assert_eq!(cmd.kind(), "CancelPendingOrder");
        assert_eq!(cmd.user_id(), user_id);

        let cmd: UserCommand = CompletePendingOrder::new(user_id, order_id).into();
        assert_eq!(cmd.kind(), "CompletePendingOrder");
        assert_eq!(cmd.aggregate_id(), AggregateId::from(user_id));
    }
}
