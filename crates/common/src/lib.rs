//! Shared types for the shop workflow crates.

pub mod money;
pub mod types;

pub use money::Money;
pub use types::{AccountId, AggregateId, OrderId, SkuId, StockId, UserId};
