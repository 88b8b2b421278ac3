//! BuyNow purchase workflow.
//!
//! A BuyNow process reacts to a user's `SkuPurchaseOrdered` event:
//! 1. Resolve the total price of the purchase
//! 2. Complete the pending order, or cancel it when the sku has no price
//!
//! Lookup failures and timeouts fault the process without touching the order.
//! The [`BuyNowCoordinator`] hosts processes, persists their state, and sends
//! the commands they issue back to the user aggregate.

pub mod coordinator;
pub mod error;
pub mod factory;
pub mod process;
pub mod repository;
pub mod services;
pub mod state;

pub use coordinator::BuyNowCoordinator;
pub use error::{Result, SagaError};
pub use factory::{BuyNowProcessManagerFactory, DEFAULT_PRICE_TIMEOUT, ProcessConfig};
pub use process::{BuyNow, BuyNowState};
pub use repository::{InMemoryProcessStateRepository, ProcessStateRepository};
pub use services::{InMemoryPriceCalculator, PriceCalculator, PriceError};
pub use state::BuyNowStatus;
