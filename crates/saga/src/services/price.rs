//! Price lookup trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{Money, SkuId};
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors returned by a price lookup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PriceError {
    /// No price is registered for the sku.
    #[error("No price registered for sku {0}")]
    PriceNotFound(SkuId),

    /// The price source could not answer.
    #[error("Price lookup unavailable: {0}")]
    Unavailable(String),

    /// The total does not fit the money type.
    #[error("Price of {quantity} x sku {sku_id} overflows")]
    Overflow { sku_id: SkuId, quantity: i32 },
}

/// Trait for resolving the price of a purchase.
#[async_trait]
pub trait PriceCalculator: Send + Sync {
    /// Returns the total price of `quantity` units of a sku.
    async fn resolve_price(&self, sku_id: SkuId, quantity: i32) -> Result<Money, PriceError>;

    /// Registers the unit price of a sku, replacing any previous price.
    async fn register_price(&self, sku_id: SkuId, unit_price: Money);
}

#[derive(Debug, Default)]
struct InMemoryPriceState {
    prices: HashMap<SkuId, Money>,
    unavailable: Option<String>,
}

/// In-memory price table.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPriceCalculator {
    state: Arc<RwLock<InMemoryPriceState>>,
}

impl InMemoryPriceCalculator {
    /// Creates an empty price table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every lookup fail with `Unavailable` until cleared with None.
    pub async fn set_unavailable(&self, reason: Option<String>) {
        self.state.write().await.unavailable = reason;
    }
}

#[async_trait]
impl PriceCalculator for InMemoryPriceCalculator {
    async fn resolve_price(&self, sku_id: SkuId, quantity: i32) -> Result<Money, PriceError> {
        let state = self.state.read().await;

        if let Some(reason) = &state.unavailable {
            return Err(PriceError::Unavailable(reason.clone()));
        }

        let unit_price = state
            .prices
            .get(&sku_id)
            .copied()
            .ok_or(PriceError::PriceNotFound(sku_id))?;

        unit_price
            .checked_multiply(i64::from(quantity))
            .ok_or(PriceError::Overflow { sku_id, quantity })
    }

    async fn register_price(&self, sku_id: SkuId, unit_price: Money) {
        self.state.write().await.prices.insert(sku_id, unit_price);
    }
}
