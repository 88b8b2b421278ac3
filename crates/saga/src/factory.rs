//! Construction of BuyNow processes.

use std::sync::Arc;
use std::time::Duration;

use common::AggregateId;
use domain::SkuPurchaseOrderedData;

use crate::process::{BuyNow, BuyNowState};
use crate::services::price::PriceCalculator;

/// Default bound on a single price lookup.
pub const DEFAULT_PRICE_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings shared by every BuyNow process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessConfig {
    /// A lookup that takes longer faults the process.
    pub price_timeout: Duration,
}

impl ProcessConfig {
    pub fn new(price_timeout: Duration) -> Self {
        Self { price_timeout }
    }
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PRICE_TIMEOUT)
    }
}

/// Builds BuyNow processes either from persisted state or from a trigger.
pub struct BuyNowProcessManagerFactory<P: PriceCalculator> {
    calculator: Arc<P>,
    config: ProcessConfig,
}

impl<P: PriceCalculator> Clone for BuyNowProcessManagerFactory<P> {
    fn clone(&self) -> Self {
        Self {
            calculator: self.calculator.clone(),
            config: self.config.clone(),
        }
    }
}

impl<P: PriceCalculator> BuyNowProcessManagerFactory<P> {
    /// Creates a factory whose processes share one price calculator.
    pub fn new(calculator: Arc<P>, config: ProcessConfig) -> Self {
        Self { calculator, config }
    }

    /// Recreates a process from its persisted state.
    pub fn restore(&self, state: BuyNowState) -> BuyNow<P> {
        BuyNow::new(state, self.calculator.clone(), self.config.price_timeout)
    }

    /// Starts a fresh process for a purchase.
    ///
    /// The process id defaults to the order id.
    pub fn start(
        &self,
        event: &SkuPurchaseOrderedData,
        process_id: Option<AggregateId>,
    ) -> BuyNow<P> {
        self.restore(BuyNowState::new(event, process_id))
    }
}
