//! The BuyNow process manager.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use common::{AccountId, AggregateId, Money, OrderId, SkuId, StockId, UserId};
use domain::{CancelPendingOrder, CompletePendingOrder, SkuPurchaseOrderedData, UserCommand};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SagaError};
use crate::services::price::{PriceCalculator, PriceError};
use crate::state::BuyNowStatus;

/// Persisted state of one buy-now process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyNowState {
    /// Correlation id; the order id unless overridden at start.
    pub process_id: AggregateId,
    pub status: BuyNowStatus,
    pub user_id: UserId,
    pub sku_id: SkuId,
    pub quantity: i32,
    pub stock_id: StockId,
    pub account_id: AccountId,
    pub order_id: OrderId,

    /// Total price once resolved.
    pub price: Option<Money>,

    /// Why the process faulted, if it did.
    pub fault_reason: Option<String>,

    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BuyNowState {
    /// Creates the initial state from a purchase.
    pub fn new(event: &SkuPurchaseOrderedData, process_id: Option<AggregateId>) -> Self {
        let now = Utc::now();
        Self {
            process_id: process_id.unwrap_or_else(|| event.order_id.into()),
            status: BuyNowStatus::Initial,
            user_id: event.user_id,
            sku_id: event.sku_id,
            quantity: event.quantity,
            stock_id: event.stock_id,
            account_id: event.account_id,
            order_id: event.order_id,
            price: None,
            fault_reason: None,
            started_at: now,
            updated_at: now,
        }
    }

    /// Returns true if the process has finished.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    fn transition(&mut self, status: BuyNowStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}

/// Reacts to one `SkuPurchaseOrdered` event: resolves the price and settles
/// the order with a completion or a compensating cancellation.
///
/// Each call to [`BuyNow::advance`] performs one transition so the host can
/// persist the state in between.
pub struct BuyNow<P: PriceCalculator> {
    state: BuyNowState,
    calculator: Arc<P>,
    price_timeout: Duration,
}

impl<P: PriceCalculator> BuyNow<P> {
    pub(crate) fn new(state: BuyNowState, calculator: Arc<P>, price_timeout: Duration) -> Self {
        Self {
            state,
            calculator,
            price_timeout,
        }
    }

    /// Returns the current state.
    pub fn state(&self) -> &BuyNowState {
        &self.state
    }

    /// Consumes the process, returning its state.
    pub fn into_state(self) -> BuyNowState {
        self.state
    }

    /// Accepts a (possibly redelivered) trigger.
    ///
    /// Returns true if the process still has work to do. Terminal processes
    /// ignore redelivery.
    pub fn begin(&self, event: &SkuPurchaseOrderedData) -> Result<bool> {
        if event.order_id != self.state.order_id {
            return Err(SagaError::CorrelationMismatch {
                process_id: self.state.process_id,
                expected: self.state.order_id,
                actual: event.order_id,
            });
        }

        Ok(!self.state.is_terminal())
    }

    /// Performs the next transition and returns the command it issues, if any.
    pub async fn advance(&mut self) -> Option<UserCommand> {
        match self.state.status {
            BuyNowStatus::Initial => {
                self.state.transition(BuyNowStatus::PriceResolving);
                None
            }
            BuyNowStatus::PriceResolving => self.resolve_price().await,
            BuyNowStatus::Resolved => {
                self.state.transition(BuyNowStatus::Completed);
                Some(
                    CompletePendingOrder::new(self.state.user_id, self.state.order_id).into(),
                )
            }
            BuyNowStatus::Completed | BuyNowStatus::Canceled | BuyNowStatus::Faulted => None,
        }
    }

    /// Runs the process to a terminal state, returning every issued command.
    pub async fn handle(&mut self, event: &SkuPurchaseOrderedData) -> Result<Vec<UserCommand>> {
        let mut commands = Vec::new();
        if !self.begin(event)? {
            return Ok(commands);
        }

        while !self.state.is_terminal() {
            if let Some(command) = self.advance().await {
                commands.push(command);
            }
        }

        Ok(commands)
    }

    async fn resolve_price(&mut self) -> Option<UserCommand> {
        let started = Instant::now();
        let lookup = tokio::time::timeout(
            self.price_timeout,
            self.calculator
                .resolve_price(self.state.sku_id, self.state.quantity),
        )
        .await;
        metrics::histogram!("buy_now_price_lookup_seconds")
            .record(started.elapsed().as_secs_f64());

        match lookup {
            Ok(Ok(price)) => {
                tracing::info!(process_id = %self.state.process_id, %price, "Price resolved");
                self.state.price = Some(price);
                self.state.transition(BuyNowStatus::Resolved);
                None
            }
            Ok(Err(PriceError::PriceNotFound(sku_id))) => {
                tracing::info!(
                    process_id = %self.state.process_id,
                    %sku_id,
                    "No price for sku, canceling order"
                );
                self.state.transition(BuyNowStatus::Canceled);
                Some(CancelPendingOrder::new(self.state.user_id, self.state.order_id).into())
            }
            Ok(Err(e)) => {
                self.fault(e.to_string());
                None
            }
            Err(_) => {
                self.fault(format!(
                    "price lookup timed out after {}ms",
                    self.price_timeout.as_millis()
                ));
                None
            }
        }
    }

    /// Aligns the process with how its order was actually settled, after
    /// the issued command found the order no longer pending.
    ///
    /// `settled` is the outcome recorded by the user aggregate, if any.
    pub(crate) fn settled_externally(&mut self, settled: Option<BuyNowStatus>) {
        match settled {
            Some(status) if status == self.state.status => {}
            Some(status) => {
                tracing::warn!(
                    process_id = %self.state.process_id,
                    issued = %self.state.status,
                    settled = %status,
                    "Order was settled the other way"
                );
                if status == BuyNowStatus::Canceled {
                    self.state.price = None;
                }
                self.state.transition(status);
            }
            None => self.fault(format!(
                "order {} is no longer pending and has no recorded settlement",
                self.state.order_id
            )),
        }
    }

    pub(crate) fn fault(&mut self, reason: String) {
        tracing::warn!(process_id = %self.state.process_id, %reason, "Process faulted");
        self.state.fault_reason = Some(reason);
        self.state.transition(BuyNowStatus::Faulted);
    }
}
