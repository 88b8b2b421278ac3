//! BuyNow process status machine.

use serde::{Deserialize, Serialize};

/// The status of a buy-now process in its lifecycle.
///
/// State transitions:
/// ```text
/// Initial ──► PriceResolving ──┬──► Resolved ──► Completed
///                              ├──► Canceled
///                              └──► Faulted
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum BuyNowStatus {
    /// Process was created from the trigger but has not started work.
    #[default]
    Initial,

    /// Waiting on the price lookup.
    PriceResolving,

    /// Price is known; the order can be completed.
    Resolved,

    /// The order was completed (terminal state).
    Completed,

    /// No price exists for the sku; the order was canceled (terminal state).
    Canceled,

    /// The price lookup failed for another reason (terminal state).
    Faulted,
}

impl BuyNowStatus {
    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BuyNowStatus::Completed | BuyNowStatus::Canceled | BuyNowStatus::Faulted
        )
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            BuyNowStatus::Initial => "Initial",
            BuyNowStatus::PriceResolving => "PriceResolving",
            BuyNowStatus::Resolved => "Resolved",
            BuyNowStatus::Completed => "Completed",
            BuyNowStatus::Canceled => "Canceled",
            BuyNowStatus::Faulted => "Faulted",
        }
    }
}

impl std::fmt::Display for BuyNowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
