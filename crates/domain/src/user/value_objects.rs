//! Value objects owned by the user aggregate.

use common::{OrderId, SkuId, StockId};
use serde::{Deserialize, Serialize};

/// An order placed through buy-now that is neither completed nor canceled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingOrder {
    pub order_id: OrderId,
    pub sku_id: SkuId,
    pub quantity: i32,
    pub stock_id: StockId,
}
