use fm_common::Money;
use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderId, OrderStatusType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatusType,
}

/// Returned by a successful checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPlaced {
    pub order_id: OrderId,
    pub status: OrderStatusType,
    pub total_price: Money,
}

impl From<&Order> for OrderPlaced {
    fn from(order: &Order) -> Self {
        Self { order_id: order.id, status: order.status, total_price: order.total_price }
    }
}
