use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderLine, OrderStatusType};

/// Published once an order has been committed and the buyer's cart cleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPlacedEvent {
    pub order: Order,
    pub lines: Vec<OrderLine>,
}

impl OrderPlacedEvent {
    pub fn new(order: Order, lines: Vec<OrderLine>) -> Self {
        Self { order, lines }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusChangedEvent {
    pub order: Order,
    pub old_status: OrderStatusType,
}

impl OrderStatusChangedEvent {
    pub fn new(order: Order, old_status: OrderStatusType) -> Self {
        Self { order, old_status }
    }

    pub fn new_status(&self) -> OrderStatusType {
        self.order.status
    }
}
