use std::future::Future;

use thiserror::Error;

use crate::{
    db_types::{NewOrder, Order, OrderId, OrderLine, OrderStatusType, UserId},
    market_api::checkout_objects::StockConflictLine,
    validation::ValidationError,
};

#[derive(Debug, Clone, Error)]
pub enum CheckoutError {
    #[error("Forbidden. {0}")]
    Forbidden(String),
    #[error("The cart is empty")]
    EmptyCart,
    #[error("Invalid checkout request. {0}")]
    ValidationError(#[from] ValidationError),
    #[error("{} cart line(s) cannot be fulfilled: {}", .0.len(), display_conflicts(.0))]
    StockConflict(Vec<StockConflictLine>),
    #[error("The order could not be committed. {0}")]
    CommitFailure(String),
}

fn display_conflicts(lines: &[StockConflictLine]) -> String {
    lines.iter().map(|l| l.to_string()).collect::<Vec<_>>().join("; ")
}

impl From<sqlx::Error> for CheckoutError {
    fn from(e: sqlx::Error) -> Self {
        CheckoutError::CommitFailure(e.to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum OrderHistoryError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Forbidden. {0}")]
    Forbidden(String),
    #[error("An order cannot move from {from} to {to}")]
    InvalidStatusTransition { from: OrderStatusType, to: OrderStatusType },
}

impl From<sqlx::Error> for OrderHistoryError {
    fn from(e: sqlx::Error) -> Self {
        OrderHistoryError::DatabaseError(e.to_string())
    }
}

/// Persistence of orders and their immutable line snapshots.
pub trait OrderManagement {
    /// In a single atomic transaction,
    /// * inserts the order,
    /// * inserts one `OrderLine` per entry of `order.lines`, copying name, unit and price as given,
    /// * clears the buyer's cart: every line is removed and the cart is marked `Cleared`.
    ///
    /// This is the only way a cart is cleared. If the cart no longer holds exactly the lines (and quantities) the
    /// order was built from, nothing is written and `CommitFailure` is returned.
    /// Stock is not touched here; reservations are made beforehand through the [`crate::InventoryLedger`].
    fn commit_order(&self, order: NewOrder) -> impl Future<Output = Result<Order, CheckoutError>> + Send;

    fn fetch_order(&self, order_id: OrderId) -> impl Future<Output = Result<Option<Order>, OrderHistoryError>> + Send;

    fn fetch_order_lines(
        &self,
        order_id: OrderId,
    ) -> impl Future<Output = Result<Vec<OrderLine>, OrderHistoryError>> + Send;

    /// All orders placed by the buyer, newest first.
    fn fetch_orders_for_buyer(
        &self,
        buyer: UserId,
    ) -> impl Future<Output = Result<Vec<Order>, OrderHistoryError>> + Send;

    /// Moves an order from `from` to `to`, provided it is still in `from`. Returns the updated order, or `None` if
    /// the order is missing or its status has changed in the meantime.
    fn update_order_status(
        &self,
        order_id: OrderId,
        from: OrderStatusType,
        to: OrderStatusType,
    ) -> impl Future<Output = Result<Option<Order>, OrderHistoryError>> + Send;
}
