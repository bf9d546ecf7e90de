use std::fmt::Debug;

use log::*;

use crate::{
    db::traits::{OrderHistoryError, OrderManagement},
    db_types::{Identity, Order, OrderId, OrderStatusType, OrderWithLines},
    events::{EventProducers, OrderStatusChangedEvent},
};

/// Read access to placed orders, and the admin-only status lifecycle.
///
/// Orders are immutable once committed. The only thing that changes afterwards is the status, and only along
/// Pending → Processing → Shipped → Completed, or to Cancelled from any state that is not terminal.
pub struct OrderHistoryApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for OrderHistoryApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderHistoryApi")
    }
}

impl<B> OrderHistoryApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> OrderHistoryApi<B>
where B: OrderManagement
{
    /// The order and its line snapshots. Only the buyer who placed it, or an admin, may see it.
    pub async fn order_by_id(
        &self,
        identity: &Identity,
        order_id: OrderId,
    ) -> Result<OrderWithLines, OrderHistoryError> {
        let order = self.db.fetch_order(order_id).await?.ok_or(OrderHistoryError::OrderNotFound(order_id))?;
        let is_owner = order.buyer_id == Some(identity.user_id);
        if !(is_owner || identity.is_admin()) {
            return Err(OrderHistoryError::Forbidden(format!("Order {order_id} does not belong to {identity}")));
        }
        let lines = self.db.fetch_order_lines(order_id).await?;
        Ok(OrderWithLines { order, lines })
    }

    /// The caller's orders, newest first.
    pub async fn orders_for_buyer(&self, identity: &Identity) -> Result<Vec<Order>, OrderHistoryError> {
        if !identity.is_buyer() {
            return Err(OrderHistoryError::Forbidden(format!("Only buyers have an order history, not {identity}")));
        }
        let orders = self.db.fetch_orders_for_buyer(identity.user_id).await?;
        trace!("🧾️ {} orders found for {identity}", orders.len());
        Ok(orders)
    }

    /// Moves an order to a new status. Admins only.
    pub async fn update_status(
        &self,
        identity: &Identity,
        order_id: OrderId,
        new_status: OrderStatusType,
    ) -> Result<Order, OrderHistoryError> {
        if !identity.is_admin() {
            return Err(OrderHistoryError::Forbidden(format!("Only admins can change order status, not {identity}")));
        }
        let order = self.db.fetch_order(order_id).await?.ok_or(OrderHistoryError::OrderNotFound(order_id))?;
        let old_status = order.status;
        if !old_status.can_transition_to(new_status) {
            return Err(OrderHistoryError::InvalidStatusTransition { from: old_status, to: new_status });
        }
        let updated = match self.db.update_order_status(order_id, old_status, new_status).await? {
            Some(order) => order,
            None => {
                // Someone else changed the status in the meantime. Report against the status it has now.
                let current = self.db.fetch_order(order_id).await?;
                return match current {
                    Some(current) => {
                        Err(OrderHistoryError::InvalidStatusTransition { from: current.status, to: new_status })
                    },
                    None => Err(OrderHistoryError::OrderNotFound(order_id)),
                };
            },
        };
        info!("🧾️ Order {order_id} moved from {old_status} to {new_status} by {identity}");
        if !self.producers.status_changed_producer.is_empty() {
            debug!("📬️ Notifying order status hook subscribers");
            self.producers.publish_status_changed(OrderStatusChangedEvent::new(updated.clone(), old_status)).await;
        }
        Ok(updated)
    }
}
