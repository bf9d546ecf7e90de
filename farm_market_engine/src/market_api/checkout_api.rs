//! Turning a cart into an order.
//!
//! A checkout attempt moves through the phases in [`CheckoutPhase`]:
//!
//! 1. **Snapshot** the buyer's cart. An empty cart fails with `EmptyCart`.
//! 2. **Validate** every line against the live listing (`Started → Validated`). Every line whose listing is no longer
//!    active, or that asks for more than is available, is collected and the attempt fails with `StockConflict`.
//! 3. **Reserve** stock through the [`InventoryLedger`], one line at a time in ascending listing id order
//!    (`Validated → Reserved`). If any reservation fails, the ones already made are released.
//! 4. **Commit** the order, its line snapshots and the cleared cart in one transaction (`Reserved → Committed`). If
//!    the commit fails, every reservation is released.
//!
//! Any failure leaves the attempt `Aborted` with the cart, the ledger and the order history exactly as they were.
//! Nothing is retried automatically.
//!
//! Each attempt runs on its own tokio task. Dropping the future returned by [`CheckoutApi::checkout`] stops the caller
//! from waiting, but the attempt still runs to `Committed` or `Aborted`, so stock is never left reserved without an
//! order.
use std::{fmt::Debug, sync::Arc};

use fm_common::Quantity;
use log::*;

use crate::{
    db::traits::{CheckoutDatabase, CheckoutError, LedgerError},
    db_types::{CartSnapshot, Identity, NewOrder, NewOrderLine, Order, PaymentPolicy, ShippingDetails, UserId},
    events::{EventProducers, OrderPlacedEvent},
    market_api::checkout_objects::{CheckoutPhase, CheckoutRequest, ReservationSet, StockConflictLine},
    validation::{check_line_against_listing, line_subtotal, order_total, validate_shipping, ConflictReason},
};

pub struct CheckoutApi<B> {
    db: Arc<B>,
    producers: EventProducers,
    payment_policy: PaymentPolicy,
}

impl<B> Debug for CheckoutApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CheckoutApi ({} payments)", self.payment_policy)
    }
}

impl<B> Clone for CheckoutApi<B> {
    fn clone(&self) -> Self {
        Self { db: Arc::clone(&self.db), producers: self.producers.clone(), payment_policy: self.payment_policy }
    }
}

impl<B> CheckoutApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db: Arc::new(db), producers, payment_policy: PaymentPolicy::default() }
    }

    pub fn with_payment_policy(mut self, policy: PaymentPolicy) -> Self {
        self.payment_policy = policy;
        self
    }

    pub fn payment_policy(&self) -> PaymentPolicy {
        self.payment_policy
    }
}

impl<B> CheckoutApi<B>
where B: CheckoutDatabase
{
    /// Places an order for everything in the caller's cart.
    ///
    /// The shipping details are checked before anything else, and all missing fields are reported together. On
    /// success the new order is returned. Its status is decided by the configured [`PaymentPolicy`].
    pub async fn checkout(&self, identity: &Identity, request: CheckoutRequest) -> Result<Order, CheckoutError> {
        if !identity.is_buyer() {
            let reason = format!("Only buyers can check out, but the caller is a {}", identity.role);
            return Err(CheckoutError::Forbidden(reason));
        }
        let (shipping, payment_method) = validate_shipping(&request)?;
        let buyer = identity.user_id;
        let api = self.clone();
        let attempt = tokio::spawn(async move { api.place_order(buyer, shipping, payment_method).await });
        attempt.await.map_err(|e| {
            error!("🧾️ The checkout task for buyer {buyer} did not finish. {e}");
            CheckoutError::CommitFailure(format!("The checkout task did not finish. {e}"))
        })?
    }

    async fn place_order(
        &self,
        buyer: UserId,
        shipping: ShippingDetails,
        payment_method: String,
    ) -> Result<Order, CheckoutError> {
        let mut attempt = CheckoutAttempt::start(buyer);
        match self.run_attempt(&mut attempt, shipping, payment_method).await {
            Ok(order) => {
                let (id, total, status) = (order.id, order.total_price, order.status);
                info!("🧾️ Order {id} placed by buyer {buyer}. Total {total}, status {status}");
                self.publish_order_placed(&order).await;
                Ok(order)
            },
            Err(e) => {
                attempt.advance(CheckoutPhase::Aborted);
                info!("🧾️ Checkout for buyer {buyer} aborted. {e}");
                Err(e)
            },
        }
    }

    async fn run_attempt(
        &self,
        attempt: &mut CheckoutAttempt,
        shipping: ShippingDetails,
        payment_method: String,
    ) -> Result<Order, CheckoutError> {
        let snapshot =
            self.db.cart_snapshot(attempt.buyer).await.map_err(|e| CheckoutError::CommitFailure(e.to_string()))?;
        if snapshot.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let lines = self.validate_lines(&snapshot).await?;
        let total_price = order_total(lines.iter().map(|l| l.subtotal))?;
        attempt.advance(CheckoutPhase::Validated);

        let mut reservations = ReservationSet::new();
        if let Err(e) = self.reserve_lines(&lines, &mut reservations).await {
            let released = reservations.release_all(self.db.as_ref()).await;
            debug!("🧾️ Released {released} reservation(s) for buyer {} after a failed reservation", attempt.buyer);
            return Err(e);
        }
        attempt.advance(CheckoutPhase::Reserved);

        let order = NewOrder {
            buyer_id: attempt.buyer,
            status: self.payment_policy.initial_status(),
            total_price,
            shipping,
            payment_method,
            lines,
        };
        match self.db.commit_order(order).await {
            Ok(order) => {
                attempt.advance(CheckoutPhase::Committed);
                Ok(order)
            },
            Err(e) => {
                let released = reservations.release_all(self.db.as_ref()).await;
                warn!("🧾️ Commit failed for buyer {}. Released {released} reservation(s). {e}", attempt.buyer);
                Err(e)
            },
        }
    }

    /// Checks every line of the snapshot against the live listing and copies the listing's name, unit and price
    /// into the order line. All conflicts are collected before failing.
    async fn validate_lines(&self, snapshot: &CartSnapshot) -> Result<Vec<NewOrderLine>, CheckoutError> {
        let mut lines = Vec::with_capacity(snapshot.line_count());
        let mut conflicts = Vec::new();
        for line in &snapshot.lines {
            let listing = self.db.fetch_listing(line.listing_id).await.map_err(ledger_failure)?;
            match (check_line_against_listing(line.quantity, listing.as_ref()), listing) {
                (None, Some(listing)) => lines.push(NewOrderLine {
                    cart_line_id: line.line_id,
                    listing_id: listing.id,
                    subtotal: line_subtotal(listing.price, line.quantity)?,
                    product_name: listing.name,
                    product_unit: listing.unit,
                    quantity: line.quantity,
                    price_per_unit: listing.price,
                }),
                (reason, listing) => conflicts.push(StockConflictLine {
                    line_id: line.line_id,
                    listing_id: line.listing_id,
                    product_name: listing.as_ref().map(|l| l.name.clone()).unwrap_or_else(|| line.name.clone()),
                    requested: line.quantity,
                    available: listing.as_ref().map(|l| l.available).unwrap_or_default(),
                    reason: reason.unwrap_or(ConflictReason::ListingRemoved),
                }),
            }
        }
        if conflicts.is_empty() {
            Ok(lines)
        } else {
            Err(CheckoutError::StockConflict(conflicts))
        }
    }

    async fn reserve_lines(
        &self,
        lines: &[NewOrderLine],
        reservations: &mut ReservationSet,
    ) -> Result<(), CheckoutError> {
        let mut ordered = lines.iter().collect::<Vec<_>>();
        ordered.sort_by_key(|l| l.listing_id);
        for line in ordered {
            let (reason, available) = match self.db.reserve(line.listing_id, line.quantity).await {
                Ok(()) => {
                    reservations.record(line.listing_id, line.quantity);
                    continue;
                },
                Err(LedgerError::InsufficientStock { available, .. }) => (ConflictReason::InsufficientStock, available),
                Err(LedgerError::ListingNotFound(_)) => (ConflictReason::ListingRemoved, Quantity::ZERO),
                Err(e) => return Err(ledger_failure(e)),
            };
            return Err(CheckoutError::StockConflict(vec![StockConflictLine {
                line_id: line.cart_line_id,
                listing_id: line.listing_id,
                product_name: line.product_name.clone(),
                requested: line.quantity,
                available,
                reason,
            }]));
        }
        Ok(())
    }

    async fn publish_order_placed(&self, order: &Order) {
        if self.producers.order_placed_producer.is_empty() {
            return;
        }
        match self.db.fetch_order_lines(order.id).await {
            Ok(lines) => {
                debug!("📬️ Notifying order placed hook subscribers of order {}", order.id);
                self.producers.publish_order_placed(OrderPlacedEvent::new(order.clone(), lines)).await;
            },
            Err(e) => warn!("📬️ Order {} was placed, but its lines could not be read for the hook. {e}", order.id),
        }
    }
}

fn ledger_failure(e: LedgerError) -> CheckoutError {
    CheckoutError::CommitFailure(e.to_string())
}

/// Tracks the phase of a single checkout attempt.
struct CheckoutAttempt {
    buyer: UserId,
    phase: CheckoutPhase,
}

impl CheckoutAttempt {
    fn start(buyer: UserId) -> Self {
        trace!("🧾️ Checkout for buyer {buyer}: {}", CheckoutPhase::Started);
        Self { buyer, phase: CheckoutPhase::Started }
    }

    fn advance(&mut self, next: CheckoutPhase) {
        if !self.phase.can_advance_to(next) {
            error!("🧾️ Checkout for buyer {} cannot move from {} to {next}", self.buyer, self.phase);
            return;
        }
        debug!("🧾️ Checkout for buyer {}: {} → {next}", self.buyer, self.phase);
        self.phase = next;
    }
}
