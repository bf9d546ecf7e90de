use std::fmt::Display;

use fm_common::Quantity;
use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{CartLineId, ListingId},
    validation::ConflictReason,
    InventoryLedger,
};

/// The checkout form submitted by a buyer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    #[serde(default)]
    pub recipient_name: String,
    #[serde(default)]
    pub recipient_phone: String,
    #[serde(default)]
    pub shipping_address: String,
    /// e.g. `cod` or `gcash_simulated`. No gateway is contacted.
    #[serde(default)]
    pub payment_method: String,
}

/// One cart line that could not be satisfied at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockConflictLine {
    pub line_id: CartLineId,
    pub listing_id: ListingId,
    pub product_name: String,
    pub requested: Quantity,
    pub available: Quantity,
    pub reason: ConflictReason,
}

impl Display for StockConflictLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.reason {
            ConflictReason::ListingUnavailable(status) => {
                write!(f, "'{}' is no longer available (status: {status})", self.product_name)
            },
            ConflictReason::ListingRemoved => write!(f, "'{}' has been removed", self.product_name),
            ConflictReason::InsufficientStock => write!(
                f,
                "Insufficient stock for '{}'. Requested {}, available {}",
                self.product_name, self.requested, self.available
            ),
        }
    }
}

/// The phases of a single checkout attempt.
///
/// `Started → Validated → Reserved → Committed` on success. Any phase before `Committed` may move to `Aborted`,
/// which undoes every reservation made by the attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckoutPhase {
    Started,
    Validated,
    Reserved,
    Committed,
    Aborted,
}

impl CheckoutPhase {
    pub fn can_advance_to(&self, next: CheckoutPhase) -> bool {
        use CheckoutPhase::*;
        matches!(
            (self, next),
            (Started, Validated) |
                (Validated, Reserved) |
                (Reserved, Committed) |
                (Started | Validated | Reserved, Aborted)
        )
    }
}

impl Display for CheckoutPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CheckoutPhase::Started => "Started",
            CheckoutPhase::Validated => "Validated",
            CheckoutPhase::Reserved => "Reserved",
            CheckoutPhase::Committed => "Committed",
            CheckoutPhase::Aborted => "Aborted",
        };
        f.write_str(s)
    }
}

/// The reservations made by one checkout attempt, in the order they were made.
#[derive(Debug, Default)]
pub struct ReservationSet {
    reservations: Vec<(ListingId, Quantity)>,
}

impl ReservationSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, listing_id: ListingId, quantity: Quantity) {
        self.reservations.push((listing_id, quantity));
    }

    /// Releases every reservation, newest first. A release that fails is logged and the rest are still attempted.
    /// Returns the number of reservations that were released.
    pub async fn release_all<B: InventoryLedger>(&mut self, ledger: &B) -> usize {
        let mut released = 0;
        while let Some((listing_id, quantity)) = self.reservations.pop() {
            match ledger.release(listing_id, quantity).await {
                Ok(()) => {
                    released += 1;
                    trace!("📦️ Released {quantity} of listing {listing_id}");
                },
                Err(e) => {
                    error!(
                        "📦️ Could not release {quantity} of listing {listing_id}: {e}. The listing's availability is \
                         now understated and must be corrected by hand."
                    );
                },
            }
        }
        released
    }
}
