use std::future::Future;

use fm_common::Quantity;
use thiserror::Error;

use crate::db_types::{Listing, ListingId};

#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Listing {0} does not exist")]
    ListingNotFound(ListingId),
    #[error("Quantities moved through the ledger must be positive, but got {0}")]
    InvalidQuantity(Quantity),
    #[error("Insufficient stock for listing {listing_id}. Requested {requested}, but only {available} is available")]
    InsufficientStock { listing_id: ListingId, requested: Quantity, available: Quantity },
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        LedgerError::DatabaseError(e.to_string())
    }
}

/// The inventory ledger is the only writer of a listing's available quantity.
pub trait InventoryLedger {
    /// The live state of a listing, or `None` if it has been deleted.
    fn fetch_listing(&self, listing_id: ListingId) -> impl Future<Output = Result<Option<Listing>, LedgerError>> + Send;

    /// Atomically decrements the listing's availability by `quantity` if, and only if, at least that much is
    /// available. Otherwise fails with `InsufficientStock` and changes nothing.
    ///
    /// Implementations must perform the check and the decrement as one compare-and-decrement. Concurrent callers for
    /// the same listing can never drive availability below zero.
    fn reserve(
        &self,
        listing_id: ListingId,
        quantity: Quantity,
    ) -> impl Future<Output = Result<(), LedgerError>> + Send;

    /// Compensates an earlier successful [`InventoryLedger::reserve`] by adding `quantity` back.
    fn release(
        &self,
        listing_id: ListingId,
        quantity: Quantity,
    ) -> impl Future<Output = Result<(), LedgerError>> + Send;
}
