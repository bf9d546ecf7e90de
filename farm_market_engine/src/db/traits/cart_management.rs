use std::future::Future;

use fm_common::Quantity;
use thiserror::Error;

use crate::{
    db_types::{CartLine, CartLineId, CartSnapshot, CartState, ListingId, ListingStatus, UserId},
    validation::ValidationError,
};

#[derive(Debug, Clone, Error)]
pub enum CartError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Forbidden. {0}")]
    Forbidden(String),
    #[error("Listing {0} does not exist")]
    ListingNotFound(ListingId),
    #[error("Listing {0} cannot be purchased (status: {1})")]
    ListingNotActive(ListingId, ListingStatus),
    #[error("Cart line {0} does not exist")]
    LineNotFound(CartLineId),
    #[error("Invalid quantity. {0}")]
    InvalidQuantity(#[from] ValidationError),
    #[error(
        "Insufficient stock for listing {listing_id}. The cart would hold {requested}, but only {available} is \
         available"
    )]
    InsufficientStock { listing_id: ListingId, requested: Quantity, available: Quantity },
}

impl From<sqlx::Error> for CartError {
    fn from(e: sqlx::Error) -> Self {
        CartError::DatabaseError(e.to_string())
    }
}

/// The `CartManagement` trait defines the cart store. Each buyer owns at most one cart, created lazily by the first
/// add, with at most one line per listing.
///
/// None of these methods check the caller's role; that is the job of [`crate::CartApi`]. They do check that a line
/// belongs to the given buyer.
pub trait CartManagement {
    /// Adds `quantity` of a listing to the buyer's cart, merging with an existing line for the same listing.
    ///
    /// The listing must be `active`, and the merged quantity must not exceed the listing's current availability. On
    /// any failure the cart is left exactly as it was, including when the cart did not exist yet.
    fn add_or_merge(
        &self,
        buyer: UserId,
        listing_id: ListingId,
        quantity: Quantity,
    ) -> impl Future<Output = Result<CartLine, CartError>> + Send;

    /// Replaces the quantity of a cart line. A quantity of zero or less removes the line, and `None` is returned.
    fn set_quantity(
        &self,
        buyer: UserId,
        line_id: CartLineId,
        quantity: Quantity,
    ) -> impl Future<Output = Result<Option<CartLine>, CartError>> + Send;

    /// Removes a line from the buyer's cart. Fails with `LineNotFound` or `Forbidden` for missing or foreign lines.
    fn remove_line(&self, buyer: UserId, line_id: CartLineId) -> impl Future<Output = Result<(), CartError>> + Send;

    /// A read-only view of the cart, each line joined with its listing's live price and availability, ordered by
    /// listing id. Takes no locks.
    fn cart_snapshot(&self, buyer: UserId) -> impl Future<Output = Result<CartSnapshot, CartError>> + Send;

    fn cart_state(&self, buyer: UserId) -> impl Future<Output = Result<CartState, CartError>> + Send;

    /// The number of distinct lines in the cart.
    fn line_count(&self, buyer: UserId) -> impl Future<Output = Result<i64, CartError>> + Send;
}
