use std::fmt::Debug;

use fm_common::Quantity;
use log::*;

use crate::{
    db::traits::{CartError, CartManagement},
    db_types::{CartLine, CartLineId, CartSnapshot, CartState, Identity, ListingId},
    market_api::cart_objects::CartView,
    validation::{cart_total, validate_quantity},
};

/// `CartApi` is the entry point for buyers' cart operations. Only callers with the `Buyer` role may use it.
pub struct CartApi<B> {
    db: B,
}

impl<B: Debug> Debug for CartApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CartApi ({:?})", self.db)
    }
}

impl<B> CartApi<B>
where B: CartManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Adds a listing to the caller's cart. If the listing is already in the cart, the quantities are summed.
    pub async fn add_or_merge(
        &self,
        identity: &Identity,
        listing_id: ListingId,
        quantity: Quantity,
    ) -> Result<CartLine, CartError> {
        require_buyer(identity)?;
        let quantity = validate_quantity(quantity)?;
        let line = self.db.add_or_merge(identity.user_id, listing_id, quantity).await.map_err(|e| {
            debug!("🛒️ Could not add {quantity} of listing {listing_id} to the cart of {identity}. {e}");
            e
        })?;
        info!("🛒️ Cart line {} of {identity} now holds {} of listing {listing_id}", line.id, line.quantity);
        Ok(line)
    }

    /// Replaces the quantity of a cart line. A quantity of zero or less removes the line and returns `None`.
    pub async fn set_quantity(
        &self,
        identity: &Identity,
        line_id: CartLineId,
        quantity: Quantity,
    ) -> Result<Option<CartLine>, CartError> {
        require_buyer(identity)?;
        let result = self.db.set_quantity(identity.user_id, line_id, quantity).await?;
        match &result {
            Some(line) => info!("🛒️ Cart line {line_id} of {identity} set to {}", line.quantity),
            None => info!("🛒️ Cart line {line_id} of {identity} removed"),
        }
        Ok(result)
    }

    pub async fn remove(&self, identity: &Identity, line_id: CartLineId) -> Result<(), CartError> {
        require_buyer(identity)?;
        self.db.remove_line(identity.user_id, line_id).await?;
        info!("🛒️ Cart line {line_id} of {identity} removed");
        Ok(())
    }

    pub async fn snapshot(&self, identity: &Identity) -> Result<CartSnapshot, CartError> {
        require_buyer(identity)?;
        self.db.cart_snapshot(identity.user_id).await
    }

    /// The cart as displayed to the buyer, with its total derived from the live prices.
    pub async fn view_cart(&self, identity: &Identity) -> Result<CartView, CartError> {
        let snapshot = self.snapshot(identity).await?;
        let total = cart_total(&snapshot.lines)?;
        trace!("🛒️ Cart of {identity} has {} lines totalling {total}", snapshot.line_count());
        Ok(CartView { state: snapshot.state, lines: snapshot.lines, total })
    }

    pub async fn cart_state(&self, identity: &Identity) -> Result<CartState, CartError> {
        require_buyer(identity)?;
        self.db.cart_state(identity.user_id).await
    }

    /// The number of lines in the caller's cart. Farmers and admins have no cart, so this is always zero for them.
    pub async fn cart_line_count(&self, identity: &Identity) -> Result<i64, CartError> {
        if !identity.is_buyer() {
            return Ok(0);
        }
        self.db.line_count(identity.user_id).await
    }
}

fn require_buyer(identity: &Identity) -> Result<(), CartError> {
    if identity.is_buyer() {
        Ok(())
    } else {
        Err(CartError::Forbidden(format!("Only buyers have a shopping cart, but the caller is a {}", identity.role)))
    }
}
