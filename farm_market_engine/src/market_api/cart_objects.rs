use fm_common::{Money, Quantity};
use serde::{Deserialize, Serialize};

use crate::db_types::{CartLineView, CartState, ListingId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddToCartRequest {
    pub listing_id: ListingId,
    pub quantity: Quantity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateCartLineRequest {
    pub quantity: Quantity,
}

/// A buyer's cart as displayed, with the derived total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartView {
    pub state: CartState,
    pub lines: Vec<CartLineView>,
    pub total: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartCount {
    pub count: i64,
}
