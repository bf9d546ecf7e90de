//! Pricing and quantity rules.
//!
//! Everything in this module is a pure function over fixed-point values. Monetary rounding happens in exactly two
//! places: each line subtotal is rounded to cents once, and the order total is the exact sum of those rounded
//! subtotals. Nothing here ever multiplies an already-rounded amount again.
use fm_common::{Money, Quantity};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    db_types::{CartLineView, Listing, ListingStatus, ShippingDetails},
    market_api::checkout_objects::CheckoutRequest,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Quantity must be greater than zero, but was {0}")]
    NonPositiveQuantity(Quantity),
    #[error("Unit price cannot be negative, but was {0}")]
    NegativePrice(Money),
    #[error("Amount is too large to represent: {0}")]
    Overflow(String),
    #[error("{}", .0.join(" "))]
    MissingFields(Vec<String>),
}

/// Why a cart line cannot be purchased right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictReason {
    /// The listing is not `active` any more.
    ListingUnavailable(ListingStatus),
    /// More is requested than is currently available.
    InsufficientStock,
    /// The listing has been deleted.
    ListingRemoved,
}

pub fn validate_quantity(quantity: Quantity) -> Result<Quantity, ValidationError> {
    if quantity.is_positive() {
        Ok(quantity)
    } else {
        Err(ValidationError::NonPositiveQuantity(quantity))
    }
}

pub fn validate_unit_price(price: Money) -> Result<Money, ValidationError> {
    if price.is_negative() {
        Err(ValidationError::NegativePrice(price))
    } else {
        Ok(price)
    }
}

/// Checks the checkout form. Every missing field is reported, not just the first one.
pub fn validate_shipping(request: &CheckoutRequest) -> Result<(ShippingDetails, String), ValidationError> {
    let recipient_name = request.recipient_name.trim();
    let recipient_phone = request.recipient_phone.trim();
    let shipping_address = request.shipping_address.trim();
    let payment_method = request.payment_method.trim();
    let mut missing = Vec::new();
    if recipient_name.is_empty() {
        missing.push("Recipient name is required.".to_string());
    }
    if recipient_phone.is_empty() {
        missing.push("Recipient phone number is required.".to_string());
    }
    if shipping_address.is_empty() {
        missing.push("Shipping address is required.".to_string());
    }
    if payment_method.is_empty() {
        missing.push("Please select a payment method.".to_string());
    }
    if !missing.is_empty() {
        return Err(ValidationError::MissingFields(missing));
    }
    let details = ShippingDetails {
        recipient_name: recipient_name.to_string(),
        recipient_phone: recipient_phone.to_string(),
        shipping_address: shipping_address.to_string(),
    };
    Ok((details, payment_method.to_string()))
}

/// `quantity × price`, rounded half away from zero to cents.
pub fn line_subtotal(price: Money, quantity: Quantity) -> Result<Money, ValidationError> {
    validate_unit_price(price)?;
    validate_quantity(quantity)?;
    price.checked_extend(quantity).ok_or_else(|| ValidationError::Overflow(format!("{quantity} × {price}")))
}

/// The exact sum of already-rounded line subtotals.
pub fn order_total<I: IntoIterator<Item = Money>>(subtotals: I) -> Result<Money, ValidationError> {
    subtotals.into_iter().try_fold(Money::ZERO, |acc, subtotal| {
        acc.checked_add(subtotal).ok_or_else(|| ValidationError::Overflow(format!("{acc} + {subtotal}")))
    })
}

/// Checks a requested quantity against the live listing. Returns the reason the line cannot be bought, if any.
pub fn check_line_against_listing(requested: Quantity, listing: Option<&Listing>) -> Option<ConflictReason> {
    match listing {
        None => Some(ConflictReason::ListingRemoved),
        Some(l) if !l.status.is_purchasable() => Some(ConflictReason::ListingUnavailable(l.status)),
        Some(l) if requested > l.available => Some(ConflictReason::InsufficientStock),
        Some(_) => None,
    }
}

/// The derived total of a cart as currently displayed.
pub fn cart_total(lines: &[CartLineView]) -> Result<Money, ValidationError> {
    let subtotals = lines.iter().map(|l| line_subtotal(l.price, l.quantity)).collect::<Result<Vec<_>, _>>()?;
    order_total(subtotals)
}
