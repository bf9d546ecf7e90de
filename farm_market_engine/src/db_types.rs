use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use fm_common::{Money, Quantity};
use log::error;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Conversion error: {0}")]
pub struct ConversionError(String);

macro_rules! id_type {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
        #[sqlx(transparent)]
        pub struct $name(pub i64);

        impl $name {
            pub fn value(&self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl FromStr for $name {
            type Err = ConversionError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim().trim_start_matches('#');
                s.parse::<i64>().map(Self).map_err(|e| ConversionError(format!("Invalid id {s}: {e}")))
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "#{}", self.0)
            }
        }
    };
}

id_type!(UserId);
id_type!(ListingId);
id_type!(CartId);
id_type!(CartLineId);
id_type!(OrderId);

//--------------------------------------        Role           ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum Role {
    Buyer,
    Farmer,
    Admin,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Buyer => write!(f, "Buyer"),
            Role::Farmer => write!(f, "Farmer"),
            Role::Admin => write!(f, "Admin"),
        }
    }
}

impl FromStr for Role {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "buyer" => Ok(Self::Buyer),
            "farmer" => Ok(Self::Farmer),
            "admin" => Ok(Self::Admin),
            _ => Err(ConversionError(format!("Invalid role: {s}"))),
        }
    }
}

//--------------------------------------      Identity         ---------------------------------------------------------
/// The authenticated caller of an operation. Every cart, checkout and order history call receives one explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    pub role: Role,
}

impl Identity {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn buyer(user_id: UserId) -> Self {
        Self::new(user_id, Role::Buyer)
    }

    pub fn admin(user_id: UserId) -> Self {
        Self::new(user_id, Role::Admin)
    }

    pub fn is_buyer(&self) -> bool {
        self.role == Role::Buyer
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} user {}", self.role, self.user_id)
    }
}

//--------------------------------------   ListingStatus       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    /// The listing can be added to carts and purchased.
    Active,
    Inactive,
    SoldOut,
    Rejected,
    /// Newly created listings wait for an admin before going live.
    PendingApproval,
}

impl ListingStatus {
    pub fn is_purchasable(&self) -> bool {
        matches!(self, ListingStatus::Active)
    }
}

impl Display for ListingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListingStatus::Active => write!(f, "active"),
            ListingStatus::Inactive => write!(f, "inactive"),
            ListingStatus::SoldOut => write!(f, "sold_out"),
            ListingStatus::Rejected => write!(f, "rejected"),
            ListingStatus::PendingApproval => write!(f, "pending_approval"),
        }
    }
}

impl FromStr for ListingStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "sold_out" => Ok(Self::SoldOut),
            "rejected" => Ok(Self::Rejected),
            "pending_approval" => Ok(Self::PendingApproval),
            s => Err(ConversionError(format!("Invalid listing status: {s}"))),
        }
    }
}

impl From<String> for ListingStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid listing status: {value}. But this conversion cannot fail. Defaulting to Inactive");
            ListingStatus::Inactive
        })
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum OrderStatusType {
    /// The order has been placed but payment has not been confirmed yet.
    Pending,
    Processing,
    Shipped,
    /// Terminal. Simulated payments create orders directly in this state.
    Completed,
    /// Terminal.
    Cancelled,
}

impl OrderStatusType {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatusType::Completed | OrderStatusType::Cancelled)
    }

    /// Returns true if an order may move from `self` to `next`.
    ///
    /// The forward path is Pending → Processing → Shipped → Completed. Any non-terminal order may be cancelled.
    pub fn can_transition_to(&self, next: OrderStatusType) -> bool {
        use OrderStatusType::*;
        match (self, next) {
            (Pending, Processing) | (Processing, Shipped) | (Shipped, Completed) => true,
            (s, Cancelled) => !s.is_terminal(),
            _ => false,
        }
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Pending => write!(f, "Pending"),
            OrderStatusType::Processing => write!(f, "Processing"),
            OrderStatusType::Shipped => write!(f, "Shipped"),
            OrderStatusType::Completed => write!(f, "Completed"),
            OrderStatusType::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Processing" => Ok(Self::Processing),
            "Shipped" => Ok(Self::Shipped),
            "Completed" => Ok(Self::Completed),
            "Cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to Pending");
            OrderStatusType::Pending
        })
    }
}

//--------------------------------------      CartState        ---------------------------------------------------------
/// The lifecycle of a buyer's cart. A buyer without a cart row is `Absent`. The first add creates the cart as
/// `Active`; a successful checkout leaves it `Cleared`, and the next add makes it `Active` again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum CartState {
    Absent,
    Active,
    Cleared,
}

impl Display for CartState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CartState::Absent => write!(f, "Absent"),
            CartState::Active => write!(f, "Active"),
            CartState::Cleared => write!(f, "Cleared"),
        }
    }
}

//--------------------------------------    PaymentPolicy      ---------------------------------------------------------
/// Decides the status of a freshly placed order. There is no payment gateway; `Simulated` treats payment as
/// having succeeded immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PaymentPolicy {
    #[default]
    Simulated,
    Deferred,
}

impl PaymentPolicy {
    pub fn initial_status(&self) -> OrderStatusType {
        match self {
            PaymentPolicy::Simulated => OrderStatusType::Completed,
            PaymentPolicy::Deferred => OrderStatusType::Pending,
        }
    }
}

impl Display for PaymentPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentPolicy::Simulated => write!(f, "simulated"),
            PaymentPolicy::Deferred => write!(f, "deferred"),
        }
    }
}

impl FromStr for PaymentPolicy {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simulated" => Ok(Self::Simulated),
            "deferred" => Ok(Self::Deferred),
            s => Err(ConversionError(format!("Invalid payment policy: {s}"))),
        }
    }
}

//--------------------------------------        User           ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub role: Role,
}

impl NewUser {
    pub fn new<S: Into<String>>(username: S, role: Role) -> Self {
        Self { username: username.into(), role }
    }
}

//--------------------------------------       Listing         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub farmer_id: UserId,
    pub name: String,
    pub unit: String,
    pub price: Money,
    pub available: Quantity,
    pub status: ListingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewListing {
    pub farmer_id: UserId,
    pub name: String,
    pub unit: String,
    pub price: Money,
    pub available: Quantity,
    pub status: ListingStatus,
}

impl NewListing {
    /// A new, already approved listing.
    pub fn new<S: Into<String>>(farmer_id: UserId, name: S, unit: S, price: Money, available: Quantity) -> Self {
        Self { farmer_id, name: name.into(), unit: unit.into(), price, available, status: ListingStatus::Active }
    }

    pub fn with_status(mut self, status: ListingStatus) -> Self {
        self.status = status;
        self
    }
}

//--------------------------------------        Cart           ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct CartLine {
    pub id: CartLineId,
    pub cart_id: CartId,
    pub listing_id: ListingId,
    pub quantity: Quantity,
    pub added_at: DateTime<Utc>,
}

/// A cart line joined with the live data of its listing.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct CartLineView {
    pub line_id: CartLineId,
    pub listing_id: ListingId,
    pub quantity: Quantity,
    pub name: String,
    pub unit: String,
    pub price: Money,
    pub available: Quantity,
    pub status: ListingStatus,
    pub added_at: DateTime<Utc>,
}

impl CartLineView {
    /// The line's price rounded to cents. `None` if the product overflows.
    pub fn subtotal(&self) -> Option<Money> {
        self.price.checked_extend(self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSnapshot {
    pub buyer_id: UserId,
    pub state: CartState,
    pub lines: Vec<CartLineView>,
}

impl CartSnapshot {
    pub fn empty(buyer_id: UserId, state: CartState) -> Self {
        Self { buyer_id, state, lines: vec![] }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }
}

//--------------------------------------        Order          ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    /// `None` once the buyer's account has been deleted. The order itself survives.
    pub buyer_id: Option<UserId>,
    pub total_price: Money,
    pub status: OrderStatusType,
    pub recipient_name: String,
    pub recipient_phone: String,
    pub shipping_address: String,
    pub payment_method: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An immutable snapshot of a purchased cart line.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: i64,
    pub order_id: OrderId,
    pub listing_id: Option<ListingId>,
    pub product_name: String,
    pub product_unit: String,
    pub quantity: Quantity,
    pub price_per_unit: Money,
}

impl OrderLine {
    pub fn subtotal(&self) -> Option<Money> {
        self.price_per_unit.checked_extend(self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderWithLines {
    #[serde(flatten)]
    pub order: Order,
    pub lines: Vec<OrderLine>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingDetails {
    pub recipient_name: String,
    pub recipient_phone: String,
    pub shipping_address: String,
}

/// A line ready to be written to `order_items`, with the listing's name, unit and price copied in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderLine {
    pub cart_line_id: CartLineId,
    pub listing_id: ListingId,
    pub product_name: String,
    pub product_unit: String,
    pub quantity: Quantity,
    pub price_per_unit: Money,
    pub subtotal: Money,
}

/// Everything the commit step needs to persist an order and clear the cart it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub buyer_id: UserId,
    pub status: OrderStatusType,
    pub total_price: Money,
    pub shipping: ShippingDetails,
    pub payment_method: String,
    pub lines: Vec<NewOrderLine>,
}

impl NewOrder {
    pub fn cart_line_ids(&self) -> Vec<CartLineId> {
        self.lines.iter().map(|l| l.cart_line_id).collect()
    }
}
