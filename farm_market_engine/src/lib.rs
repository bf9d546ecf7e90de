//! Farm Market Engine
//!
//! The farm market connects farmers, who list produce, with buyers. This library contains the cart-to-order
//! pipeline: the buyer's cart, the inventory ledger that owns each listing's available quantity, and the checkout
//! flow that turns a cart into an immutable order while decrementing stock and clearing the cart as one
//! all-or-nothing unit of work.
//!
//! The library is divided into these sections:
//! 1. Database management and control ([`mod@db`]). The backend contracts live in [`db::traits`]; SQLite is the
//!    supported backend. The data types stored in the database are defined in [`db_types`] and are public.
//! 2. The public API ([`mod@market_api`]): [`CartApi`], [`CheckoutApi`] and [`OrderHistoryApi`]. They are generic over
//!    the backend traits and take the caller's [`db_types::Identity`] on every call.
//! 3. Pure pricing and quantity rules ([`validation`]). Money and quantities are fixed-point integers from
//!    `fm_common`; no floating point is involved anywhere.
//!
//! The engine publishes events (an order was placed, an order's status changed) through a small stateless hook
//! system in [`events`].
pub mod db;
pub mod db_types;
pub mod events;
pub mod market_api;
pub mod validation;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use db::sqlite::{SqliteDatabase, SqliteDatabaseError};
pub use db::traits::{
    CartError,
    CartManagement,
    CheckoutDatabase,
    CheckoutError,
    InventoryLedger,
    LedgerError,
    OrderHistoryError,
    OrderManagement,
};
pub use market_api::{
    cart_api::CartApi,
    cart_objects,
    checkout_api::CheckoutApi,
    checkout_objects,
    order_history_api::OrderHistoryApi,
    order_objects,
};
