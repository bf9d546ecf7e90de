//! # Farm market engine public API
//!
//! * [`cart_api`] manages a buyer's cart: adding (with merge), changing quantities, removing lines and viewing the
//!   cart with its derived total.
//! * [`checkout_api`] turns a cart into an order. It validates the cart against live inventory, reserves stock
//!   through the ledger and commits the order, its line snapshots and the cleared cart as one unit.
//! * [`order_history_api`] lets buyers read their orders and admins move orders through their status lifecycle.
//!
//! # API usage
//!
//! Every API is created by handing it a database backend that implements the backend traits it needs. Every call
//! takes the caller's [`Identity`](crate::db_types::Identity) explicitly.
//!
//! ```rust,ignore
//! use farm_market_engine::{CartApi, CheckoutApi, SqliteDatabase, events::EventProducers};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! let cart = CartApi::new(db.clone());
//! cart.add_or_merge(&buyer, listing_id, Quantity::from_units(4)).await?;
//! let checkout = CheckoutApi::new(db, EventProducers::default());
//! let order = checkout.checkout(&buyer, request).await?;
//! ```
pub mod cart_api;
pub mod cart_objects;
pub mod checkout_api;
pub mod checkout_objects;
pub mod order_history_api;
pub mod order_objects;
