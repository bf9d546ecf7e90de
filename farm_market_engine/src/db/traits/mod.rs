//! # Backend contracts
//!
//! The traits in this module define what a storage backend must provide for the farm market engine. The public APIs
//! in [`crate::market_api`] are generic over them, so the checkout algorithm lives in one place and the backend only
//! supplies the atomic primitives.
//!
//! * [`CartManagement`] owns each buyer's working set of (listing, quantity) pairs.
//! * [`InventoryLedger`] owns the authoritative available quantity of every listing and arbitrates concurrent
//!   decrements.
//! * [`OrderManagement`] persists orders. Its [`OrderManagement::commit_order`] writes the order, its line snapshots
//!   and clears the cart in one transaction.
//!
//! Every method returns a `Send` future so that a checkout attempt can be driven to completion on its own task.
mod cart_management;
mod inventory_ledger;
mod order_management;

pub use cart_management::{CartError, CartManagement};
pub use inventory_ledger::{InventoryLedger, LedgerError};
pub use order_management::{CheckoutError, OrderHistoryError, OrderManagement};

/// Everything the checkout flow needs from a backend. The backend is shared with the task that runs each checkout
/// attempt.
pub trait CheckoutDatabase: CartManagement + InventoryLedger + OrderManagement + Send + Sync + 'static {}

impl<T> CheckoutDatabase for T where T: CartManagement + InventoryLedger + OrderManagement + Send + Sync + 'static {}
