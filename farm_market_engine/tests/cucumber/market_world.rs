use std::collections::HashMap;

use cucumber::World;
use farm_market_engine::{
    checkout_objects::StockConflictLine,
    db_types::{Identity, ListingId, Order, PaymentPolicy},
    events::EventProducers,
    test_utils::prepare_env::{create_database, random_db_path, run_migrations},
    CartApi,
    CartError,
    CartManagement,
    CheckoutApi,
    CheckoutError,
    InventoryLedger,
    OrderHistoryApi,
    OrderHistoryError,
    SqliteDatabase,
};
use fm_common::Quantity;
use log::*;

#[derive(Default, Debug, World)]
pub struct MarketWorld {
    pub system: Option<MarketSystem>,
}

impl MarketWorld {
    pub fn system(&self) -> &MarketSystem {
        self.system.as_ref().expect("Market system not initialised")
    }

    pub fn system_mut(&mut self) -> &mut MarketSystem {
        self.system.as_mut().expect("Market system not initialised")
    }
}

/// The cart, ledger and order history as seen from outside, used to check that a failed checkout left no trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateFingerprint {
    pub cart: Vec<(ListingId, Quantity)>,
    pub stock: Vec<(ListingId, Quantity)>,
    pub order_count: i64,
}

#[derive(Debug)]
pub struct MarketSystem {
    pub db_path: String,
    pub db: SqliteDatabase,
    pub cart: CartApi<SqliteDatabase>,
    pub checkout: CheckoutApi<SqliteDatabase>,
    pub history: OrderHistoryApi<SqliteDatabase>,
    pub users: HashMap<String, Identity>,
    pub listings: HashMap<String, ListingId>,
    /// The name of the error variant returned by the last action, or `None` if it succeeded.
    pub last_error: Option<String>,
    pub last_conflicts: Vec<StockConflictLine>,
    pub last_order: Option<Order>,
    pub before_checkout: Option<StateFingerprint>,
}

impl MarketSystem {
    pub async fn new() -> Self {
        let url = random_db_path();
        create_database(&url).await;
        run_migrations(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to database");
        debug!("Created database: {url}");
        Self {
            db_path: url,
            cart: CartApi::new(db.clone()),
            checkout: CheckoutApi::new(db.clone(), EventProducers::default()),
            history: OrderHistoryApi::new(db.clone(), EventProducers::default()),
            db,
            users: HashMap::new(),
            listings: HashMap::new(),
            last_error: None,
            last_conflicts: vec![],
            last_order: None,
            before_checkout: None,
        }
    }

    pub fn use_payment_policy(&mut self, policy: PaymentPolicy) {
        self.checkout = CheckoutApi::new(self.db.clone(), EventProducers::default()).with_payment_policy(policy);
    }

    pub fn user(&self, name: &str) -> Identity {
        *self.users.get(name).unwrap_or_else(|| panic!("No user called {name}"))
    }

    pub fn listing(&self, name: &str) -> ListingId {
        *self.listings.get(name).unwrap_or_else(|| panic!("No listing called {name}"))
    }

    pub fn record_cart_result<T>(&mut self, result: Result<T, CartError>) {
        self.last_error = result.err().map(|e| {
            debug!("Cart operation failed: {e}");
            cart_error_kind(&e).to_string()
        });
    }

    pub fn record_history_result<T>(&mut self, result: Result<T, OrderHistoryError>) {
        self.last_error = result.err().map(|e| {
            debug!("Order history operation failed: {e}");
            history_error_kind(&e).to_string()
        });
    }

    pub fn record_checkout_result(&mut self, result: Result<Order, CheckoutError>) {
        self.last_conflicts.clear();
        match result {
            Ok(order) => {
                self.last_error = None;
                self.last_order = Some(order);
            },
            Err(e) => {
                debug!("Checkout failed: {e}");
                self.last_error = Some(checkout_error_kind(&e).to_string());
                if let CheckoutError::StockConflict(lines) = e {
                    self.last_conflicts = lines;
                }
            },
        }
    }

    pub async fn fingerprint(&self, buyer: &str) -> StateFingerprint {
        let identity = self.user(buyer);
        let snapshot = self.db.cart_snapshot(identity.user_id).await.expect("Error reading cart");
        let cart = snapshot.lines.iter().map(|l| (l.listing_id, l.quantity)).collect();
        let mut stock = Vec::new();
        let mut ids = self.listings.values().copied().collect::<Vec<_>>();
        ids.sort();
        for id in ids {
            let available = self.db.fetch_listing(id).await.expect("Error reading listing").map(|l| l.available);
            stock.push((id, available.unwrap_or_default()));
        }
        let (order_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders")
            .fetch_one(self.db.pool())
            .await
            .expect("Error counting orders");
        StateFingerprint { cart, stock, order_count }
    }
}

pub fn cart_error_kind(e: &CartError) -> &'static str {
    match e {
        CartError::DatabaseError(_) => "DatabaseError",
        CartError::Forbidden(_) => "Forbidden",
        CartError::ListingNotFound(_) | CartError::LineNotFound(_) => "NotFound",
        CartError::ListingNotActive(..) => "ListingNotActive",
        CartError::InvalidQuantity(_) => "InvalidQuantity",
        CartError::InsufficientStock { .. } => "InsufficientStock",
    }
}

pub fn checkout_error_kind(e: &CheckoutError) -> &'static str {
    match e {
        CheckoutError::Forbidden(_) => "Forbidden",
        CheckoutError::EmptyCart => "EmptyCart",
        CheckoutError::ValidationError(_) => "ValidationError",
        CheckoutError::StockConflict(_) => "StockConflict",
        CheckoutError::CommitFailure(_) => "CommitFailure",
    }
}

pub fn history_error_kind(e: &OrderHistoryError) -> &'static str {
    match e {
        OrderHistoryError::DatabaseError(_) => "DatabaseError",
        OrderHistoryError::OrderNotFound(_) => "NotFound",
        OrderHistoryError::Forbidden(_) => "Forbidden",
        OrderHistoryError::InvalidStatusTransition { .. } => "InvalidStatusTransition",
    }
}
