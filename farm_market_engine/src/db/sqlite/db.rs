//! `SqliteDatabase` is the SQLite backend of the farm market engine. It implements every trait in
//! [`crate::db::traits`].
use std::{fmt::Debug, time::Duration};

use fm_common::{Money, Quantity};
use log::*;
use sqlx::{migrate, SqlitePool};

use super::{busy_timeout, carts, catalog, db_url, ledger, new_pool, orders, SqliteDatabaseError};
use crate::{
    db::traits::{
        CartError,
        CartManagement,
        CheckoutError,
        InventoryLedger,
        LedgerError,
        OrderHistoryError,
        OrderManagement,
    },
    db_types::{
        CartLine,
        CartLineId,
        CartSnapshot,
        CartState,
        Listing,
        ListingId,
        ListingStatus,
        NewListing,
        NewOrder,
        NewUser,
        Order,
        OrderId,
        OrderLine,
        OrderStatusType,
        User,
        UserId,
    },
    validation::ValidationError,
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object, using `FM_DATABASE_URL` (or the default) for the connection.
    pub async fn new(max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    /// Creates a new database API object using the given URL and the busy timeout from `FM_DB_BUSY_TIMEOUT_MS`.
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        SqliteDatabase::new_with_options(url, max_connections, busy_timeout()).await
    }

    pub async fn new_with_options(
        url: &str,
        max_connections: u32,
        busy_timeout: Duration,
    ) -> Result<Self, SqliteDatabaseError> {
        let pool = new_pool(url, max_connections, busy_timeout).await?;
        debug!("🗃️ Connected to {url} with up to {max_connections} connections");
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Brings the schema up to date with the migrations embedded in this crate.
    pub async fn run_migrations(&self) -> Result<(), SqliteDatabaseError> {
        migrate!("./src/db/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    pub async fn close(&mut self) -> Result<(), SqliteDatabaseError> {
        self.pool.close().await;
        Ok(())
    }

    //---------------------------------------   Catalog helpers   ----------------------------------------------------
    pub async fn insert_user(&self, user: NewUser) -> Result<User, SqliteDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let user = catalog::insert_user(user, &mut conn).await?;
        debug!("🗃️ User {} ({}) created with id {}", user.username, user.role, user.id);
        Ok(user)
    }

    pub async fn fetch_user(&self, user_id: UserId) -> Result<Option<User>, SqliteDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        Ok(catalog::fetch_user(user_id, &mut conn).await?)
    }

    /// Deletes a user. Their cart goes with them; their orders stay, with the buyer reference cleared.
    pub async fn delete_user(&self, user_id: UserId) -> Result<bool, SqliteDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        Ok(catalog::delete_user(user_id, &mut conn).await?)
    }

    pub async fn insert_listing(&self, listing: NewListing) -> Result<Listing, SqliteDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let listing = catalog::insert_listing(listing, &mut conn).await?;
        debug!("🗃️ Listing {} '{}' created with {} {}", listing.id, listing.name, listing.available, listing.unit);
        Ok(listing)
    }

    pub async fn update_listing_price(
        &self,
        listing_id: ListingId,
        price: Money,
    ) -> Result<Option<Listing>, SqliteDatabaseError> {
        if price.is_negative() {
            return Err(SqliteDatabaseError::QueryError(format!("Listing price cannot be negative: {price}")));
        }
        let mut conn = self.pool.acquire().await?;
        Ok(catalog::update_listing_price(listing_id, price, &mut conn).await?)
    }

    pub async fn update_listing_status(
        &self,
        listing_id: ListingId,
        status: ListingStatus,
    ) -> Result<Option<Listing>, SqliteDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        Ok(catalog::update_listing_status(listing_id, status, &mut conn).await?)
    }

    /// Deletes a listing. Live cart lines for it are removed; order history keeps its snapshots.
    pub async fn delete_listing(&self, listing_id: ListingId) -> Result<bool, SqliteDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        Ok(catalog::delete_listing(listing_id, &mut conn).await?)
    }
}

impl CartManagement for SqliteDatabase {
    async fn add_or_merge(
        &self,
        buyer: UserId,
        listing_id: ListingId,
        quantity: Quantity,
    ) -> Result<CartLine, CartError> {
        let mut tx = self.pool.begin().await?;
        // Writing first takes the write lock, so the reads below cannot go stale before the line is written.
        let cart_id = carts::upsert_active_cart(buyer, &mut tx).await?;
        let listing = ledger::fetch_listing(listing_id, &mut tx).await?.ok_or(CartError::ListingNotFound(listing_id))?;
        if !listing.status.is_purchasable() {
            return Err(CartError::ListingNotActive(listing_id, listing.status));
        }
        let existing = carts::fetch_line_for_listing(cart_id, listing_id, &mut tx).await?;
        let in_cart = existing.as_ref().map(|l| l.quantity).unwrap_or_default();
        let merged = in_cart
            .checked_add(quantity)
            .ok_or_else(|| ValidationError::Overflow(format!("{in_cart} + {quantity}")))?;
        if merged > listing.available {
            return Err(CartError::InsufficientStock { listing_id, requested: merged, available: listing.available });
        }
        let line = match existing {
            Some(line) => carts::update_line_quantity(line.id, merged, &mut tx).await?,
            None => carts::insert_line(cart_id, listing_id, merged, &mut tx).await?,
        };
        tx.commit().await?;
        Ok(line)
    }

    async fn set_quantity(
        &self,
        buyer: UserId,
        line_id: CartLineId,
        quantity: Quantity,
    ) -> Result<Option<CartLine>, CartError> {
        let mut tx = self.pool.begin().await?;
        carts::touch_cart(buyer, &mut tx).await?;
        let owned = carts::fetch_line(line_id, &mut tx).await?.ok_or(CartError::LineNotFound(line_id))?;
        if owned.buyer_id != buyer {
            return Err(CartError::Forbidden(format!("Cart line {line_id} belongs to another buyer")));
        }
        if !quantity.is_positive() {
            carts::delete_line(line_id, &mut tx).await?;
            tx.commit().await?;
            return Ok(None);
        }
        let listing_id = owned.line.listing_id;
        let listing = ledger::fetch_listing(listing_id, &mut tx).await?.ok_or(CartError::ListingNotFound(listing_id))?;
        if quantity > listing.available {
            return Err(CartError::InsufficientStock { listing_id, requested: quantity, available: listing.available });
        }
        let line = carts::update_line_quantity(line_id, quantity, &mut tx).await?;
        tx.commit().await?;
        Ok(Some(line))
    }

    async fn remove_line(&self, buyer: UserId, line_id: CartLineId) -> Result<(), CartError> {
        let mut tx = self.pool.begin().await?;
        carts::touch_cart(buyer, &mut tx).await?;
        let owned = carts::fetch_line(line_id, &mut tx).await?.ok_or(CartError::LineNotFound(line_id))?;
        if owned.buyer_id != buyer {
            return Err(CartError::Forbidden(format!("Cart line {line_id} belongs to another buyer")));
        }
        carts::delete_line(line_id, &mut tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn cart_snapshot(&self, buyer: UserId) -> Result<CartSnapshot, CartError> {
        let mut conn = self.pool.acquire().await?;
        let state = carts::fetch_cart_state(buyer, &mut conn).await?;
        if state == CartState::Absent {
            return Ok(CartSnapshot::empty(buyer, state));
        }
        let lines = carts::fetch_line_views(buyer, &mut conn).await?;
        Ok(CartSnapshot { buyer_id: buyer, state, lines })
    }

    async fn cart_state(&self, buyer: UserId) -> Result<CartState, CartError> {
        let mut conn = self.pool.acquire().await?;
        Ok(carts::fetch_cart_state(buyer, &mut conn).await?)
    }

    async fn line_count(&self, buyer: UserId) -> Result<i64, CartError> {
        let mut conn = self.pool.acquire().await?;
        Ok(carts::count_lines(buyer, &mut conn).await?)
    }
}

impl InventoryLedger for SqliteDatabase {
    async fn fetch_listing(&self, listing_id: ListingId) -> Result<Option<Listing>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(ledger::fetch_listing(listing_id, &mut conn).await?)
    }

    async fn reserve(&self, listing_id: ListingId, quantity: Quantity) -> Result<(), LedgerError> {
        if !quantity.is_positive() {
            return Err(LedgerError::InvalidQuantity(quantity));
        }
        let mut conn = self.pool.acquire().await?;
        if ledger::reserve(listing_id, quantity, &mut conn).await? {
            trace!("📦️ Reserved {quantity} of listing {listing_id}");
            return Ok(());
        }
        // Look the listing up again to report why the reservation failed.
        match ledger::fetch_listing(listing_id, &mut conn).await? {
            None => Err(LedgerError::ListingNotFound(listing_id)),
            Some(listing) => {
                Err(LedgerError::InsufficientStock { listing_id, requested: quantity, available: listing.available })
            },
        }
    }

    async fn release(&self, listing_id: ListingId, quantity: Quantity) -> Result<(), LedgerError> {
        if !quantity.is_positive() {
            return Err(LedgerError::InvalidQuantity(quantity));
        }
        let mut conn = self.pool.acquire().await?;
        if ledger::release(listing_id, quantity, &mut conn).await? {
            Ok(())
        } else {
            Err(LedgerError::ListingNotFound(listing_id))
        }
    }
}

impl OrderManagement for SqliteDatabase {
    async fn commit_order(&self, order: NewOrder) -> Result<Order, CheckoutError> {
        let mut tx = self.pool.begin().await?;
        let inserted = orders::insert_order(&order, &mut tx).await?;
        orders::insert_order_lines(inserted.id, &order.lines, &mut tx).await?;
        let expected = order.lines.len() as i64;
        let matching = carts::count_ordered_lines(order.buyer_id, &order.lines, &mut tx).await?;
        let held = carts::count_lines(order.buyer_id, &mut tx).await?;
        if matching != expected || held != expected {
            // Dropping `tx` rolls back the order insert.
            return Err(CheckoutError::CommitFailure(format!(
                "The cart of buyer {} changed while order was being placed",
                order.buyer_id
            )));
        }
        let removed = carts::clear_cart(order.buyer_id, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order {} committed with {removed} lines. Cart of buyer {} cleared", inserted.id, order.buyer_id);
        Ok(inserted)
    }

    async fn fetch_order(&self, order_id: OrderId) -> Result<Option<Order>, OrderHistoryError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order(order_id, &mut conn).await?)
    }

    async fn fetch_order_lines(&self, order_id: OrderId) -> Result<Vec<OrderLine>, OrderHistoryError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_lines(order_id, &mut conn).await?)
    }

    async fn fetch_orders_for_buyer(&self, buyer: UserId) -> Result<Vec<Order>, OrderHistoryError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_orders_for_buyer(buyer, &mut conn).await?)
    }

    async fn update_order_status(
        &self,
        order_id: OrderId,
        from: OrderStatusType,
        to: OrderStatusType,
    ) -> Result<Option<Order>, OrderHistoryError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::update_status(order_id, from, to, &mut conn).await?)
    }
}
