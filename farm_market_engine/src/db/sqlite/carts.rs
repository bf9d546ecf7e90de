//! Cart store queries. None of these are atomic on their own; callers wrap multi-step mutations in a transaction and
//! pass `&mut tx` as the connection.
use fm_common::Quantity;
use log::*;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection};

use crate::db_types::{CartId, CartLine, CartLineId, CartLineView, CartState, ListingId, NewOrderLine, UserId};

/// A cart line together with the buyer that owns it.
#[derive(Debug, Clone, FromRow)]
pub struct OwnedCartLine {
    #[sqlx(flatten)]
    pub line: CartLine,
    pub buyer_id: UserId,
}

/// Creates the buyer's cart if it does not exist, and marks it `Active` in either case.
///
/// Because this statement writes, calling it first inside a transaction also takes SQLite's write lock for the rest
/// of that transaction.
pub async fn upsert_active_cart(buyer: UserId, conn: &mut SqliteConnection) -> Result<CartId, sqlx::Error> {
    let (id,): (CartId,) = sqlx::query_as(
        r#"
            INSERT INTO carts (buyer_id, state) VALUES ($1, $2)
            ON CONFLICT (buyer_id) DO UPDATE SET state = excluded.state, updated_at = CURRENT_TIMESTAMP
            RETURNING id;
        "#,
    )
    .bind(buyer)
    .bind(CartState::Active)
    .fetch_one(conn)
    .await?;
    Ok(id)
}

/// Bumps `updated_at` on the buyer's cart. Returns `false` if the buyer has no cart.
pub async fn touch_cart(buyer: UserId, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE carts SET updated_at = CURRENT_TIMESTAMP WHERE buyer_id = $1")
        .bind(buyer)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn fetch_cart(
    buyer: UserId,
    conn: &mut SqliteConnection,
) -> Result<Option<(CartId, CartState)>, sqlx::Error> {
    let cart =
        sqlx::query_as("SELECT id, state FROM carts WHERE buyer_id = $1").bind(buyer).fetch_optional(conn).await?;
    Ok(cart)
}

pub async fn fetch_cart_state(buyer: UserId, conn: &mut SqliteConnection) -> Result<CartState, sqlx::Error> {
    let state = fetch_cart(buyer, conn).await?.map(|(_, state)| state).unwrap_or(CartState::Absent);
    Ok(state)
}

pub async fn set_cart_state(buyer: UserId, state: CartState, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE carts SET state = $1, updated_at = CURRENT_TIMESTAMP WHERE buyer_id = $2")
        .bind(state)
        .bind(buyer)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn fetch_line(
    line_id: CartLineId,
    conn: &mut SqliteConnection,
) -> Result<Option<OwnedCartLine>, sqlx::Error> {
    let line = sqlx::query_as(
        r#"
            SELECT cart_items.id, cart_items.cart_id, cart_items.listing_id, cart_items.quantity, cart_items.added_at,
                carts.buyer_id
            FROM cart_items JOIN carts ON carts.id = cart_items.cart_id
            WHERE cart_items.id = $1
        "#,
    )
    .bind(line_id)
    .fetch_optional(conn)
    .await?;
    Ok(line)
}

pub async fn fetch_line_for_listing(
    cart_id: CartId,
    listing_id: ListingId,
    conn: &mut SqliteConnection,
) -> Result<Option<CartLine>, sqlx::Error> {
    let line = sqlx::query_as("SELECT * FROM cart_items WHERE cart_id = $1 AND listing_id = $2")
        .bind(cart_id)
        .bind(listing_id)
        .fetch_optional(conn)
        .await?;
    Ok(line)
}

pub async fn insert_line(
    cart_id: CartId,
    listing_id: ListingId,
    quantity: Quantity,
    conn: &mut SqliteConnection,
) -> Result<CartLine, sqlx::Error> {
    let line: CartLine =
        sqlx::query_as("INSERT INTO cart_items (cart_id, listing_id, quantity) VALUES ($1, $2, $3) RETURNING *")
            .bind(cart_id)
            .bind(listing_id)
            .bind(quantity)
            .fetch_one(conn)
            .await?;
    trace!("🛒️ Inserted cart line {} for listing {listing_id}", line.id);
    Ok(line)
}

pub async fn update_line_quantity(
    line_id: CartLineId,
    quantity: Quantity,
    conn: &mut SqliteConnection,
) -> Result<CartLine, sqlx::Error> {
    let line = sqlx::query_as("UPDATE cart_items SET quantity = $1 WHERE id = $2 RETURNING *")
        .bind(quantity)
        .bind(line_id)
        .fetch_one(conn)
        .await?;
    Ok(line)
}

pub async fn delete_line(line_id: CartLineId, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM cart_items WHERE id = $1").bind(line_id).execute(conn).await?;
    Ok(result.rows_affected())
}

/// Removes every line from the buyer's cart and marks it `Cleared`. Returns the number of lines removed.
pub async fn clear_cart(buyer: UserId, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result =
        sqlx::query("DELETE FROM cart_items WHERE cart_id IN (SELECT id FROM carts WHERE buyer_id = $1)")
            .bind(buyer)
            .execute(&mut *conn)
            .await?;
    set_cart_state(buyer, CartState::Cleared, conn).await?;
    Ok(result.rows_affected())
}

/// Counts the buyer's cart lines that still hold exactly what an order was built from: the same line id and the
/// same quantity. Anything less than `lines.len()` means the cart changed after it was snapshotted.
pub async fn count_ordered_lines(
    buyer: UserId,
    lines: &[NewOrderLine],
    conn: &mut SqliteConnection,
) -> Result<i64, sqlx::Error> {
    if lines.is_empty() {
        return Ok(0);
    }
    let mut builder = QueryBuilder::<Sqlite>::new(
        "SELECT COUNT(*) FROM cart_items WHERE cart_id IN (SELECT id FROM carts WHERE buyer_id = ",
    );
    builder.push_bind(buyer);
    builder.push(") AND (");
    let mut clauses = builder.separated(" OR ");
    for line in lines {
        clauses.push("(id = ");
        clauses.push_bind_unseparated(line.cart_line_id);
        clauses.push_unseparated(" AND quantity = ");
        clauses.push_bind_unseparated(line.quantity);
        clauses.push_unseparated(")");
    }
    builder.push(")");
    let (count,): (i64,) = builder.build_query_as().fetch_one(conn).await?;
    Ok(count)
}

/// The buyer's cart lines joined with the live listing data, ordered by listing id.
pub async fn fetch_line_views(buyer: UserId, conn: &mut SqliteConnection) -> Result<Vec<CartLineView>, sqlx::Error> {
    let lines = sqlx::query_as(
        r#"
            SELECT
                cart_items.id AS line_id,
                cart_items.listing_id,
                cart_items.quantity,
                listings.name,
                listings.unit,
                listings.price,
                listings.available,
                listings.status,
                cart_items.added_at
            FROM cart_items
                JOIN carts ON carts.id = cart_items.cart_id
                JOIN listings ON listings.id = cart_items.listing_id
            WHERE carts.buyer_id = $1
            ORDER BY cart_items.listing_id
        "#,
    )
    .bind(buyer)
    .fetch_all(conn)
    .await?;
    Ok(lines)
}

pub async fn count_lines(buyer: UserId, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM cart_items JOIN carts ON carts.id = cart_items.cart_id WHERE carts.buyer_id = $1",
    )
    .bind(buyer)
    .fetch_one(conn)
    .await?;
    Ok(count)
}
