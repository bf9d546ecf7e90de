use log::*;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::db_types::{NewOrder, NewOrderLine, Order, OrderId, OrderLine, OrderStatusType, UserId};

/// Inserts a new order row. This is not atomic. Embed the call in a transaction together with the line inserts and
/// pass `&mut tx` as the connection.
pub async fn insert_order(order: &NewOrder, conn: &mut SqliteConnection) -> Result<Order, sqlx::Error> {
    let order: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                buyer_id,
                total_price,
                status,
                recipient_name,
                recipient_phone,
                shipping_address,
                payment_method
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *;
        "#,
    )
    .bind(order.buyer_id)
    .bind(order.total_price)
    .bind(order.status)
    .bind(&order.shipping.recipient_name)
    .bind(&order.shipping.recipient_phone)
    .bind(&order.shipping.shipping_address)
    .bind(&order.payment_method)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Order {} inserted for buyer {:?} with total {}", order.id, order.buyer_id, order.total_price);
    Ok(order)
}

/// Inserts the line snapshots of an order in a single statement.
pub async fn insert_order_lines(
    order_id: OrderId,
    lines: &[NewOrderLine],
    conn: &mut SqliteConnection,
) -> Result<u64, sqlx::Error> {
    if lines.is_empty() {
        return Ok(0);
    }
    let mut builder = QueryBuilder::<Sqlite>::new(
        "INSERT INTO order_items (order_id, listing_id, product_name, product_unit, quantity, price_per_unit) ",
    );
    builder.push_values(lines, |mut row, line| {
        row.push_bind(order_id)
            .push_bind(line.listing_id)
            .push_bind(&line.product_name)
            .push_bind(&line.product_unit)
            .push_bind(line.quantity)
            .push_bind(line.price_per_unit);
    });
    let result = builder.build().execute(conn).await?;
    Ok(result.rows_affected())
}

pub async fn fetch_order(order_id: OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(order_id).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_order_lines(order_id: OrderId, conn: &mut SqliteConnection) -> Result<Vec<OrderLine>, sqlx::Error> {
    let lines = sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(lines)
}

/// The buyer's orders, newest first.
pub async fn fetch_orders_for_buyer(buyer: UserId, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as("SELECT * FROM orders WHERE buyer_id = $1 ORDER BY created_at DESC, id DESC")
        .bind(buyer)
        .fetch_all(conn)
        .await?;
    Ok(orders)
}

/// Compare-and-set on the order status. Returns `None` if the order does not exist or is no longer in `from`.
pub async fn update_status(
    order_id: OrderId,
    from: OrderStatusType,
    to: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET status = $1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND status = $3
            RETURNING *;
        "#,
    )
    .bind(to)
    .bind(order_id)
    .bind(from)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}
