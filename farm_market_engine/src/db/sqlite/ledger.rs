//! Inventory ledger queries. These are the only statements in the crate that write `listings.available`.
use fm_common::Quantity;
use sqlx::SqliteConnection;

use crate::db_types::{Listing, ListingId};

pub async fn fetch_listing(listing_id: ListingId, conn: &mut SqliteConnection) -> Result<Option<Listing>, sqlx::Error> {
    let listing = sqlx::query_as("SELECT * FROM listings WHERE id = $1").bind(listing_id).fetch_optional(conn).await?;
    Ok(listing)
}

/// Compare-and-decrement. The availability check and the decrement are one statement, so no other writer can get
/// between them. Returns `false` (and changes nothing) if the listing is missing or holds less than `quantity`.
pub async fn reserve(
    listing_id: ListingId,
    quantity: Quantity,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
            UPDATE listings SET available = available - $1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND available >= $1
        "#,
    )
    .bind(quantity)
    .bind(listing_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Adds `quantity` back to the listing. Returns `false` if the listing no longer exists.
pub async fn release(
    listing_id: ListingId,
    quantity: Quantity,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE listings SET available = available + $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2",
    )
    .bind(quantity)
    .bind(listing_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}
