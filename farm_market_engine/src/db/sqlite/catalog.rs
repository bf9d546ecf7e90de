//! Users and listings. The catalog belongs to other parts of the marketplace; these queries exist so that the engine
//! can be seeded and exercised. Nothing here writes `listings.available` after a listing is created.
use fm_common::Money;
use sqlx::SqliteConnection;

use crate::db_types::{Listing, ListingId, ListingStatus, NewListing, NewUser, User, UserId};

pub async fn insert_user(user: NewUser, conn: &mut SqliteConnection) -> Result<User, sqlx::Error> {
    let user = sqlx::query_as("INSERT INTO users (username, role) VALUES ($1, $2) RETURNING *")
        .bind(user.username)
        .bind(user.role)
        .fetch_one(conn)
        .await?;
    Ok(user)
}

pub async fn fetch_user(user_id: UserId, conn: &mut SqliteConnection) -> Result<Option<User>, sqlx::Error> {
    let user = sqlx::query_as("SELECT * FROM users WHERE id = $1").bind(user_id).fetch_optional(conn).await?;
    Ok(user)
}

pub async fn delete_user(user_id: UserId, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1").bind(user_id).execute(conn).await?;
    Ok(result.rows_affected() > 0)
}

pub async fn insert_listing(listing: NewListing, conn: &mut SqliteConnection) -> Result<Listing, sqlx::Error> {
    let listing = sqlx::query_as(
        r#"
            INSERT INTO listings (farmer_id, name, unit, price, available, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(listing.farmer_id)
    .bind(listing.name)
    .bind(listing.unit)
    .bind(listing.price)
    .bind(listing.available)
    .bind(listing.status)
    .fetch_one(conn)
    .await?;
    Ok(listing)
}

pub async fn update_listing_price(
    listing_id: ListingId,
    price: Money,
    conn: &mut SqliteConnection,
) -> Result<Option<Listing>, sqlx::Error> {
    let listing =
        sqlx::query_as("UPDATE listings SET price = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *")
            .bind(price)
            .bind(listing_id)
            .fetch_optional(conn)
            .await?;
    Ok(listing)
}

pub async fn update_listing_status(
    listing_id: ListingId,
    status: ListingStatus,
    conn: &mut SqliteConnection,
) -> Result<Option<Listing>, sqlx::Error> {
    let listing =
        sqlx::query_as("UPDATE listings SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *")
            .bind(status)
            .bind(listing_id)
            .fetch_optional(conn)
            .await?;
    Ok(listing)
}

pub async fn delete_listing(listing_id: ListingId, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM listings WHERE id = $1").bind(listing_id).execute(conn).await?;
    Ok(result.rows_affected() > 0)
}
