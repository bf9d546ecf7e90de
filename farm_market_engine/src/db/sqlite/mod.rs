mod db;
mod errors;

pub mod carts;
pub mod catalog;
pub mod ledger;
pub mod orders;

use std::{env, str::FromStr, time::Duration};

pub use db::SqliteDatabase;
pub use errors::SqliteDatabaseError;
use log::*;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
    SqlitePool,
};

const SQLITE_DB_URL: &str = "sqlite://data/farm_market.db";
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

pub fn db_url() -> String {
    let result = env::var("FM_DATABASE_URL").unwrap_or_else(|_| {
        info!("🗃️ FM_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("🗃️ Using database URL: {result}");
    result
}

/// How long a connection waits for SQLite's write lock before giving up, from `FM_DB_BUSY_TIMEOUT_MS`.
pub fn busy_timeout() -> Duration {
    let ms = env::var("FM_DB_BUSY_TIMEOUT_MS")
        .ok()
        .and_then(|s| {
            s.parse::<u64>()
                .map_err(|e| warn!("🗃️ Invalid FM_DB_BUSY_TIMEOUT_MS ({s}): {e}. Using the default."))
                .ok()
        })
        .unwrap_or(DEFAULT_BUSY_TIMEOUT_MS);
    Duration::from_millis(ms)
}

/// Opens a connection pool. Every connection runs in WAL mode with foreign keys enforced, and waits at most
/// `busy_timeout` for a lock, after which the statement fails with `SQLITE_BUSY`.
pub async fn new_pool(
    url: &str,
    max_connections: u32,
    busy_timeout: Duration,
) -> Result<SqlitePool, SqliteDatabaseError> {
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .busy_timeout(busy_timeout);
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(busy_timeout.max(Duration::from_secs(1)) * 2)
        .connect_with(options)
        .await?;
    Ok(pool)
}
