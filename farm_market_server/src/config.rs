use std::{env, time::Duration};

use farm_market_engine::{
    db::sqlite::{busy_timeout, db_url, DEFAULT_BUSY_TIMEOUT_MS},
    db_types::PaymentPolicy,
};
use fm_common::helpers::parse_boolean_flag;
use log::*;

const DEFAULT_FM_HOST: &str = "127.0.0.1";
const DEFAULT_FM_PORT: u16 = 8360;
const DEFAULT_MAX_CONNECTIONS: u32 = 25;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub max_connections: u32,
    /// How long a request waits for SQLite's write lock before the operation fails.
    pub busy_timeout: Duration,
    /// Decides the status of newly placed orders.
    pub payment_policy: PaymentPolicy,
    /// If true, the embedded migrations are run against the database before the server starts accepting requests.
    pub run_migrations: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_FM_HOST.to_string(),
            port: DEFAULT_FM_PORT,
            database_url: String::default(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            busy_timeout: Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
            payment_policy: PaymentPolicy::default(),
            run_migrations: true,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("FM_HOST").ok().unwrap_or_else(|| DEFAULT_FM_HOST.into());
        let port = env::var("FM_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!("🪛️ {s} is not a valid port for FM_PORT. {e} Using the default, {DEFAULT_FM_PORT}, instead.");
                    DEFAULT_FM_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_FM_PORT);
        let database_url = db_url();
        let max_connections = env::var("FM_DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| match s.parse::<u32>() {
                Ok(0) => {
                    warn!("🪛️ FM_DB_MAX_CONNECTIONS must be at least 1. Using the default, {DEFAULT_MAX_CONNECTIONS}.");
                    None
                },
                Ok(n) => Some(n),
                Err(e) => {
                    warn!("🪛️ Invalid FM_DB_MAX_CONNECTIONS ({s}). {e} Using the default, {DEFAULT_MAX_CONNECTIONS}.");
                    None
                },
            })
            .unwrap_or(DEFAULT_MAX_CONNECTIONS);
        let payment_policy = configure_payment_policy();
        let run_migrations = parse_boolean_flag(env::var("FM_RUN_MIGRATIONS").ok(), true);
        Self {
            host,
            port,
            database_url,
            max_connections,
            busy_timeout: busy_timeout(),
            payment_policy,
            run_migrations,
        }
    }
}

fn configure_payment_policy() -> PaymentPolicy {
    match env::var("FM_PAYMENT_POLICY") {
        Ok(s) => s.parse::<PaymentPolicy>().unwrap_or_else(|e| {
            warn!("🪛️ {e}. Using the default payment policy, {}.", PaymentPolicy::default());
            PaymentPolicy::default()
        }),
        Err(_) => {
            info!("🪛️ FM_PAYMENT_POLICY is not set. Orders will be placed with {} payments.", PaymentPolicy::default());
            PaymentPolicy::default()
        },
    }
}
