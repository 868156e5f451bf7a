pub mod config;
pub mod console;
pub mod lock;
pub mod pin;
pub mod service;
pub mod settings;
pub mod timer;
pub mod whitelist;

use std::sync::Arc;

use lockdown_core::{LockBridge, SqliteStore, SystemClock};
use serde::Serialize;

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

pub type Bridge = LockBridge<Arc<SqliteStore>, SystemClock>;

/// Open the shared store in the data directory.
pub fn open_store() -> Result<Arc<SqliteStore>, Box<dyn std::error::Error>> {
    Ok(Arc::new(SqliteStore::open()?))
}

pub fn open_bridge() -> Result<Bridge, Box<dyn std::error::Error>> {
    Ok(LockBridge::new(open_store()?, SystemClock))
}

pub fn print_json<T: Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
