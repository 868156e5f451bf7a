mod config;
pub mod database;
pub mod keys;
pub mod state;
pub mod store;

pub use config::{Config, CountdownConfig, EnforcementConfig};
pub use database::SqliteStore;
pub use keys::StateKey;
pub use state::{load_whitelist, save_whitelist, DisplaySettings, FloatingPosition, LockRecord};
pub use store::{MemoryStore, StateStore, StateStoreExt};

use std::path::PathBuf;

use crate::error::CoreError;

/// Returns the data directory holding `lockdown.db` and `config.toml`.
///
/// Resolution order: `LOCKDOWN_DATA_DIR` if set, otherwise
/// `~/.config/lockdown[-dev]/` based on `LOCKDOWN_ENV`
/// (set `LOCKDOWN_ENV=dev` to use the development directory).
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, CoreError> {
    let dir = match std::env::var_os("LOCKDOWN_DATA_DIR") {
        Some(explicit) => PathBuf::from(explicit),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("LOCKDOWN_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("lockdown-dev")
            } else {
                base_dir.join("lockdown")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
