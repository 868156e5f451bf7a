use clap::Subcommand;
use lockdown_core::Config;

use super::{open_bridge, CliResult};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value
    Get {
        /// Config key (e.g. "enforcement.strategy", "countdown.suppress_secs")
        key: String,
    },
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// New value
        value: String,
        /// Parental PIN
        #[arg(long)]
        pin: String,
    },
    /// List all config values
    List,
    /// Reset config to defaults
    Reset {
        /// Parental PIN
        #[arg(long)]
        pin: String,
    },
}

pub fn run(action: ConfigAction) -> CliResult {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            match config.get(&key) {
                Some(value) => println!("{value}"),
                None => return Err(format!("unknown key: {key}").into()),
            }
        }
        ConfigAction::Set { key, value, pin } => {
            open_bridge()?.require_pin(&pin)?;
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            println!("ok");
        }
        ConfigAction::List => {
            let config = Config::load()?;
            let json = serde_json::to_string_pretty(&config)?;
            println!("{json}");
        }
        ConfigAction::Reset { pin } => {
            open_bridge()?.require_pin(&pin)?;
            let config = Config::default();
            config.save()?;
            println!("config reset to defaults");
        }
    }
    Ok(())
}
