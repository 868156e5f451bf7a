use clap::Subcommand;

use super::{open_bridge, print_json, CliResult};

#[derive(Subcommand)]
pub enum WhitelistAction {
    /// Allow an app while locked
    Add {
        app: String,
        /// Parental PIN
        #[arg(long)]
        pin: String,
    },
    /// Stop allowing an app
    Remove {
        app: String,
        /// Parental PIN
        #[arg(long)]
        pin: String,
    },
    /// Print the whitelist as JSON
    List,
    /// Replace the whole whitelist
    Set {
        apps: Vec<String>,
        /// Parental PIN
        #[arg(long)]
        pin: String,
    },
}

pub fn run(action: WhitelistAction) -> CliResult {
    let bridge = open_bridge()?;

    match action {
        WhitelistAction::Add { app, pin } => {
            bridge.require_pin(&pin)?;
            print_json(&bridge.add_to_whitelist(&app)?)
        }
        WhitelistAction::Remove { app, pin } => {
            bridge.require_pin(&pin)?;
            print_json(&bridge.remove_from_whitelist(&app)?)
        }
        WhitelistAction::List => print_json(&bridge.whitelist()),
        WhitelistAction::Set { apps, pin } => {
            bridge.require_pin(&pin)?;
            print_json(&bridge.set_whitelist(apps)?)
        }
    }
}
