use clap::{ArgAction, Subcommand};
use lockdown_core::FloatingPosition;

use super::{open_bridge, print_json, CliResult};

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Print display settings as JSON
    Show,
    /// Floating countdown overlay
    Floating {
        #[arg(action = ArgAction::Set)]
        enabled: bool,
        /// top-left, top-right, bottom-left or bottom-right
        #[arg(long)]
        position: Option<FloatingPosition>,
        /// Parental PIN
        #[arg(long)]
        pin: String,
    },
    /// Notification countdown
    Notification {
        #[arg(action = ArgAction::Set)]
        enabled: bool,
        /// Parental PIN
        #[arg(long)]
        pin: String,
    },
}

pub fn run(action: SettingsAction) -> CliResult {
    let bridge = open_bridge()?;

    match action {
        SettingsAction::Show => print_json(&bridge.settings()),
        SettingsAction::Floating {
            enabled,
            position,
            pin,
        } => {
            bridge.require_pin(&pin)?;
            bridge.set_floating_enabled(enabled)?;
            if let Some(position) = position {
                bridge.set_floating_position(position)?;
            }
            print_json(&bridge.settings())
        }
        SettingsAction::Notification { enabled, pin } => {
            bridge.require_pin(&pin)?;
            bridge.set_notification_enabled(enabled)?;
            print_json(&bridge.settings())
        }
    }
}
