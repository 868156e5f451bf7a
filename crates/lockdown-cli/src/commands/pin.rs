use clap::Subcommand;
use lockdown_core::RESCUE_PIN;

use super::{open_bridge, print_json, CliResult};

#[derive(Subcommand)]
pub enum PinAction {
    /// Set or change the parental PIN (4 to 6 digits)
    Set {
        new_pin: String,
        /// Current PIN; the rescue code while none is set
        #[arg(long)]
        current: Option<String>,
    },
    /// Check a PIN without changing anything
    Verify { pin: String },
}

pub fn run(action: PinAction) -> CliResult {
    let bridge = open_bridge()?;

    match action {
        PinAction::Set { new_pin, current } => {
            let current = current.as_deref().unwrap_or(RESCUE_PIN);
            print_json(&bridge.set_pin(current, &new_pin)?)
        }
        PinAction::Verify { pin } => {
            if bridge.verify_pin(&pin) {
                println!("ok");
                Ok(())
            } else {
                Err("incorrect PIN".into())
            }
        }
    }
}
