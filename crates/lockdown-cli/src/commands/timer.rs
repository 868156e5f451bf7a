use clap::Subcommand;
use lockdown_core::{format_mm_ss, Clock, Config, SystemClock};
use serde_json::json;

use super::{open_bridge, print_json, CliResult};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Unlock and auto-lock again after the given minutes
    Start {
        /// Minutes until the lock engages (defaults to config)
        minutes: Option<u32>,
        /// Parental PIN
        #[arg(long)]
        pin: String,
    },
    /// Cancel the pending auto-lock
    Clear {
        /// Parental PIN
        #[arg(long)]
        pin: String,
    },
    /// Print the pending deadline and remaining time
    Status,
}

pub fn run(action: TimerAction) -> CliResult {
    let bridge = open_bridge()?;

    match action {
        TimerAction::Start { minutes, pin } => {
            bridge.require_pin(&pin)?;
            let minutes = minutes
                .unwrap_or_else(|| Config::load_or_default().countdown.default_timer_minutes);
            print_json(&bridge.start_timer(minutes)?)?;
        }
        TimerAction::Clear { pin } => {
            print_json(&bridge.clear_timer(&pin)?)?;
        }
        TimerAction::Status => {
            let now = SystemClock.now_ms();
            let end = bridge.timer_end_time();
            let remaining = end.map(|end| end.saturating_sub(now) / 1000);
            print_json(&json!({
                "timer_end_ms": end,
                "remaining_secs": remaining,
                "text": format_mm_ss(remaining.unwrap_or(0)),
                "locked": bridge.effective_locked(),
            }))?;
        }
    }
    Ok(())
}
