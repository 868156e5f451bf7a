use super::{open_bridge, print_json, CliResult};

pub fn lock() -> CliResult {
    let bridge = open_bridge()?;
    print_json(&bridge.lock_now()?)
}

pub fn unlock(pin: &str) -> CliResult {
    let bridge = open_bridge()?;
    print_json(&bridge.unlock_with_pin(pin)?)
}

pub fn status() -> CliResult {
    let bridge = open_bridge()?;
    print_json(&bridge.status())
}
