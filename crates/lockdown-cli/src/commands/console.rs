//! Device implementation for terminals.
//!
//! There is no real overlay or OS lock here: every effect is reported
//! through tracing so the enforcement loop can be watched from a shell.

use lockdown_core::enforcement::{AppRelauncher, ForegroundApps, Overlay, SystemLock};
use lockdown_core::{EffectError, FloatingPosition};
use tracing::{info, warn};

#[derive(Debug, Default)]
pub struct ConsoleDevice {
    foreground: Option<String>,
    floating: Option<String>,
}

impl ConsoleDevice {
    pub fn new(foreground: Option<String>) -> Self {
        Self {
            foreground,
            floating: None,
        }
    }
}

impl SystemLock for ConsoleDevice {
    fn is_interactive(&self) -> bool {
        true
    }

    fn lock_now(&mut self) -> Result<(), EffectError> {
        info!(target: "lockdown::device", "system lock");
        Ok(())
    }
}

impl Overlay for ConsoleDevice {
    fn show_blocker(&mut self) -> Result<(), EffectError> {
        info!(target: "lockdown::device", "blocker shown");
        Ok(())
    }

    fn hide_blocker(&mut self) {
        info!(target: "lockdown::device", "blocker hidden");
    }

    fn show_pin_error(&mut self, message: &str) {
        warn!(target: "lockdown::device", "{message}");
    }

    fn show_floating(&mut self, text: &str, position: FloatingPosition) -> Result<(), EffectError> {
        info!(target: "lockdown::device", %position, "countdown {text}");
        self.floating = Some(text.to_string());
        Ok(())
    }

    fn update_floating(&mut self, text: &str) {
        // Only log minute boundaries to keep the output readable.
        if text.ends_with(":00") {
            info!(target: "lockdown::device", "countdown {text}");
        }
        self.floating = Some(text.to_string());
    }

    fn hide_floating(&mut self) {
        if self.floating.take().is_some() {
            info!(target: "lockdown::device", "countdown hidden");
        }
    }
}

impl AppRelauncher for ConsoleDevice {
    fn launch_primary_interface(&mut self) -> Result<(), EffectError> {
        info!(target: "lockdown::device", "primary interface relaunched");
        Ok(())
    }
}

impl ForegroundApps for ConsoleDevice {
    fn foreground_app(&self) -> Option<String> {
        self.foreground.clone()
    }
}
