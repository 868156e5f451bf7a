//! Device-side collaborators.
//!
//! Every effect is best-effort. Implementations must return promptly; the
//! enforcement loop treats any error as "try again next tick".

use crate::error::EffectError;
use crate::storage::FloatingPosition;

/// OS-level immediate screen lock. Needs an admin grant obtained out-of-band.
pub trait SystemLock {
    /// Whether the display is currently on.
    fn is_interactive(&self) -> bool;

    fn lock_now(&mut self) -> Result<(), EffectError>;
}

/// Always-on-top surfaces. Needs an overlay grant obtained out-of-band.
pub trait Overlay {
    fn show_blocker(&mut self) -> Result<(), EffectError>;
    fn hide_blocker(&mut self);
    /// Surfaces the inline "Incorrect PIN" message on the blocker.
    fn show_pin_error(&mut self, message: &str);

    fn show_floating(&mut self, text: &str, position: FloatingPosition)
        -> Result<(), EffectError>;
    fn update_floating(&mut self, text: &str);
    fn hide_floating(&mut self);
}

pub trait AppRelauncher {
    /// Brings the primary interface back to the foreground.
    fn launch_primary_interface(&mut self) -> Result<(), EffectError>;
}

pub trait ForegroundApps {
    /// Identifier of the app currently in the foreground, if known.
    fn foreground_app(&self) -> Option<String>;
}

/// Everything the enforcement engine drives.
pub trait Device: SystemLock + Overlay + AppRelauncher + ForegroundApps {}

impl<T: SystemLock + Overlay + AppRelauncher + ForegroundApps> Device for T {}

/// One recorded call on a [`RecordingDevice`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCall {
    LockNow,
    ShowBlocker,
    HideBlocker,
    PinError(String),
    ShowFloating(String, FloatingPosition),
    UpdateFloating(String),
    HideFloating,
    LaunchPrimary,
}

/// In-memory device that records every call and can be told to fail.
///
/// Mirrors what is on screen so tests can assert visible state rather than
/// call sequences when that is all they care about.
#[derive(Debug, Clone)]
pub struct RecordingDevice {
    pub calls: Vec<DeviceCall>,
    pub interactive: bool,
    pub lock_error: Option<EffectError>,
    pub overlay_error: Option<EffectError>,
    pub foreground: Option<String>,
    pub blocker_visible: bool,
    pub floating: Option<(String, FloatingPosition)>,
}

impl Default for RecordingDevice {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            interactive: true,
            lock_error: None,
            overlay_error: None,
            foreground: None,
            blocker_visible: false,
            floating: None,
        }
    }
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, call: &DeviceCall) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }

    pub fn lock_calls(&self) -> usize {
        self.count(&DeviceCall::LockNow)
    }
}

impl SystemLock for RecordingDevice {
    fn is_interactive(&self) -> bool {
        self.interactive
    }

    fn lock_now(&mut self) -> Result<(), EffectError> {
        self.calls.push(DeviceCall::LockNow);
        match &self.lock_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

impl Overlay for RecordingDevice {
    fn show_blocker(&mut self) -> Result<(), EffectError> {
        self.calls.push(DeviceCall::ShowBlocker);
        if let Some(e) = &self.overlay_error {
            return Err(e.clone());
        }
        self.blocker_visible = true;
        Ok(())
    }

    fn hide_blocker(&mut self) {
        self.calls.push(DeviceCall::HideBlocker);
        self.blocker_visible = false;
    }

    fn show_pin_error(&mut self, message: &str) {
        self.calls.push(DeviceCall::PinError(message.to_string()));
    }

    fn show_floating(
        &mut self,
        text: &str,
        position: FloatingPosition,
    ) -> Result<(), EffectError> {
        self.calls
            .push(DeviceCall::ShowFloating(text.to_string(), position));
        if let Some(e) = &self.overlay_error {
            return Err(e.clone());
        }
        self.floating = Some((text.to_string(), position));
        Ok(())
    }

    fn update_floating(&mut self, text: &str) {
        self.calls.push(DeviceCall::UpdateFloating(text.to_string()));
        if let Some((shown, _)) = self.floating.as_mut() {
            *shown = text.to_string();
        }
    }

    fn hide_floating(&mut self) {
        self.calls.push(DeviceCall::HideFloating);
        self.floating = None;
    }
}

impl AppRelauncher for RecordingDevice {
    fn launch_primary_interface(&mut self) -> Result<(), EffectError> {
        self.calls.push(DeviceCall::LaunchPrimary);
        Ok(())
    }
}

impl ForegroundApps for RecordingDevice {
    fn foreground_app(&self) -> Option<String> {
        self.foreground.clone()
    }
}
