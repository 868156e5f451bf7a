//! Fullscreen blocker state machine.
//!
//! ```text
//! Hidden -> Idle -> PinEntry -> Idle      (cancel)
//!                            -> Hidden    (verified unlock)
//! ```
//!
//! The only way out of a shown blocker is a verified PIN or the enforcement
//! loop deciding that nothing needs enforcing. Back navigation and outside
//! taps are ignored.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::pin::PinVault;

pub const INCORRECT_PIN_MESSAGE: &str = "Incorrect PIN";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum BlockerState {
    Hidden,
    Idle,
    PinEntry { error: Option<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinOutcome {
    Verified,
    Rejected,
    /// Blocker is hidden or not collecting a PIN.
    NotAccepting,
}

#[derive(Debug, Clone)]
pub struct BlockerOverlay {
    state: BlockerState,
}

impl Default for BlockerOverlay {
    fn default() -> Self {
        Self {
            state: BlockerState::Hidden,
        }
    }
}

impl BlockerOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &BlockerState {
        &self.state
    }

    pub fn is_shown(&self) -> bool {
        self.state != BlockerState::Hidden
    }

    /// Record that the surface is on screen. No-op if already shown.
    pub fn mark_shown(&mut self) {
        if self.state == BlockerState::Hidden {
            self.state = BlockerState::Idle;
        }
    }

    pub fn mark_hidden(&mut self) {
        self.state = BlockerState::Hidden;
    }

    /// "Unlock" pressed: switch to PIN entry with a cleared input.
    pub fn open_pin_entry(&mut self) -> bool {
        match self.state {
            BlockerState::Hidden => false,
            _ => {
                self.state = BlockerState::PinEntry { error: None };
                true
            }
        }
    }

    pub fn cancel_pin_entry(&mut self) -> bool {
        match self.state {
            BlockerState::PinEntry { .. } => {
                self.state = BlockerState::Idle;
                true
            }
            _ => false,
        }
    }

    /// Back navigation or an outside tap. Never dismisses.
    pub fn dismiss(&mut self) -> bool {
        debug!(state = ?self.state, "blocker dismiss ignored");
        false
    }

    /// Check a candidate PIN. On mismatch the blocker stays in PIN entry
    /// with an inline error; on match the caller performs the unlock.
    pub fn submit<V: PinVault + ?Sized>(&mut self, candidate: &str, vault: &V) -> PinOutcome {
        if !matches!(self.state, BlockerState::PinEntry { .. }) {
            return PinOutcome::NotAccepting;
        }
        if vault.verify(candidate) {
            PinOutcome::Verified
        } else {
            self.state = BlockerState::PinEntry {
                error: Some(INCORRECT_PIN_MESSAGE.to_string()),
            };
            PinOutcome::Rejected
        }
    }

    /// Keep the PIN entry open with a custom inline message.
    pub fn set_error(&mut self, message: &str) {
        if let BlockerState::PinEntry { error } = &mut self.state {
            *error = Some(message.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pin::StorePinVault;
    use crate::storage::MemoryStore;
    use std::sync::Arc;

    fn rescue_vault() -> StorePinVault<Arc<MemoryStore>> {
        StorePinVault::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn hidden_blocker_ignores_input() {
        let mut blocker = BlockerOverlay::new();
        assert!(!blocker.open_pin_entry());
        assert_eq!(blocker.submit("0000", &rescue_vault()), PinOutcome::NotAccepting);
    }

    #[test]
    fn pin_entry_cancel_returns_to_idle() {
        let mut blocker = BlockerOverlay::new();
        blocker.mark_shown();
        assert_eq!(blocker.state(), &BlockerState::Idle);
        assert!(blocker.open_pin_entry());
        assert!(blocker.cancel_pin_entry());
        assert_eq!(blocker.state(), &BlockerState::Idle);
        assert!(!blocker.cancel_pin_entry());
    }

    #[test]
    fn idle_blocker_does_not_accept_pins() {
        let mut blocker = BlockerOverlay::new();
        blocker.mark_shown();
        assert_eq!(blocker.submit("0000", &rescue_vault()), PinOutcome::NotAccepting);
    }

    #[test]
    fn wrong_pin_keeps_entry_open_with_error() {
        let vault = rescue_vault();
        let mut blocker = BlockerOverlay::new();
        blocker.mark_shown();
        blocker.open_pin_entry();

        assert_eq!(blocker.submit("1111", &vault), PinOutcome::Rejected);
        assert_eq!(
            blocker.state(),
            &BlockerState::PinEntry {
                error: Some("Incorrect PIN".into())
            }
        );

        // Reopening clears the error, retries are unlimited.
        blocker.open_pin_entry();
        assert_eq!(blocker.state(), &BlockerState::PinEntry { error: None });
        assert_eq!(blocker.submit("0000", &vault), PinOutcome::Verified);
    }

    #[test]
    fn dismiss_never_hides() {
        let mut blocker = BlockerOverlay::new();
        blocker.mark_shown();
        blocker.open_pin_entry();
        assert!(!blocker.dismiss());
        assert!(blocker.is_shown());
    }
}
