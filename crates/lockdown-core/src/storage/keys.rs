//! The fixed key set of the durable state store.
//!
//! Every component reads and writes the store through [`StateKey`] rather
//! than free-form strings, so a typo cannot silently create a new key.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StateKey {
    /// Manual lock flag.
    IsLocked,
    /// Auto-lock deadline (epoch ms).
    TimerEndTime,
    /// Lock requests are dropped until this instant (epoch ms).
    BridgeGraceEndTime,
    /// System lock already invoked for the current episode.
    HasLockedSession,
    /// JSON array of exempt app identifiers.
    Whitelist,
    /// SHA-256 hex digest of the parental PIN.
    MasterPin,
    ShowFloatingTimer,
    FloatingPosition,
    NotificationEnabled,
}

impl StateKey {
    pub const ALL: [StateKey; 9] = [
        StateKey::IsLocked,
        StateKey::TimerEndTime,
        StateKey::BridgeGraceEndTime,
        StateKey::HasLockedSession,
        StateKey::Whitelist,
        StateKey::MasterPin,
        StateKey::ShowFloatingTimer,
        StateKey::FloatingPosition,
        StateKey::NotificationEnabled,
    ];

    /// Persisted key name.
    pub fn as_str(self) -> &'static str {
        match self {
            StateKey::IsLocked => "isLocked",
            StateKey::TimerEndTime => "timerEndTime",
            StateKey::BridgeGraceEndTime => "bridgeGraceEndTime",
            StateKey::HasLockedSession => "hasLockedSession",
            StateKey::Whitelist => "whitelist",
            StateKey::MasterPin => "masterPin",
            StateKey::ShowFloatingTimer => "showFloatingTimer",
            StateKey::FloatingPosition => "floatingPosition",
            StateKey::NotificationEnabled => "notificationEnabled",
        }
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StateKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StateKey::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown state key: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_names_round_trip() {
        for key in StateKey::ALL {
            assert_eq!(key.as_str().parse::<StateKey>().unwrap(), key);
        }
    }

    #[test]
    fn unknown_key_is_rejected() {
        assert!("is_locked".parse::<StateKey>().is_err());
    }
}
