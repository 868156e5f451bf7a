//! Typed snapshot of the lock-related keys.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use super::keys::StateKey;
use super::store::{StateStore, StateStoreExt};
use crate::error::StoreError;

/// Screen corner for the floating countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FloatingPosition {
    TopLeft,
    #[default]
    TopRight,
    BottomLeft,
    BottomRight,
}

impl FloatingPosition {
    pub fn as_str(self) -> &'static str {
        match self {
            FloatingPosition::TopLeft => "top-left",
            FloatingPosition::TopRight => "top-right",
            FloatingPosition::BottomLeft => "bottom-left",
            FloatingPosition::BottomRight => "bottom-right",
        }
    }

    /// Lenient parse used when reading the store: unknown values fall back
    /// to the default corner.
    pub fn parse_or_default(raw: &str) -> Self {
        raw.parse().unwrap_or_default()
    }
}

impl fmt::Display for FloatingPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FloatingPosition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "top-left" => Ok(FloatingPosition::TopLeft),
            "top-right" => Ok(FloatingPosition::TopRight),
            "bottom-left" => Ok(FloatingPosition::BottomLeft),
            "bottom-right" => Ok(FloatingPosition::BottomRight),
            other => Err(format!(
                "unknown position '{other}' (expected top-left, top-right, bottom-left or bottom-right)"
            )),
        }
    }
}

/// Everything one enforcement tick needs, read in a single pass.
///
/// Keys are read one by one, so the record is not a consistent cut across
/// keys; the loop converges on the next tick.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LockRecord {
    pub is_locked: bool,
    pub timer_end_ms: Option<u64>,
    pub grace_end_ms: Option<u64>,
    pub has_locked_session: bool,
    pub show_floating_timer: bool,
    pub floating_position: FloatingPosition,
}

impl LockRecord {
    pub fn load<S: StateStore + ?Sized>(store: &S) -> Self {
        Self {
            is_locked: store.read_bool(StateKey::IsLocked, false),
            timer_end_ms: store.read_millis(StateKey::TimerEndTime),
            grace_end_ms: store.read_millis(StateKey::BridgeGraceEndTime),
            has_locked_session: store.read_bool(StateKey::HasLockedSession, false),
            show_floating_timer: store.read_bool(StateKey::ShowFloatingTimer, false),
            floating_position: store
                .read_string(StateKey::FloatingPosition)
                .map(|raw| FloatingPosition::parse_or_default(&raw))
                .unwrap_or_default(),
        }
    }
}

/// Presentation preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplaySettings {
    pub show_floating_timer: bool,
    pub floating_position: FloatingPosition,
    pub notification_enabled: bool,
}

impl DisplaySettings {
    pub fn load<S: StateStore + ?Sized>(store: &S) -> Self {
        Self {
            show_floating_timer: store.read_bool(StateKey::ShowFloatingTimer, false),
            floating_position: store
                .read_string(StateKey::FloatingPosition)
                .map(|raw| FloatingPosition::parse_or_default(&raw))
                .unwrap_or_default(),
            notification_enabled: store.read_bool(StateKey::NotificationEnabled, true),
        }
    }
}

/// Whitelist persisted as a JSON array of app identifiers.
pub fn load_whitelist<S: StateStore + ?Sized>(store: &S) -> BTreeSet<String> {
    match store.read_string(StateKey::Whitelist) {
        Some(raw) => match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(apps) => apps.into_iter().collect(),
            Err(e) => {
                tracing::warn!(error = %e, "undecodable whitelist, treating as empty");
                BTreeSet::new()
            }
        },
        None => BTreeSet::new(),
    }
}

pub fn save_whitelist<S: StateStore + ?Sized>(
    store: &S,
    apps: &BTreeSet<String>,
) -> Result<(), StoreError> {
    let json = serde_json::to_string(apps).map_err(|e| StoreError::CorruptValue {
        key: StateKey::Whitelist.to_string(),
        value: e.to_string(),
    })?;
    store.set(StateKey::Whitelist, &json)
}
