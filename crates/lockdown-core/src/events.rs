use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::FloatingPosition;

/// Every state change in the system produces an Event.
/// Front-ends print or forward them; tests assert on them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TimerStarted {
        minutes: u32,
        end_ms: u64,
        at: DateTime<Utc>,
    },
    TimerCleared {
        at: DateTime<Utc>,
    },
    /// Deadline elapsed and was converted into a manual lock.
    TimerExpired {
        deadline_ms: u64,
        at: DateTime<Utc>,
    },
    LockRequested {
        at: DateTime<Utc>,
    },
    /// Lock request arrived inside the grace window and was discarded.
    LockRequestDropped {
        grace_end_ms: u64,
        at: DateTime<Utc>,
    },
    UnlockGranted {
        grace_end_ms: u64,
        at: DateTime<Utc>,
    },
    PinRejected {
        at: DateTime<Utc>,
    },
    PinChanged {
        at: DateTime<Utc>,
    },
    BlockerShown {
        at: DateTime<Utc>,
    },
    BlockerHidden {
        at: DateTime<Utc>,
    },
    SystemLockInvoked {
        at: DateTime<Utc>,
    },
    SystemLockFailed {
        reason: String,
        at: DateTime<Utc>,
    },
    /// Lockdown episode ended; the one-shot latch was reopened.
    LockSessionReset {
        at: DateTime<Utc>,
    },
    /// Foreground app outside the whitelist; primary interface relaunched.
    AppBlocked {
        app: String,
        at: DateTime<Utc>,
    },
    FloatingShown {
        text: String,
        position: FloatingPosition,
        at: DateTime<Utc>,
    },
    FloatingHidden {
        at: DateTime<Utc>,
    },
    WhitelistUpdated {
        apps: Vec<String>,
        at: DateTime<Utc>,
    },
    SettingsUpdated {
        at: DateTime<Utc>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_type_tag() {
        let event = Event::LockRequestDropped {
            grace_end_ms: 5_000,
            at: DateTime::<Utc>::from_timestamp_millis(0).unwrap(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "LockRequestDropped");
        assert_eq!(json["grace_end_ms"], 5_000);
    }
}
