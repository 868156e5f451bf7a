//! Pure per-tick decision rules.
//!
//! Nothing here touches the store or the device. The engine loads a
//! [`LockRecord`], runs [`expire_timer`], asks [`decide`] what to do and then
//! applies the resulting [`EnforcementAction`].

use serde::{Deserialize, Serialize};

use super::grace::in_grace;
use crate::storage::LockRecord;

/// Named view of the persisted flags.
///
/// ```text
/// Unlocked -> LockPending -> LockedUnconfirmed -> LockedConfirmed
///     ^                              |                   |
///     +------- GraceUnlocking <------+-------------------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockPhase {
    Unlocked,
    /// Timer armed, deadline in the future.
    LockPending,
    /// Lock is due, system lock not yet confirmed for this episode.
    LockedUnconfirmed,
    /// Lock is due and the system lock has been invoked.
    LockedConfirmed,
    /// Grace window after an unlock; enforcement effects paused.
    GraceUnlocking,
}

impl LockPhase {
    pub fn derive(record: &LockRecord, now_ms: u64) -> Self {
        if in_grace(record.grace_end_ms, now_ms) {
            LockPhase::GraceUnlocking
        } else if should_lock(record, now_ms) {
            if record.has_locked_session {
                LockPhase::LockedConfirmed
            } else {
                LockPhase::LockedUnconfirmed
            }
        } else if record.timer_end_ms.is_some() {
            LockPhase::LockPending
        } else {
            LockPhase::Unlocked
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub should_lock: bool,
    pub in_grace: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum EnforcementAction {
    /// Show the blocker; invoke the system lock if the latch is still open.
    Enforce { invoke_system_lock: bool },
    /// Lock intent persists but effects are paused for the grace window.
    Suspend,
    /// Nothing to enforce; close the latch if it was set.
    Release { reset_latch: bool },
}

/// `isLocked OR (timerEndTime set AND now >= timerEndTime)`.
pub fn should_lock(record: &LockRecord, now_ms: u64) -> bool {
    record.is_locked || record.timer_end_ms.is_some_and(|end| now_ms >= end)
}

/// Converts an elapsed deadline into a manual lock.
///
/// Returns the consumed deadline, or `None` when nothing changed. Running it
/// again with the same `now` is a no-op.
pub fn expire_timer(record: &mut LockRecord, now_ms: u64) -> Option<u64> {
    match record.timer_end_ms {
        Some(end) if now_ms >= end => {
            record.is_locked = true;
            record.timer_end_ms = None;
            Some(end)
        }
        _ => None,
    }
}

pub fn decide(record: &LockRecord, now_ms: u64) -> (Decision, EnforcementAction) {
    let decision = Decision {
        should_lock: should_lock(record, now_ms),
        in_grace: in_grace(record.grace_end_ms, now_ms),
    };
    let action = match (decision.should_lock, decision.in_grace) {
        (true, false) => EnforcementAction::Enforce {
            invoke_system_lock: !record.has_locked_session,
        },
        (true, true) => EnforcementAction::Suspend,
        (false, _) => EnforcementAction::Release {
            reset_latch: record.has_locked_session,
        },
    };
    (decision, action)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: u64 = 1_700_000_000_000;

    #[test]
    fn manual_lock_enforces_and_requests_system_lock() {
        let record = LockRecord {
            is_locked: true,
            ..Default::default()
        };
        let (decision, action) = decide(&record, NOW);
        assert!(decision.should_lock);
        assert!(!decision.in_grace);
        assert_eq!(
            action,
            EnforcementAction::Enforce {
                invoke_system_lock: true
            }
        );
    }

    #[test]
    fn latch_suppresses_repeat_system_lock() {
        let record = LockRecord {
            is_locked: true,
            has_locked_session: true,
            ..Default::default()
        };
        let (_, action) = decide(&record, NOW);
        assert_eq!(
            action,
            EnforcementAction::Enforce {
                invoke_system_lock: false
            }
        );
    }

    #[test]
    fn grace_suspends_without_clearing_intent() {
        let record = LockRecord {
            is_locked: true,
            grace_end_ms: Some(NOW + 20_000),
            ..Default::default()
        };
        let (decision, action) = decide(&record, NOW);
        assert!(decision.should_lock);
        assert!(decision.in_grace);
        assert_eq!(action, EnforcementAction::Suspend);
        assert!(record.is_locked);
    }

    #[test]
    fn grace_ends_exactly_at_deadline() {
        let record = LockRecord {
            is_locked: true,
            grace_end_ms: Some(NOW),
            ..Default::default()
        };
        let (decision, _) = decide(&record, NOW);
        assert!(!decision.in_grace);
    }

    #[test]
    fn release_resets_latch_only_when_set() {
        let latched = LockRecord {
            has_locked_session: true,
            ..Default::default()
        };
        assert_eq!(
            decide(&latched, NOW).1,
            EnforcementAction::Release { reset_latch: true }
        );
        assert_eq!(
            decide(&LockRecord::default(), NOW).1,
            EnforcementAction::Release { reset_latch: false }
        );
    }

    #[test]
    fn expiry_fires_at_the_deadline_and_only_once() {
        let mut record = LockRecord {
            timer_end_ms: Some(NOW),
            ..Default::default()
        };
        assert_eq!(expire_timer(&mut record, NOW - 1), None);
        assert!(!record.is_locked);

        assert_eq!(expire_timer(&mut record, NOW), Some(NOW));
        assert!(record.is_locked);
        assert_eq!(record.timer_end_ms, None);

        let after_first = record.clone();
        assert_eq!(expire_timer(&mut record, NOW), None);
        assert_eq!(record, after_first);
    }

    #[test]
    fn phases_follow_the_flags() {
        let mut record = LockRecord::default();
        assert_eq!(LockPhase::derive(&record, NOW), LockPhase::Unlocked);

        record.timer_end_ms = Some(NOW + 60_000);
        assert_eq!(LockPhase::derive(&record, NOW), LockPhase::LockPending);

        record.timer_end_ms = None;
        record.is_locked = true;
        assert_eq!(LockPhase::derive(&record, NOW), LockPhase::LockedUnconfirmed);

        record.has_locked_session = true;
        assert_eq!(LockPhase::derive(&record, NOW), LockPhase::LockedConfirmed);

        record.grace_end_ms = Some(NOW + 1);
        assert_eq!(LockPhase::derive(&record, NOW), LockPhase::GraceUnlocking);
    }
}
