//! Grace period bookkeeping.
//!
//! A verified unlock opens a short window during which the enforcement loop
//! keeps its effects paused and incoming lock requests are dropped. This
//! keeps a stale lock command, or the tick that happens to run right after
//! the unlock, from re-locking the device.

use tracing::info;

use crate::error::StoreError;
use crate::storage::{StateKey, StateStore, StateStoreExt};

/// Length of the post-unlock grace window.
pub const GRACE_PERIOD_MS: u64 = 20_000;

/// `graceEnd set AND now < graceEnd`.
pub fn in_grace(grace_end_ms: Option<u64>, now_ms: u64) -> bool {
    grace_end_ms.is_some_and(|end| now_ms < end)
}

/// Reads the grace deadline and reports whether it is still open.
pub fn grace_active<S: StateStore + ?Sized>(store: &S, now_ms: u64) -> Option<u64> {
    store
        .read_millis(StateKey::BridgeGraceEndTime)
        .filter(|&end| now_ms < end)
}

/// Performs the unlock transition and returns the grace deadline.
///
/// The grace deadline is written first. If a later write is lost, an
/// observer sees grace-set-but-still-locked and merely suspends enforcement
/// until the grace window ends.
///
/// # Errors
/// Stops at the first failed write; keys already written stay written.
pub fn grant_unlock<S: StateStore + ?Sized>(store: &S, now_ms: u64) -> Result<u64, StoreError> {
    let grace_end = now_ms + GRACE_PERIOD_MS;
    store.write_millis(StateKey::BridgeGraceEndTime, Some(grace_end))?;
    store.write_bool(StateKey::IsLocked, false)?;
    store.write_millis(StateKey::TimerEndTime, None)?;
    store.write_bool(StateKey::HasLockedSession, false)?;
    info!(grace_end_ms = grace_end, "unlock granted");
    Ok(grace_end)
}
