//! UI-facing façade over the shared store.
//!
//! Every front-end (CLI, a desktop shell, a phone UI) goes through
//! [`LockBridge`] instead of writing keys directly, so the grace rule and
//! write ordering are applied in one place.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::enforcement::decision::{should_lock, LockPhase};
use crate::enforcement::grace::{grace_active, grant_unlock};
use crate::enforcement::Clock;
use crate::error::{CoreError, Result, ValidationError};
use crate::events::Event;
use crate::pin::{PinVault, StorePinVault};
use crate::storage::{
    load_whitelist, save_whitelist, DisplaySettings, FloatingPosition, LockRecord, StateKey,
    StateStore, StateStoreExt,
};

/// Read-back snapshot for status displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockStatus {
    pub phase: LockPhase,
    /// `isLocked` or an elapsed timer.
    pub locked: bool,
    pub manual_lock: bool,
    pub timer_end_ms: Option<u64>,
    pub remaining_secs: Option<u64>,
    pub grace_end_ms: Option<u64>,
    pub has_locked_session: bool,
    pub pin_set: bool,
}

#[derive(Debug, Clone)]
pub struct LockBridge<S, C> {
    store: S,
    clock: C,
    vault: StorePinVault<S>,
}

impl<S, C> LockBridge<S, C>
where
    S: StateStore + Clone,
    C: Clock,
{
    pub fn new(store: S, clock: C) -> Self {
        Self {
            vault: StorePinVault::new(store.clone()),
            store,
            clock,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn vault(&self) -> &StorePinVault<S> {
        &self.vault
    }

    // ── Lock flag ────────────────────────────────────────────────────

    /// Request a lock state change.
    ///
    /// `true` inside an open grace window is dropped and reported as
    /// [`Event::LockRequestDropped`]. `false` performs the full unlock
    /// transition and opens a new grace window.
    pub fn set_locked(&self, locked: bool) -> Result<Event> {
        let now = self.clock.now_ms();
        let at = self.clock.now();

        if !locked {
            let grace_end_ms = grant_unlock(&self.store, now)?;
            return Ok(Event::UnlockGranted { grace_end_ms, at });
        }

        if let Some(grace_end_ms) = grace_active(&self.store, now) {
            info!(grace_end_ms, "lock request inside grace window dropped");
            return Ok(Event::LockRequestDropped { grace_end_ms, at });
        }

        self.store.write_bool(StateKey::IsLocked, true)?;
        info!("lock requested");
        Ok(Event::LockRequested { at })
    }

    /// Manual lock that also consumes any pending timer.
    ///
    /// A dropped request leaves the timer as it was.
    pub fn lock_now(&self) -> Result<Event> {
        let event = self.set_locked(true)?;
        if matches!(event, Event::LockRequested { .. }) {
            self.store.write_millis(StateKey::TimerEndTime, None)?;
        }
        Ok(event)
    }

    /// Whether enforcement is due right now: the manual flag or an elapsed
    /// deadline.
    pub fn effective_locked(&self) -> bool {
        should_lock(&LockRecord::load(&self.store), self.clock.now_ms())
    }

    // ── Timer ────────────────────────────────────────────────────────

    pub fn timer_end_time(&self) -> Option<u64> {
        self.store.read_millis(StateKey::TimerEndTime)
    }

    /// Raw deadline write. `None` clears the timer.
    pub fn set_timer_end_time(&self, end_ms: Option<u64>) -> Result<()> {
        self.store.write_millis(StateKey::TimerEndTime, end_ms)?;
        Ok(())
    }

    /// Unlock now and arm an auto-lock `minutes` from now.
    ///
    /// Callers verify the PIN first. Starting from a locked state is an
    /// unlock: the grace window opens and the latch resets before the new
    /// deadline is written.
    pub fn start_timer(&self, minutes: u32) -> Result<Event> {
        if minutes == 0 {
            return Err(ValidationError::InvalidValue {
                field: "minutes".into(),
                message: "must be greater than 0".into(),
            }
            .into());
        }
        let now = self.clock.now_ms();
        let end_ms = now + u64::from(minutes) * 60_000;

        if should_lock(&LockRecord::load(&self.store), now) {
            grant_unlock(&self.store, now)?;
        } else {
            self.store.write_bool(StateKey::IsLocked, false)?;
        }
        self.store.write_millis(StateKey::TimerEndTime, Some(end_ms))?;
        info!(minutes, end_ms, "timer started");
        Ok(Event::TimerStarted {
            minutes,
            end_ms,
            at: self.clock.now(),
        })
    }

    /// Cancel the pending auto-lock. Needs the parental PIN.
    pub fn clear_timer(&self, pin: &str) -> Result<Event> {
        self.require_pin(pin)?;
        self.store.write_millis(StateKey::TimerEndTime, None)?;
        debug!("timer cleared");
        Ok(Event::TimerCleared {
            at: self.clock.now(),
        })
    }

    // ── Whitelist ────────────────────────────────────────────────────

    pub fn whitelist(&self) -> BTreeSet<String> {
        load_whitelist(&self.store)
    }

    pub fn set_whitelist<I, A>(&self, apps: I) -> Result<Event>
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        let mut set = BTreeSet::new();
        for app in apps {
            set.insert(validate_app_id(app.into())?);
        }
        self.save_apps(set)
    }

    pub fn add_to_whitelist(&self, app: &str) -> Result<Event> {
        let app = validate_app_id(app.to_string())?;
        let mut set = self.whitelist();
        set.insert(app);
        self.save_apps(set)
    }

    pub fn remove_from_whitelist(&self, app: &str) -> Result<Event> {
        let mut set = self.whitelist();
        set.remove(app.trim());
        self.save_apps(set)
    }

    fn save_apps(&self, set: BTreeSet<String>) -> Result<Event> {
        save_whitelist(&self.store, &set)?;
        Ok(Event::WhitelistUpdated {
            apps: set.into_iter().collect(),
            at: self.clock.now(),
        })
    }

    // ── Display settings ─────────────────────────────────────────────

    pub fn settings(&self) -> DisplaySettings {
        DisplaySettings::load(&self.store)
    }

    pub fn save_settings(&self, settings: &DisplaySettings) -> Result<Event> {
        self.store
            .write_bool(StateKey::ShowFloatingTimer, settings.show_floating_timer)?;
        self.store
            .set(StateKey::FloatingPosition, settings.floating_position.as_str())?;
        self.store
            .write_bool(StateKey::NotificationEnabled, settings.notification_enabled)?;
        Ok(Event::SettingsUpdated {
            at: self.clock.now(),
        })
    }

    pub fn set_floating_enabled(&self, enabled: bool) -> Result<Event> {
        self.store.write_bool(StateKey::ShowFloatingTimer, enabled)?;
        Ok(Event::SettingsUpdated {
            at: self.clock.now(),
        })
    }

    pub fn set_floating_position(&self, position: FloatingPosition) -> Result<Event> {
        self.store.set(StateKey::FloatingPosition, position.as_str())?;
        Ok(Event::SettingsUpdated {
            at: self.clock.now(),
        })
    }

    pub fn set_notification_enabled(&self, enabled: bool) -> Result<Event> {
        self.store.write_bool(StateKey::NotificationEnabled, enabled)?;
        Ok(Event::SettingsUpdated {
            at: self.clock.now(),
        })
    }

    // ── PIN ──────────────────────────────────────────────────────────

    pub fn verify_pin(&self, candidate: &str) -> bool {
        self.vault.verify(candidate)
    }

    /// [`ValidationError::IncorrectPin`] unless `candidate` verifies.
    pub fn require_pin(&self, candidate: &str) -> Result<()> {
        if self.vault.verify(candidate) {
            Ok(())
        } else {
            Err(ValidationError::IncorrectPin.into())
        }
    }

    /// Replace the parental PIN. `current` must verify (the rescue code
    /// while no PIN is set).
    pub fn set_pin(&self, current: &str, new_pin: &str) -> Result<Event> {
        self.require_pin(current)?;
        self.vault.set(new_pin)?;
        info!("parental PIN changed");
        Ok(Event::PinChanged {
            at: self.clock.now(),
        })
    }

    /// Verify `pin` then unlock. Mirrors the blocker's success path for
    /// front-ends that collect the PIN themselves.
    pub fn unlock_with_pin(&self, pin: &str) -> Result<Event> {
        self.require_pin(pin)?;
        self.set_locked(false)
    }

    // ── Status ───────────────────────────────────────────────────────

    pub fn status(&self) -> LockStatus {
        let now = self.clock.now_ms();
        let record = LockRecord::load(&self.store);
        LockStatus {
            phase: LockPhase::derive(&record, now),
            locked: should_lock(&record, now),
            manual_lock: record.is_locked,
            remaining_secs: record
                .timer_end_ms
                .map(|end| end.saturating_sub(now) / 1000),
            timer_end_ms: record.timer_end_ms,
            grace_end_ms: record.grace_end_ms.filter(|&end| now < end),
            has_locked_session: record.has_locked_session,
            pin_set: self.vault.is_set(),
        }
    }
}

fn validate_app_id(app: String) -> std::result::Result<String, CoreError> {
    let trimmed = app.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::InvalidValue {
            field: "app".into(),
            message: "app identifier must not be empty".into(),
        }
        .into());
    }
    if trimmed.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidValue {
            field: "app".into(),
            message: format!("'{trimmed}' contains whitespace"),
        }
        .into());
    }
    Ok(trimmed.to_string())
}
