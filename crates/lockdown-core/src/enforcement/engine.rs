//! Enforcement engine.
//!
//! A polling state machine. It holds no thread of its own: the caller (see
//! [`crate::service`]) invokes [`Enforcer::tick`] once per period, and the
//! blocker's input handler calls the `blocker_*` methods between ticks.
//!
//! ## Per-tick order
//!
//! ```text
//! load record -> expire timer -> decide -> apply action -> refresh countdown
//! ```
//!
//! All persistent state lives in the store. The engine keeps only what is on
//! screen (blocker and countdown), so a restarted engine converges on the
//! next tick.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::blocker::{BlockerOverlay, BlockerState, PinOutcome};
use super::clock::{to_datetime, Clock};
use super::decision::{decide, expire_timer, Decision, EnforcementAction, LockPhase};
use super::effects::Device;
use super::floating::FloatingCountdown;
use super::grace::grant_unlock;
use crate::events::Event;
use crate::pin::StorePinVault;
use crate::storage::{load_whitelist, LockRecord, StateKey, StateStore, StateStoreExt};

/// Which enforcement variant runs while a lock is due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnforcementStrategy {
    /// Fullscreen blocker plus a one-shot system screen lock per episode.
    #[default]
    ScreenLock,
    /// Relaunch the primary interface whenever a non-whitelisted app is in
    /// the foreground. No system lock, no latch.
    AppWhitelist,
}

/// Outcome of one tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickReport {
    pub now_ms: u64,
    pub decision: Decision,
    pub action: EnforcementAction,
    pub phase: LockPhase,
    pub events: Vec<Event>,
}

pub struct Enforcer<S, C, D> {
    store: S,
    clock: C,
    device: D,
    vault: StorePinVault<S>,
    strategy: EnforcementStrategy,
    primary_app: String,
    blocker: BlockerOverlay,
    floating: FloatingCountdown,
}

impl<S, C, D> Enforcer<S, C, D>
where
    S: StateStore + Clone,
    C: Clock,
    D: Device,
{
    pub fn new(store: S, clock: C, device: D) -> Self {
        Self {
            vault: StorePinVault::new(store.clone()),
            store,
            clock,
            device,
            strategy: EnforcementStrategy::default(),
            primary_app: String::new(),
            blocker: BlockerOverlay::new(),
            floating: FloatingCountdown::new(),
        }
    }

    pub fn with_strategy(mut self, strategy: EnforcementStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_primary_app(mut self, primary_app: impl Into<String>) -> Self {
        self.primary_app = primary_app.into();
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn strategy(&self) -> EnforcementStrategy {
        self.strategy
    }

    pub fn blocker_state(&self) -> &BlockerState {
        self.blocker.state()
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    // ── Tick ─────────────────────────────────────────────────────────

    pub fn tick(&mut self) -> TickReport {
        let now = self.clock.now_ms();
        let at = to_datetime(now);
        let mut events = Vec::new();
        let mut record = LockRecord::load(&self.store);

        if let Some(deadline) = expire_timer(&mut record, now) {
            // Lock first: a lost second write leaves an elapsed deadline,
            // which still reads as "should lock" and is retried.
            self.persist(self.store.write_bool(StateKey::IsLocked, true), StateKey::IsLocked);
            self.persist(
                self.store.write_millis(StateKey::TimerEndTime, None),
                StateKey::TimerEndTime,
            );
            info!(deadline_ms = deadline, "timer elapsed, lock engaged");
            events.push(Event::TimerExpired {
                deadline_ms: deadline,
                at,
            });
        }

        let (decision, action) = decide(&record, now);
        debug!(?decision, ?action, "tick");

        match action {
            EnforcementAction::Enforce { invoke_system_lock } => match self.strategy {
                EnforcementStrategy::ScreenLock => {
                    self.ensure_blocker(at, &mut events);
                    if invoke_system_lock {
                        self.try_system_lock(&mut record, at, &mut events);
                    }
                }
                EnforcementStrategy::AppWhitelist => {
                    self.remove_blocker(at, &mut events);
                    self.enforce_whitelist(at, &mut events);
                }
            },
            EnforcementAction::Suspend => {
                self.remove_blocker(at, &mut events);
            }
            EnforcementAction::Release { reset_latch } => {
                self.remove_blocker(at, &mut events);
                if reset_latch {
                    self.persist(
                        self.store.write_bool(StateKey::HasLockedSession, false),
                        StateKey::HasLockedSession,
                    );
                    record.has_locked_session = false;
                    events.push(Event::LockSessionReset { at });
                }
            }
        }

        self.floating
            .refresh(&record, now, &mut self.device, at, &mut events);

        TickReport {
            now_ms: now,
            decision,
            action,
            phase: LockPhase::derive(&record, now),
            events,
        }
    }

    // ── Blocker input ────────────────────────────────────────────────

    pub fn blocker_open_pin_entry(&mut self) -> bool {
        self.blocker.open_pin_entry()
    }

    pub fn blocker_cancel_pin_entry(&mut self) -> bool {
        self.blocker.cancel_pin_entry()
    }

    pub fn blocker_dismiss(&mut self) -> bool {
        self.blocker.dismiss()
    }

    /// Verify a PIN typed into the blocker and, on success, unlock.
    pub fn blocker_submit_pin(&mut self, candidate: &str) -> (PinOutcome, Vec<Event>) {
        let now = self.clock.now_ms();
        let at = to_datetime(now);
        let mut events = Vec::new();

        let outcome = self.blocker.submit(candidate, &self.vault);
        match outcome {
            PinOutcome::Verified => match grant_unlock(&self.store, now) {
                Ok(grace_end_ms) => {
                    events.push(Event::UnlockGranted { grace_end_ms, at });
                    self.remove_blocker(at, &mut events);
                    if let Err(e) = self.device.launch_primary_interface() {
                        warn!(error = %e, "relaunch after unlock failed");
                    }
                }
                Err(e) => {
                    warn!(error = %e, "unlock could not be persisted");
                    self.blocker.set_error("Unlock failed, try again");
                    return (PinOutcome::Rejected, events);
                }
            },
            PinOutcome::Rejected => {
                self.device.show_pin_error(super::blocker::INCORRECT_PIN_MESSAGE);
                events.push(Event::PinRejected { at });
            }
            PinOutcome::NotAccepting => {}
        }
        (outcome, events)
    }

    /// Release every surface this engine put on screen.
    pub fn shutdown(&mut self) -> Vec<Event> {
        let at = self.clock.now();
        let mut events = Vec::new();
        self.remove_blocker(at, &mut events);
        self.floating.hide(&mut self.device, at, &mut events);
        info!("enforcement stopped");
        events
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn ensure_blocker(&mut self, at: chrono::DateTime<chrono::Utc>, events: &mut Vec<Event>) {
        if self.blocker.is_shown() {
            return;
        }
        match self.device.show_blocker() {
            Ok(()) => {
                self.blocker.mark_shown();
                info!("blocker shown");
                events.push(Event::BlockerShown { at });
            }
            Err(e) => warn!(error = %e, "blocker overlay unavailable, retrying next tick"),
        }
    }

    fn remove_blocker(&mut self, at: chrono::DateTime<chrono::Utc>, events: &mut Vec<Event>) {
        if !self.blocker.is_shown() {
            return;
        }
        self.device.hide_blocker();
        self.blocker.mark_hidden();
        events.push(Event::BlockerHidden { at });
    }

    fn try_system_lock(
        &mut self,
        record: &mut LockRecord,
        at: chrono::DateTime<chrono::Utc>,
        events: &mut Vec<Event>,
    ) {
        if !self.device.is_interactive() {
            debug!("display off, system lock deferred");
            return;
        }
        match self.device.lock_now() {
            Ok(()) => {
                self.persist(
                    self.store.write_bool(StateKey::HasLockedSession, true),
                    StateKey::HasLockedSession,
                );
                record.has_locked_session = true;
                info!("system lock invoked");
                events.push(Event::SystemLockInvoked { at });
            }
            Err(e) => {
                warn!(error = %e, "system lock failed, blocker remains");
                events.push(Event::SystemLockFailed {
                    reason: e.to_string(),
                    at,
                });
            }
        }
    }

    fn enforce_whitelist(&mut self, at: chrono::DateTime<chrono::Utc>, events: &mut Vec<Event>) {
        let Some(app) = self.device.foreground_app() else {
            return;
        };
        if app == self.primary_app || load_whitelist(&self.store).contains(&app) {
            return;
        }
        match self.device.launch_primary_interface() {
            Ok(()) => {
                info!(app = %app, "blocked app, primary interface relaunched");
                events.push(Event::AppBlocked { app, at });
            }
            Err(e) => warn!(app = %app, error = %e, "relaunch failed"),
        }
    }

    fn persist(&self, result: Result<(), crate::error::StoreError>, key: StateKey) {
        if let Err(e) = result {
            warn!(key = %key, error = %e, "store write dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enforcement::clock::ManualClock;
    use crate::enforcement::effects::{DeviceCall, RecordingDevice};
    use crate::error::EffectError;
    use crate::storage::{FloatingPosition, MemoryStore};
    use std::sync::Arc;

    const NOW: u64 = 1_700_000_000_000;

    type TestEnforcer = Enforcer<Arc<MemoryStore>, Arc<ManualClock>, RecordingDevice>;

    fn setup() -> (Arc<MemoryStore>, Arc<ManualClock>, TestEnforcer) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(NOW));
        let enforcer = Enforcer::new(Arc::clone(&store), Arc::clone(&clock), RecordingDevice::new())
            .with_primary_app("com.parentcontrol");
        (store, clock, enforcer)
    }

    #[test]
    fn idle_tick_does_nothing() {
        let (_store, _clock, mut enforcer) = setup();
        let report = enforcer.tick();
        assert!(!report.decision.should_lock);
        assert_eq!(report.phase, LockPhase::Unlocked);
        assert!(report.events.is_empty());
        assert!(enforcer.device().calls.is_empty());
    }

    #[test]
    fn manual_lock_shows_blocker_and_locks_once() {
        let (store, clock, mut enforcer) = setup();
        store.write_bool(StateKey::IsLocked, true).unwrap();

        for _ in 0..5 {
            enforcer.tick();
            clock.advance(1_000);
        }

        assert_eq!(enforcer.device().lock_calls(), 1);
        assert_eq!(enforcer.device().count(&DeviceCall::ShowBlocker), 1);
        assert!(enforcer.device().blocker_visible);
        assert!(store.read_bool(StateKey::HasLockedSession, false));
    }

    #[test]
    fn failed_system_lock_is_retried_and_blocker_still_shown() {
        let (store, _clock, mut enforcer) = setup();
        store.write_bool(StateKey::IsLocked, true).unwrap();
        enforcer.device_mut().lock_error =
            Some(EffectError::PermissionDenied("device admin not active".into()));

        let report = enforcer.tick();
        assert!(report
            .events
            .iter()
            .any(|e| matches!(e, Event::SystemLockFailed { .. })));
        assert!(enforcer.device().blocker_visible);
        assert!(!store.read_bool(StateKey::HasLockedSession, false));

        enforcer.device_mut().lock_error = None;
        enforcer.tick();
        enforcer.tick();
        assert_eq!(enforcer.device().lock_calls(), 2);
        assert!(store.read_bool(StateKey::HasLockedSession, false));
    }

    #[test]
    fn screen_off_defers_system_lock() {
        let (store, _clock, mut enforcer) = setup();
        store.write_bool(StateKey::IsLocked, true).unwrap();
        enforcer.device_mut().interactive = false;

        enforcer.tick();
        assert_eq!(enforcer.device().lock_calls(), 0);
        assert_eq!(LockPhase::derive(&LockRecord::load(&store), NOW), LockPhase::LockedUnconfirmed);

        enforcer.device_mut().interactive = true;
        enforcer.tick();
        assert_eq!(enforcer.device().lock_calls(), 1);
    }

    #[test]
    fn blocker_failure_is_retried_next_tick() {
        let (store, _clock, mut enforcer) = setup();
        store.write_bool(StateKey::IsLocked, true).unwrap();
        enforcer.device_mut().overlay_error =
            Some(EffectError::PermissionDenied("draw over other apps".into()));

        enforcer.tick();
        assert_eq!(enforcer.blocker_state(), &BlockerState::Hidden);

        enforcer.device_mut().overlay_error = None;
        enforcer.tick();
        assert_eq!(enforcer.blocker_state(), &BlockerState::Idle);
        assert_eq!(enforcer.device().count(&DeviceCall::ShowBlocker), 2);
    }

    #[test]
    fn grace_window_hides_blocker_and_skips_system_lock() {
        let (store, clock, mut enforcer) = setup();
        store.write_bool(StateKey::IsLocked, true).unwrap();
        store
            .write_millis(StateKey::BridgeGraceEndTime, Some(NOW + 20_000))
            .unwrap();

        for _ in 0..20 {
            let report = enforcer.tick();
            assert_eq!(report.action, EnforcementAction::Suspend);
            clock.advance(1_000);
        }
        assert_eq!(enforcer.device().lock_calls(), 0);
        assert!(!enforcer.device().blocker_visible);
        assert!(store.read_bool(StateKey::IsLocked, false));

        // Grace deadline reached.
        let report = enforcer.tick();
        assert!(matches!(report.action, EnforcementAction::Enforce { .. }));
        assert_eq!(enforcer.device().lock_calls(), 1);
        assert!(enforcer.device().blocker_visible);
    }

    #[test]
    fn timer_expiry_engages_lock_and_hides_countdown() {
        let (store, clock, mut enforcer) = setup();
        store.write_millis(StateKey::TimerEndTime, Some(NOW + 1_000)).unwrap();
        store.write_bool(StateKey::ShowFloatingTimer, true).unwrap();
        store.set(StateKey::FloatingPosition, "top-right").unwrap();

        let report = enforcer.tick();
        assert_eq!(report.phase, LockPhase::LockPending);
        assert_eq!(
            enforcer.device().floating,
            Some(("00:00:01".to_string(), FloatingPosition::TopRight))
        );

        clock.advance(1_000);
        let report = enforcer.tick();
        assert!(report.decision.should_lock);
        assert!(report
            .events
            .iter()
            .any(|e| matches!(e, Event::TimerExpired { deadline_ms, .. } if *deadline_ms == NOW + 1_000)));
        assert!(store.read_bool(StateKey::IsLocked, false));
        assert_eq!(store.read_millis(StateKey::TimerEndTime), None);
        assert!(enforcer.device().floating.is_none());
        assert!(enforcer.device().blocker_visible);
    }

    #[test]
    fn pin_unlock_opens_grace_and_relaunches() {
        let (store, clock, mut enforcer) = setup();
        store.write_bool(StateKey::IsLocked, true).unwrap();
        enforcer.tick();
        assert!(store.read_bool(StateKey::HasLockedSession, false));

        clock.advance(3_000);
        let now = NOW + 3_000;
        assert!(enforcer.blocker_open_pin_entry());
        let (outcome, events) = enforcer.blocker_submit_pin("0000");
        assert_eq!(outcome, PinOutcome::Verified);
        assert!(matches!(events[0], Event::UnlockGranted { grace_end_ms, .. } if grace_end_ms == now + 20_000));

        let record = LockRecord::load(&store);
        assert!(!record.is_locked);
        assert_eq!(record.timer_end_ms, None);
        assert!(!record.has_locked_session);
        assert_eq!(record.grace_end_ms, Some(now + 20_000));
        assert!(!enforcer.device().blocker_visible);
        assert_eq!(enforcer.device().count(&DeviceCall::LaunchPrimary), 1);

        let report = enforcer.tick();
        assert_eq!(report.phase, LockPhase::GraceUnlocking);
        assert!(!report.decision.should_lock);
    }

    #[test]
    fn wrong_pin_keeps_blocker_up() {
        let (store, _clock, mut enforcer) = setup();
        store.write_bool(StateKey::IsLocked, true).unwrap();
        enforcer.tick();
        enforcer.blocker_open_pin_entry();

        let (outcome, events) = enforcer.blocker_submit_pin("1234");
        assert_eq!(outcome, PinOutcome::Rejected);
        assert!(matches!(events[0], Event::PinRejected { .. }));
        assert!(enforcer.device().blocker_visible);
        assert!(store.read_bool(StateKey::IsLocked, false));
        assert!(!enforcer.blocker_dismiss());
        assert!(matches!(enforcer.blocker_state(), BlockerState::PinEntry { error: Some(_) }));
    }

    #[test]
    fn latch_reopens_after_episode_ends() {
        let (store, clock, mut enforcer) = setup();
        store.write_bool(StateKey::IsLocked, true).unwrap();
        enforcer.tick();
        assert_eq!(enforcer.device().lock_calls(), 1);

        // Unlocked without the grace window, e.g. by another process.
        store.write_bool(StateKey::IsLocked, false).unwrap();
        clock.advance(1_000);
        let report = enforcer.tick();
        assert!(report
            .events
            .iter()
            .any(|e| matches!(e, Event::LockSessionReset { .. })));
        assert!(!store.read_bool(StateKey::HasLockedSession, true));

        store.write_bool(StateKey::IsLocked, true).unwrap();
        clock.advance(1_000);
        enforcer.tick();
        assert_eq!(enforcer.device().lock_calls(), 2);
    }

    #[test]
    fn whitelist_strategy_relaunches_for_blocked_apps_only() {
        let (store, _clock, enforcer) = setup();
        let mut enforcer = enforcer.with_strategy(EnforcementStrategy::AppWhitelist);
        store.write_bool(StateKey::IsLocked, true).unwrap();
        store.set(StateKey::Whitelist, r#"["com.example.phone"]"#).unwrap();

        enforcer.device_mut().foreground = Some("com.example.phone".into());
        enforcer.tick();
        enforcer.device_mut().foreground = Some("com.parentcontrol".into());
        enforcer.tick();
        assert_eq!(enforcer.device().count(&DeviceCall::LaunchPrimary), 0);

        enforcer.device_mut().foreground = Some("com.example.game".into());
        let report = enforcer.tick();
        assert!(report
            .events
            .iter()
            .any(|e| matches!(e, Event::AppBlocked { app, .. } if app == "com.example.game")));
        assert_eq!(enforcer.device().count(&DeviceCall::LaunchPrimary), 1);
        assert_eq!(enforcer.device().lock_calls(), 0);
        assert!(!enforcer.device().blocker_visible);
        assert!(!store.read_bool(StateKey::HasLockedSession, false));
    }

    #[test]
    fn shutdown_releases_surfaces() {
        let (store, _clock, mut enforcer) = setup();
        store.write_bool(StateKey::IsLocked, true).unwrap();
        store.write_millis(StateKey::TimerEndTime, Some(NOW + 60_000)).unwrap();
        store.write_bool(StateKey::ShowFloatingTimer, true).unwrap();
        enforcer.tick();
        assert!(enforcer.device().blocker_visible);
        assert!(enforcer.device().floating.is_some());

        let events = enforcer.shutdown();
        assert_eq!(events.len(), 2);
        assert!(!enforcer.device().blocker_visible);
        assert!(enforcer.device().floating.is_none());
    }
}
