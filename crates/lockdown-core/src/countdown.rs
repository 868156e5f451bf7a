//! Foreground countdown view.
//!
//! The UI mirror of the timer. It decrements a cached deadline every second
//! and re-reads the store every reconcile period, except for a short window
//! after a local action, so a reconcile that raced the action's writes
//! cannot roll the display back.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::bridge::LockBridge;
use crate::enforcement::Clock;
use crate::error::Result;
use crate::events::Event;
use crate::storage::StateStore;

/// `M:SS`: minutes unpadded, seconds two digits.
pub fn format_mm_ss(total_secs: u64) -> String {
    format!("{}:{:02}", total_secs / 60, total_secs % 60)
}

/// What the view shows after a tick or reconcile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountdownFrame {
    pub locked: bool,
    pub remaining_secs: u64,
    pub text: String,
}

pub struct CountdownView<S, C> {
    bridge: LockBridge<S, C>,
    cached_end_ms: Option<u64>,
    locked: bool,
    remaining_secs: u64,
    suppress_until_ms: u64,
    suppress_window: Duration,
}

impl<S, C> CountdownView<S, C>
where
    S: StateStore + Clone,
    C: Clock,
{
    /// Builds the view and performs the initial reconcile.
    pub fn new(bridge: LockBridge<S, C>, suppress_window: Duration) -> Self {
        let mut view = Self {
            bridge,
            cached_end_ms: None,
            locked: false,
            remaining_secs: 0,
            suppress_until_ms: 0,
            suppress_window,
        };
        view.reconcile();
        view
    }

    pub fn bridge(&self) -> &LockBridge<S, C> {
        &self.bridge
    }

    pub fn cached_end_ms(&self) -> Option<u64> {
        self.cached_end_ms
    }

    pub fn frame(&self) -> CountdownFrame {
        CountdownFrame {
            locked: self.locked,
            remaining_secs: self.remaining_secs,
            text: format_mm_ss(self.remaining_secs),
        }
    }

    fn now_ms(&self) -> u64 {
        self.bridge.clock().now_ms()
    }

    fn is_suppressed(&self, now_ms: u64) -> bool {
        now_ms < self.suppress_until_ms
    }

    fn open_suppression(&mut self) {
        self.suppress_until_ms = self.now_ms() + self.suppress_window.as_millis() as u64;
    }

    /// One-second tick against the cached deadline.
    ///
    /// When the deadline passes, the view shows locked and persists the lock.
    pub fn tick(&mut self) -> Result<CountdownFrame> {
        let now = self.now_ms();
        match self.cached_end_ms {
            Some(end) if now >= end => {
                self.cached_end_ms = None;
                self.remaining_secs = 0;
                info!(deadline_ms = end, "countdown elapsed");
                let event = self.bridge.lock_now()?;
                self.locked = matches!(event, Event::LockRequested { .. });
            }
            Some(end) => {
                self.remaining_secs = (end - now) / 1000;
            }
            None => self.remaining_secs = 0,
        }
        Ok(self.frame())
    }

    /// Re-read the store. Returns `false` when skipped because of a recent
    /// local action.
    pub fn reconcile(&mut self) -> bool {
        let now = self.now_ms();
        if self.is_suppressed(now) {
            debug!("reconcile suppressed after local action");
            return false;
        }
        let end = self.bridge.timer_end_time();
        self.cached_end_ms = end;
        self.locked = self.bridge.effective_locked();
        self.remaining_secs = end
            .filter(|&end| end > now)
            .map(|end| (end - now) / 1000)
            .unwrap_or(0);
        true
    }

    pub fn start_timer(&mut self, minutes: u32) -> Result<Event> {
        let event = self.bridge.start_timer(minutes)?;
        self.open_suppression();
        if let Event::TimerStarted { end_ms, .. } = event {
            self.cached_end_ms = Some(end_ms);
        }
        self.remaining_secs = u64::from(minutes) * 60;
        self.locked = false;
        Ok(event)
    }

    pub fn unlock(&mut self) -> Result<Event> {
        self.open_suppression();
        let event = self.bridge.set_locked(false)?;
        self.cached_end_ms = None;
        self.remaining_secs = 0;
        self.locked = false;
        Ok(event)
    }

    pub fn lock(&mut self) -> Result<Event> {
        self.open_suppression();
        let event = self.bridge.lock_now()?;
        if matches!(event, Event::LockRequested { .. }) {
            self.cached_end_ms = None;
            self.remaining_secs = 0;
            self.locked = true;
        }
        Ok(event)
    }
}
