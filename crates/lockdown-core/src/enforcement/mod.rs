//! Lock enforcement.
//!
//! `decision` holds the pure rules, `engine` applies them once per tick
//! against a [`Device`], and `blocker`/`floating` track what is on screen.

pub mod blocker;
pub mod clock;
pub mod decision;
pub mod effects;
pub mod engine;
pub mod floating;
pub mod grace;

pub use blocker::{BlockerOverlay, BlockerState, PinOutcome, INCORRECT_PIN_MESSAGE};
pub use clock::{to_datetime, Clock, ManualClock, SystemClock};
pub use decision::{decide, expire_timer, should_lock, Decision, EnforcementAction, LockPhase};
pub use effects::{
    AppRelauncher, Device, DeviceCall, ForegroundApps, Overlay, RecordingDevice, SystemLock,
};
pub use engine::{EnforcementStrategy, Enforcer, TickReport};
pub use floating::{format_hms, FloatingCountdown};
pub use grace::{grace_active, grant_unlock, in_grace, GRACE_PERIOD_MS};
