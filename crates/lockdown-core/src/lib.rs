//! # Lockdown Core Library
//!
//! This library provides the enforcement logic for Lockdown, a parental
//! device lock. Every front-end (the `lockdown` CLI, a desktop or phone
//! shell) is a thin layer over the same core library and the same shared
//! state store.
//!
//! ## Architecture
//!
//! - **Storage**: A narrow key-value [`StateStore`] (SQLite or in-memory)
//!   shared by every component, plus TOML-based configuration
//! - **Bridge**: UI intents ("lock now", "start a 15 minute timer") become
//!   ordered store writes, with lock requests dropped during the grace window
//! - **Enforcement**: A wall-clock polling state machine. The caller invokes
//!   `tick()` about once a second; each tick converts an elapsed timer into a
//!   lock, then drives the blocker, the system lock and the floating countdown
//! - **Countdown**: The UI-side timer mirror with periodic reconciliation
//!
//! ## Key Components
//!
//! - [`Enforcer`]: Core enforcement state machine
//! - [`LockBridge`]: Store-backed façade for UI actions
//! - [`CountdownView`]: Foreground countdown
//! - [`EnforcementService`]: tokio runner for the enforcement loop
//! - [`Config`]: Application configuration management

pub mod bridge;
pub mod countdown;
pub mod enforcement;
pub mod error;
pub mod events;
pub mod pin;
pub mod service;
pub mod storage;

pub use bridge::{LockBridge, LockStatus};
pub use countdown::{format_mm_ss, CountdownFrame, CountdownView};
pub use enforcement::{
    BlockerState, Clock, Device, EnforcementAction, EnforcementStrategy, Enforcer, LockPhase,
    ManualClock, PinOutcome, SystemClock, TickReport, GRACE_PERIOD_MS,
};
pub use error::{ConfigError, CoreError, EffectError, StoreError, ValidationError};
pub use events::Event;
pub use pin::{PinVault, StorePinVault, RESCUE_PIN};
pub use service::{CountdownDriver, EnforcementService};
pub use storage::{
    Config, DisplaySettings, FloatingPosition, LockRecord, MemoryStore, SqliteStore, StateKey,
    StateStore, StateStoreExt,
};
