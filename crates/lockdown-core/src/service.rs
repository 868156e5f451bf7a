//! Async runners for the enforcement loop and the countdown view.
//!
//! Both own their state machine inside a spawned task, drive it from
//! `tokio::time::interval`, accept input over an `mpsc` channel and stop on
//! a `watch` shutdown signal. Stopping hands the state machine back to the
//! caller.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::countdown::{CountdownFrame, CountdownView};
use crate::enforcement::{Clock, Device, Enforcer, PinOutcome};
use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::storage::StateStore;

const EVENT_CAPACITY: usize = 64;
const COMMAND_CAPACITY: usize = 16;

/// Input from the blocker surface.
enum BlockerCommand {
    OpenPinEntry,
    CancelPinEntry,
    Dismiss,
    SubmitPin {
        pin: String,
        reply: oneshot::Sender<PinOutcome>,
    },
}

/// Handle to a running enforcement loop.
pub struct EnforcementService<S, C, D> {
    commands: mpsc::Sender<BlockerCommand>,
    events: broadcast::Sender<Event>,
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<Enforcer<S, C, D>>,
}

impl<S, C, D> EnforcementService<S, C, D>
where
    S: StateStore + Clone + 'static,
    C: Clock + 'static,
    D: Device + Send + 'static,
{
    /// Start ticking `enforcer` every `period`. The first tick runs
    /// immediately.
    pub fn spawn(mut enforcer: Enforcer<S, C, D>, period: Duration) -> Self {
        let (commands, mut command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let publisher = events.clone();

        let join = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(period_ms = period.as_millis() as u64, strategy = ?enforcer.strategy(), "enforcement started");

            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    Some(command) = command_rx.recv() => {
                        handle_blocker_command(&mut enforcer, command, &publisher);
                    }
                    _ = ticker.tick() => {
                        match catch_unwind(AssertUnwindSafe(|| enforcer.tick())) {
                            Ok(report) => publish(&publisher, report.events),
                            Err(_) => error!("enforcement tick panicked, continuing"),
                        }
                    }
                }
            }

            publish(&publisher, enforcer.shutdown());
            enforcer
        });

        Self {
            commands,
            events,
            shutdown_tx,
            join,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub async fn open_pin_entry(&self) -> Result<()> {
        self.send(BlockerCommand::OpenPinEntry).await
    }

    pub async fn cancel_pin_entry(&self) -> Result<()> {
        self.send(BlockerCommand::CancelPinEntry).await
    }

    pub async fn dismiss(&self) -> Result<()> {
        self.send(BlockerCommand::Dismiss).await
    }

    pub async fn submit_pin(&self, pin: &str) -> Result<PinOutcome> {
        let (reply, rx) = oneshot::channel();
        self.send(BlockerCommand::SubmitPin {
            pin: pin.to_string(),
            reply,
        })
        .await?;
        rx.await
            .map_err(|_| CoreError::Custom("enforcement loop stopped".into()))
    }

    async fn send(&self, command: BlockerCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| CoreError::Custom("enforcement loop stopped".into()))
    }

    /// Stop ticking, release overlays and return the engine.
    pub async fn shutdown(self) -> Result<Enforcer<S, C, D>> {
        let _ = self.shutdown_tx.send(true);
        self.join
            .await
            .map_err(|e| CoreError::Custom(format!("enforcement task failed: {e}")))
    }
}

fn handle_blocker_command<S, C, D>(
    enforcer: &mut Enforcer<S, C, D>,
    command: BlockerCommand,
    publisher: &broadcast::Sender<Event>,
) where
    S: StateStore + Clone,
    C: Clock,
    D: Device,
{
    match command {
        BlockerCommand::OpenPinEntry => {
            enforcer.blocker_open_pin_entry();
        }
        BlockerCommand::CancelPinEntry => {
            enforcer.blocker_cancel_pin_entry();
        }
        BlockerCommand::Dismiss => {
            enforcer.blocker_dismiss();
        }
        BlockerCommand::SubmitPin { pin, reply } => {
            let (outcome, events) = enforcer.blocker_submit_pin(&pin);
            publish(publisher, events);
            if reply.send(outcome).is_err() {
                debug!("pin submitter went away");
            }
        }
    }
}

fn publish(publisher: &broadcast::Sender<Event>, events: Vec<Event>) {
    for event in events {
        // No subscribers is fine.
        let _ = publisher.send(event);
    }
}

// ── Countdown ────────────────────────────────────────────────────────

enum CountdownCommand {
    StartTimer {
        minutes: u32,
        reply: oneshot::Sender<Result<Event>>,
    },
    Lock {
        reply: oneshot::Sender<Result<Event>>,
    },
    Unlock {
        reply: oneshot::Sender<Result<Event>>,
    },
}

/// Handle to a running countdown view.
pub struct CountdownDriver<S, C> {
    commands: mpsc::Sender<CountdownCommand>,
    frames: watch::Receiver<CountdownFrame>,
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<CountdownView<S, C>>,
}

impl<S, C> CountdownDriver<S, C>
where
    S: StateStore + Clone + 'static,
    C: Clock + 'static,
{
    pub fn spawn(
        mut view: CountdownView<S, C>,
        tick_period: Duration,
        reconcile_period: Duration,
    ) -> Self {
        let (commands, mut command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let (frame_tx, frames) = watch::channel(view.frame());
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let join = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(tick_period);
            let mut reconciler = tokio::time::interval(reconcile_period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            reconciler.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    Some(command) = command_rx.recv() => {
                        let (result, reply) = match command {
                            CountdownCommand::StartTimer { minutes, reply } => (view.start_timer(minutes), reply),
                            CountdownCommand::Lock { reply } => (view.lock(), reply),
                            CountdownCommand::Unlock { reply } => (view.unlock(), reply),
                        };
                        let _ = reply.send(result);
                    }
                    _ = ticker.tick() => {
                        if let Err(e) = view.tick() {
                            warn!(error = %e, "countdown could not persist lock");
                        }
                    }
                    _ = reconciler.tick() => {
                        view.reconcile();
                    }
                }
                frame_tx.send_if_modified(|current| {
                    let next = view.frame();
                    if *current == next {
                        false
                    } else {
                        *current = next;
                        true
                    }
                });
            }
            view
        });

        Self {
            commands,
            frames,
            shutdown_tx,
            join,
        }
    }

    /// Latest frame; `changed()` on the receiver wakes on every update.
    pub fn frames(&self) -> watch::Receiver<CountdownFrame> {
        self.frames.clone()
    }

    pub async fn start_timer(&self, minutes: u32) -> Result<Event> {
        let (reply, rx) = oneshot::channel();
        self.request(CountdownCommand::StartTimer { minutes, reply }, rx)
            .await
    }

    pub async fn lock(&self) -> Result<Event> {
        let (reply, rx) = oneshot::channel();
        self.request(CountdownCommand::Lock { reply }, rx).await
    }

    pub async fn unlock(&self) -> Result<Event> {
        let (reply, rx) = oneshot::channel();
        self.request(CountdownCommand::Unlock { reply }, rx).await
    }

    async fn request(
        &self,
        command: CountdownCommand,
        rx: oneshot::Receiver<Result<Event>>,
    ) -> Result<Event> {
        let stopped = || CoreError::Custom("countdown stopped".into());
        self.commands.send(command).await.map_err(|_| stopped())?;
        rx.await.map_err(|_| stopped())?
    }

    pub async fn shutdown(self) -> Result<CountdownView<S, C>> {
        let _ = self.shutdown_tx.send(true);
        self.join
            .await
            .map_err(|e| CoreError::Custom(format!("countdown task failed: {e}")))
    }
}
