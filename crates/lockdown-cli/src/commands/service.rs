use std::sync::Arc;
use std::time::Duration;

use clap::Subcommand;
use lockdown_core::{
    Config, CountdownDriver, CountdownView, EnforcementService, Enforcer, LockBridge, SqliteStore,
    SystemClock,
};
use tracing::info;

use super::console::ConsoleDevice;
use super::{open_store, print_json, CliResult};

#[derive(Subcommand)]
pub enum ServiceAction {
    /// Run the enforcement loop until Ctrl-C, printing events as JSON lines
    Run {
        /// Pretend this app is in the foreground
        #[arg(long)]
        foreground: Option<String>,
    },
    /// Run the foreground countdown until Ctrl-C, printing each change
    Countdown,
}

type ConsoleEnforcer = Enforcer<Arc<SqliteStore>, SystemClock, ConsoleDevice>;

fn enforcer(
    config: &Config,
    foreground: Option<String>,
) -> Result<ConsoleEnforcer, Box<dyn std::error::Error>> {
    let enforcer = Enforcer::new(open_store()?, SystemClock, ConsoleDevice::new(foreground))
        .with_strategy(config.enforcement.strategy)
        .with_primary_app(config.enforcement.primary_app.clone());
    Ok(enforcer)
}

/// One tick, report printed as JSON.
pub fn tick(foreground: Option<String>) -> CliResult {
    let config = Config::load_or_default();
    let mut enforcer = enforcer(&config, foreground)?;
    print_json(&enforcer.tick())
}

pub fn run(action: ServiceAction) -> CliResult {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async move {
        match action {
            ServiceAction::Run { foreground } => run_enforcement(foreground).await,
            ServiceAction::Countdown => run_countdown().await,
        }
    })
}

async fn run_enforcement(foreground: Option<String>) -> CliResult {
    let config = Config::load_or_default();
    let service = EnforcementService::spawn(
        enforcer(&config, foreground)?,
        config.enforcement.tick_interval(),
    );
    let mut events = service.subscribe();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(event) => println!("{}", serde_json::to_string(&event)?),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event output fell behind");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    info!("shutting down");
    service.shutdown().await?;
    Ok(())
}

async fn run_countdown() -> CliResult {
    let config = Config::load_or_default();
    let bridge = LockBridge::new(open_store()?, SystemClock);
    let view = CountdownView::new(bridge, config.countdown.suppress_window());
    let driver = CountdownDriver::spawn(
        view,
        Duration::from_secs(1),
        config.countdown.reconcile_interval(),
    );
    let mut frames = driver.frames();
    print_json(&*frames.borrow())?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = frames.changed() => {
                if changed.is_err() {
                    break;
                }
                let frame = frames.borrow_and_update().clone();
                println!("{}", serde_json::to_string(&frame)?);
            }
        }
    }

    driver.shutdown().await?;
    Ok(())
}
