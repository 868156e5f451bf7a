use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "lockdown", version, about = "Lockdown parental lock CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lock the device now
    Lock,
    /// Unlock with the parental PIN
    Unlock {
        #[arg(long)]
        pin: String,
    },
    /// Print the current lock status as JSON
    Status,
    /// Auto-lock timer
    Timer {
        #[command(subcommand)]
        action: commands::timer::TimerAction,
    },
    /// Apps exempt from enforcement (app-whitelist strategy)
    Whitelist {
        #[command(subcommand)]
        action: commands::whitelist::WhitelistAction,
    },
    /// Parental PIN management
    Pin {
        #[command(subcommand)]
        action: commands::pin::PinAction,
    },
    /// Floating countdown and notification preferences
    Settings {
        #[command(subcommand)]
        action: commands::settings::SettingsAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Run a single enforcement tick against the console device
    Tick {
        /// Pretend this app is in the foreground
        #[arg(long)]
        foreground: Option<String>,
    },
    /// Long-running enforcement and countdown loops
    Service {
        #[command(subcommand)]
        action: commands::service::ServiceAction,
    },
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lockdown=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Lock => commands::lock::lock(),
        Commands::Unlock { pin } => commands::lock::unlock(&pin),
        Commands::Status => commands::lock::status(),
        Commands::Timer { action } => commands::timer::run(action),
        Commands::Whitelist { action } => commands::whitelist::run(action),
        Commands::Pin { action } => commands::pin::run(action),
        Commands::Settings { action } => commands::settings::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Tick { foreground } => commands::service::tick(foreground),
        Commands::Service { action } => commands::service::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
