mod bridge;
mod queue_commands;
mod routes_commands;

use std::path::PathBuf;

use {
    chatbridge_config::BridgeConfig,
    clap::{Parser, Subcommand},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "chatbridge", about = "Chatbridge: relay chats between Discord and WhatsApp Web")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file (defaults to ./chatbridge.toml, then the user config dir).
    #[arg(long, global = true, env = "CHATBRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bridge (default when no subcommand is provided).
    Run,
    /// Inspect and edit the route tables in the broker.
    Routes {
        #[command(subcommand)]
        action: routes_commands::RoutesAction,
    },
    /// Inspect the relay queues.
    Queue {
        #[command(subcommand)]
        action: queue_commands::QueueAction,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Load the explicit `--config` file, or discover one.
fn load_config(cli: &Cli) -> anyhow::Result<BridgeConfig> {
    match &cli.config {
        Some(path) => {
            let mut config = chatbridge_config::load_config(path)?;
            chatbridge_config::apply_env_overrides(&mut config);
            Ok(config)
        },
        None => Ok(chatbridge_config::discover_and_load()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "chatbridge starting");

    let config = load_config(&cli)?;

    match cli.command {
        // Default: run the bridge when no subcommand is provided
        None | Some(Commands::Run) => bridge::run(config).await,
        Some(Commands::Routes { action }) => routes_commands::handle_routes(action, &config).await,
        Some(Commands::Queue { action }) => queue_commands::handle_queue(action, &config).await,
    }
}
