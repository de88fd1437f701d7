mod bot_commands;
mod check_commands;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "accord", about = "accord: Discord bots from data modules", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (overrides discovery of accord.{toml,yaml,yml,json}).
    #[arg(long, global = true, env = "ACCORD_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run from the module tree on disk, syncing commands per dev guild.
    Dev {
        /// Module directory (overrides `modules.source_dir`).
        #[arg(long)]
        source: Option<PathBuf>,
    },
    /// Run in production: embedded modules, global command sync.
    Start {
        /// Load modules from this directory instead of the embedded set.
        #[arg(long)]
        source: Option<PathBuf>,
    },
    /// Load and validate modules without connecting.
    Check {
        #[arg(long)]
        source: Option<PathBuf>,
    },
    /// Sync slash commands without connecting to the gateway.
    Deploy {
        #[arg(long)]
        source: Option<PathBuf>,
        /// Register globally even when dev mode is configured.
        #[arg(long, default_value_t = false)]
        global: bool,
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

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "accord starting");

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Dev { ref source } => {
            bot_commands::run(bot_commands::Mode::Dev, config_path, source.as_deref()).await
        },
        Commands::Start { ref source } => {
            bot_commands::run(bot_commands::Mode::Production, config_path, source.as_deref()).await
        },
        Commands::Check { ref source } => check_commands::check(config_path, source.as_deref()).await,
        Commands::Deploy { ref source, global } => {
            bot_commands::deploy(config_path, source.as_deref(), global).await
        },
    }
}
