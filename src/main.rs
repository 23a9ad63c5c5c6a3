//! Command-line entry point.
//!
//! ```text
//! twitch-chatbot [--config bot.json] [--debug]
//! ```
//!
//! Without `--config`, settings come from defaults plus the `TWITCH_NICKNAME`,
//! `TWITCH_OAUTH_TOKEN` and `TWITCH_CHANNEL` environment variables.

// ============================================================================
// Imports
// ============================================================================

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use twitch_chatbot::{BotBuilder, BotConfig};

// ============================================================================
// Types
// ============================================================================

/// Persistent Twitch chat bot.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// JSON configuration file.
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(long)]
    debug: bool,
}

// ============================================================================
// Functions
// ============================================================================

/// Initialize tracing/logging. `RUST_LOG` wins when set.
fn init_logging(debug: bool) {
    let default = if debug {
        "twitch_chatbot=debug"
    } else {
        "twitch_chatbot=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Cancels `shutdown` on the first Ctrl+C.
fn spawn_interrupt_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Interrupt received, shutting down"),
            Err(e) => warn!(error = %e, "Cannot listen for Ctrl+C"),
        }
        shutdown.cancel();
    });
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.debug);

    let config = match &args.config {
        Some(path) => BotConfig::from_file(path),
        None => BotConfig::from_env(),
    };

    let supervisor = match config.and_then(|config| BotBuilder::from_config(config).build()) {
        Ok(supervisor) => supervisor,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    info!(
        server = %supervisor.config().server,
        channel = %supervisor.config().channel,
        nickname = %supervisor.config().nickname,
        "Starting bot"
    );

    let shutdown = CancellationToken::new();
    spawn_interrupt_handler(shutdown.clone());

    supervisor.run(shutdown).await;
    ExitCode::SUCCESS
}
