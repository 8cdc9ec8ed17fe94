//! Hunter Daemon
//!
//! Runs AI Image Hunter sessions. `serve` accepts surfaces over a Unix
//! socket, one game session per connection. `play` runs a single session
//! in the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Serve on the default socket ($XDG_RUNTIME_DIR/ai-image-hunter/hunter.sock)
//! hunter-daemon serve
//!
//! # Play in the terminal against a local backend
//! hunter-daemon --backend-url http://localhost:8000 --model openai play
//!
//! # With verbose logging
//! RUST_LOG=debug hunter-daemon serve
//! ```
//!
//! # Environment Variables
//!
//! - `HUNTER_CONFIG`: Config file path
//! - `HUNTER_BACKEND_URL`, `HUNTER_DEFAULT_MODEL`, `HUNTER_SOCKET`, ...:
//!   see `hunter_core::config`
//! - `UNSPLASH_ACCESS_KEY`: Image source credentials
//! - `RUST_LOG`: Log level (trace, debug, info, warn, error)
//!
//! # Signals
//!
//! - SIGTERM/SIGINT: Graceful shutdown (removes the socket)

mod play;
mod server;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::signal;
use tokio::sync::Notify;
use tracing::{error, info};

use hunter_core::{load_config_from_path, ConfigOverrides, HunterConfig, ModelChoice};

use crate::server::{DaemonServer, ServerConfig};

#[derive(Debug, Parser)]
#[command(name = "hunter-daemon", version, about = "Spot-the-AI-image game daemon")]
struct Cli {
    /// Config file (default: $XDG_CONFIG_HOME/ai-image-hunter/hunter.toml)
    #[arg(long, env = "HUNTER_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Game backend base URL
    #[arg(long, global = true)]
    backend_url: Option<String>,

    /// Model used for prompt derivation (ollama, openai, gemini)
    #[arg(long, global = true)]
    model: Option<ModelChoice>,

    /// Rounds per session
    #[arg(long, global = true)]
    rounds: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Accept surfaces on a Unix socket
    Serve {
        /// Socket path (default: $XDG_RUNTIME_DIR/ai-image-hunter/hunter.sock)
        #[arg(long)]
        socket: Option<PathBuf>,
    },
    /// Play one session on stdin/stdout
    Play,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides::new();
        if let Some(url) = &self.backend_url {
            overrides = overrides.with_backend_url(url.clone());
        }
        if let Some(model) = self.model {
            overrides = overrides.with_default_model(model);
        }
        if let Some(rounds) = self.rounds {
            overrides = overrides.with_round_limit(rounds);
        }
        if let Command::Serve {
            socket: Some(path),
        } = &self.command
        {
            overrides = overrides.with_socket_path(path.clone());
        }
        overrides
    }

    fn load(&self) -> anyhow::Result<HunterConfig> {
        let mut config =
            load_config_from_path(self.config.clone()).context("Failed to load configuration")?;
        self.overrides()
            .apply(&mut config)
            .context("Invalid command line options")?;
        Ok(config)
    }
}

/// Resolve when Ctrl+C or SIGTERM arrives
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C"),
        () = terminate => info!("Received SIGTERM"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so `play` keeps stdout for the game
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("hunter_daemon=info".parse()?)
                .add_directive("hunter_core=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    let config = cli.load()?;
    info!(
        source = %config.source(),
        backend = %config.backend_url,
        model = %config.default_model,
        round_limit = config.round_limit,
        "Configuration loaded"
    );

    match cli.command {
        Command::Serve { .. } => {
            let shutdown = Arc::new(Notify::new());
            let trigger = Arc::clone(&shutdown);
            tokio::spawn(async move {
                shutdown_signal().await;
                trigger.notify_one();
            });

            let mut server = DaemonServer::new(config, ServerConfig::default());
            server.run(shutdown).await
        }
        Command::Play => play::run(config).await,
    }
}
