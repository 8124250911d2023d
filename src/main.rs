//! Ingress Controller
//!
//! Keeps a reverse proxy's configuration in step with a set of declarative
//! routing objects, and keeps the proxy process itself alive.
//!
//! # Architecture Overview
//!
//! ```text
//!   ┌──────────────┐  list / watch   ┌──────────────────────────────────────────┐
//!   │ routing      │────────────────▶│              RECONCILE LOOP              │
//!   │ objects      │  notifications  │                                          │
//!   │ (manifest)   │                 │  ┌─────────┐   ┌──────────┐   ┌────────┐ │
//!   └──────────────┘                 │  │ routing │──▶│  render  │──▶│ config │ │
//!                                    │  │ builder │   │ template │   │  file  │ │
//!                                    │  └─────────┘   └──────────┘   └───┬────┘ │
//!                                    │                                   │      │
//!                                    │                 changed? ─────────┘      │
//!                                    │                    │                     │
//!                                    │                    ▼                     │
//!                                    │          ┌───────────────────┐           │
//!                                    │          │ process supervisor│──────────┼──▶ proxy
//!                                    │          │ launch / reload   │  signals  │    process
//!                                    │          └───────────────────┘           │
//!                                    │                                          │
//!                                    │  ┌────────────────────────────────────┐  │
//!                                    │  │ reaper (PID 1 only): SIGCHLD →     │  │
//!                                    │  │ waitpid until nothing is pending   │  │
//!                                    │  └────────────────────────────────────┘  │
//!                                    └──────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use ingress_controller::config::{load_config, ControllerConfig};
use ingress_controller::lifecycle::startup;
use ingress_controller::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "ingress-controller")]
#[command(version, about = "Mirror routing objects into a supervised reverse proxy", long_about = None)]
struct Cli {
    /// Controller configuration file (TOML). Built-in defaults when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Run the reconcile loop (default)
    Run,
    /// Print the proxy config for the current manifest and exit
    Render,
    /// Validate configuration and manifest, then exit
    Check,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("ingress-controller: {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => ControllerConfig::default(),
    };

    if let Err(e) = init_logging(&config.observability) {
        eprintln!("ingress-controller: failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    match run(cli.command.unwrap_or(Commands::Run), config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Controller exiting with error");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands, config: ControllerConfig) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Run => {
            tracing::info!("ingress-controller v{} starting", env!("CARGO_PKG_VERSION"));
            startup::run(config).await?;
            tracing::info!("Shutdown complete");
        }
        Commands::Render => {
            let rendered = startup::render_once(&config).await?;
            print!("{}", rendered);
        }
        Commands::Check => {
            let rendered = startup::render_once(&config).await?;
            println!(
                "configuration OK: {} bytes rendered from {}",
                rendered.len(),
                config.source.manifest_path.display()
            );
        }
    }
    Ok(())
}
