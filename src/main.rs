//! SplitX CLI
//!
//! Splits a video into consecutive fixed-length segments, re-encoding each one
//! with FFmpeg.
//!
//! # Usage
//!
//! ```bash
//! splitx split --input lecture.mp4 --minutes 10 --output-dir parts/
//! splitx plan --input lecture.mp4 --minutes 10
//! ```

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use splitx_cli::adapters::TomlConfigAdapter;
use splitx_cli::app::{AppContainer, DefaultAppContainer};
use splitx_cli::cli::{commands, Cli, CommandStatus, Commands};
use splitx_cli::utils::{init_logging, LogFormat, LoggingConfig};

/// Main entry point for the SplitX CLI application
#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let loaded = match TomlConfigAdapter::load(cli.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("error: {}", e);
            return Ok(ExitCode::from(CommandStatus::Rejected.exit_code()));
        }
    };
    let mut config = loaded.config.clone();
    cli.apply_overrides(&mut config);
    if let Err(e) = config.validate() {
        eprintln!("error: {}", e);
        return Ok(ExitCode::from(CommandStatus::Rejected.exit_code()));
    }

    init_logging(&LoggingConfig {
        level: config.log_level.clone(),
        format: if cli.json_logs {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        },
    })?;
    info!("Starting SplitX {}", env!("CARGO_PKG_VERSION"));
    loaded.log_sources();

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping");
            on_interrupt.cancel();
        }
    });

    let container = DefaultAppContainer::new(&config, cli.json_output(), &cancel)?;
    let interactor = container.split_interactor();

    let status = match &cli.command {
        Commands::Split(args) => {
            info!("Executing split command");
            commands::split(&interactor, args, &cancel).await?
        }
        Commands::Plan(args) => {
            info!("Executing plan command");
            tokio::select! {
                status = commands::plan(&interactor, args) => status?,
                _ = cancel.cancelled() => {
                    info!("Plan interrupted");
                    CommandStatus::Success
                }
            }
        }
    };

    info!("SplitX finished: {:?}", status);
    if cancel.is_cancelled() {
        // A terminal read left pending by the folder prompt would keep the runtime from shutting down
        std::process::exit(i32::from(status.exit_code()));
    }
    Ok(ExitCode::from(status.exit_code()))
}
