//! netfleet command line entry point.
//!
//! ```bash
//! netfleet --config ./config/config.yml
//! RUST_LOG=debug netfleet
//! ```

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use log::{error, info, warn};
use tokio_util::sync::CancellationToken;

use netfleet::config::{DEFAULT_CONFIG_PATH, LoggerConfig};
use netfleet::error::ConfigError;
use netfleet::{AppConfig, CommandCache, RunContext, SshGateway, roster, run_fleet, summary};

#[derive(Parser, Debug)]
#[command(name = "netfleet", version, about = "Run CLI commands across a fleet of network devices")]
struct Args {
    /// Configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log filter, overrides RUST_LOG and the configured level
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let started = Instant::now();

    let config = match AppConfig::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(&config.logger, args.log_level.as_deref()) {
        eprintln!("Error: {e}");
        return ExitCode::FAILURE;
    }

    match run(config).await {
        Ok(()) => {
            info!("Finished! Time taken: {:?}", started.elapsed());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: AppConfig) -> netfleet::Result<()> {
    config.prepare_output_dir()?;

    let devices = roster::load(&config.data.roster_path())?;
    let commands = CommandCache::build(&devices, &config.data.input_folder)?;
    let ctx = Arc::new(RunContext::new(SshGateway::new(), commands, &config));

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        await_shutdown_signal().await;
        on_signal.cancel();
    });

    let reports = run_fleet(ctx, devices, cancel).await;
    summary::publish(&reports, &config.data.results_path());
    Ok(())
}

/// Set up `env_logger`. The filter is the command line level, else
/// `RUST_LOG`, else the configured level.
fn init_logging(config: &LoggerConfig, level: Option<&str>) -> Result<(), ConfigError> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.level));
    if let Some(level) = level {
        builder.parse_filters(level);
    }

    if let Some(path) = &config.output_path {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| ConfigError::LogFile {
                path: path.clone(),
                source,
            })?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    if let Err(e) = builder.try_init() {
        eprintln!("Logger already initialized: {e}");
    }
    Ok(())
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                warn!("Unable to listen for SIGTERM: {e}");
                return wait_ctrl_c().await;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => {
                warn!("SIGTERM received, cancelling run...");
            }
            _ = wait_ctrl_c() => {}
        }
    }

    #[cfg(not(unix))]
    wait_ctrl_c().await;
}

async fn wait_ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => warn!("Ctrl+C received, cancelling run..."),
        Err(e) => {
            warn!("Unable to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    }
}
