//! # Netfleet
//!
//! Bulk CLI command runner for fleets of network devices.
//!
//! Netfleet reads a device roster, connects to every device concurrently
//! over SSH, runs each device's command file either as one configuration
//! batch or as individual read-only queries, decides from the output whether
//! the device accepted each command, and leaves behind a per-device audit
//! trail plus a fleet-wide summary table.
//!
//! ## Flow
//!
//! ```text
//! config.yml ──► roster (CSV) ──► command cache
//!                                     │
//!                    ┌────────────────┼────────────────┐
//!                    ▼                ▼                ▼
//!                 worker           worker           worker      (one task per device)
//!                    │ connect / execute / classify + persist
//!                    ▼
//!            <host>_commandStatus.txt              summary table
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use netfleet::{AppConfig, CommandCache, RunContext, SshGateway, run_fleet};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), netfleet::Error> {
//!     let config = AppConfig::load(Path::new("./config/config.yml"))?;
//!     config.prepare_output_dir()?;
//!
//!     let devices = netfleet::roster::load(&config.data.roster_path())?;
//!     let commands = CommandCache::build(&devices, &config.data.input_folder)?;
//!     let ctx = Arc::new(RunContext::new(SshGateway::new(), commands, &config));
//!
//!     let reports = run_fleet(ctx, devices, CancellationToken::new()).await;
//!     netfleet::summary::publish(&reports, &config.data.results_path());
//!     Ok(())
//! }
//! ```

pub mod audit;
pub mod classify;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod fleet;
pub mod gateway;
pub mod platform;
pub mod roster;
pub mod summary;
pub mod worker;

// Re-export main types for convenience
pub use classify::{Classification, ErrorMarkers, ScanScope, classify};
pub use commands::{CommandCache, CommandSet};
pub use config::AppConfig;
pub use context::RunContext;
pub use error::{Error, Result};
pub use fleet::run_fleet;
pub use gateway::{Session, SessionGateway, SshGateway};
pub use platform::Platform;
pub use roster::{Device, DeviceState};
pub use worker::{Rejection, Worker, WorkerReport};
