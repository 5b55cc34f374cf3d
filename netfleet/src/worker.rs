//! Device worker: drives one device from connect to its audit file.
//!
//! ```text
//! Connecting ──► Executing ──► Classifying + Persisting ──► Done
//!     │  ▲           │
//!     ▼  │           └──► (batch refused: done, nothing persisted)
//! RetryingLegacy
//! ```
//!
//! A worker owns its [`Device`] record for the whole run and hands it back
//! in its [`WorkerReport`].

use std::path::PathBuf;
use std::sync::Arc;

use log::{error, info, warn};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::audit::{AuditWriter, audit_path, format_row};
use crate::classify::{ErrorMarkers, ScanScope, classify};
use crate::context::RunContext;
use crate::error::ConnectErrorKind;
use crate::gateway::{CommandResult, RetryAttempt, Session, SessionGateway};
use crate::roster::{Device, DeviceState};

/// Rows in flight between classification and persistence.
const ROW_CHANNEL_CAPACITY: usize = 64;

/// A command the device rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub hostname: String,
    pub command: String,
    /// First line carrying an error marker.
    pub error: String,
}

/// Outcome of one worker.
#[derive(Debug)]
pub struct WorkerReport {
    /// The device, with its final state.
    pub device: Device,
    /// Rejections, in command order.
    pub rejections: Vec<Rejection>,
    /// Audit file the rows were appended to, if persisted.
    pub audit_file: Option<PathBuf>,
}

/// Drives one device through a run.
pub struct Worker<G> {
    ctx: Arc<RunContext<G>>,
    device: Device,
    cancel: CancellationToken,
}

impl<G: SessionGateway> Worker<G> {
    pub fn new(ctx: Arc<RunContext<G>>, device: Device, cancel: CancellationToken) -> Self {
        Self {
            ctx,
            device,
            cancel,
        }
    }

    /// Run the device to completion. Never fails: every outcome ends up in
    /// the report's device state.
    pub async fn run(mut self) -> WorkerReport {
        let (rejections, audit_file) = match self.execute().await {
            Some(results) => self.process(results).await,
            None => (Vec::new(), None),
        };

        info!(
            "Device {} done: {}",
            self.device.hostname, self.device.state
        );

        WorkerReport {
            device: self.device,
            rejections,
            audit_file,
        }
    }

    /// Connect, run the device's commands and close the session.
    ///
    /// Returns `None` when the run ends before there is anything to persist.
    async fn execute(&mut self) -> Option<Vec<CommandResult>> {
        let Some(commands) = self.ctx.commands.get(&self.device.cmd_file).cloned() else {
            error!(
                "No commands loaded for {} ({})",
                self.device.hostname, self.device.cmd_file
            );
            return None;
        };

        let mut session = self.connect().await?;

        let results = if self.device.configure {
            self.configure(&mut session, &commands).await
        } else {
            Some(self.query(&mut session, &commands).await)
        };

        session.close().await;
        results
    }

    /// Open a session, retrying once with the legacy suite when the device
    /// cannot negotiate the standard algorithms.
    async fn connect(&mut self) -> Option<G::Session> {
        let hostname = self.device.hostname.clone();
        let mut attempt = RetryAttempt::First;

        loop {
            info!("Connecting to device {hostname}...");
            let request = self.ctx.connect_request(&self.device, attempt);

            let dial = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                dial = self.ctx.gateway.connect(&request) => Some(dial),
            };

            let err = match dial {
                Some(Ok(session)) => {
                    info!("Connected to device {hostname} successfully");
                    return Some(session);
                }
                Some(Err(err)) => err,
                None => {
                    warn!("Run cancelled while connecting to {hostname}");
                    self.device.state = DeviceState::Unreachable;
                    return None;
                }
            };

            match err.kind {
                ConnectErrorKind::NegotiationIncompatible => match attempt.next() {
                    Some(next) => {
                        warn!("Need to lower SSH algorithms for device {hostname}, retrying: {err}");
                        attempt = next;
                    }
                    None => {
                        warn!(
                            "Unable to connect to device {hostname} with legacy algorithms, \
                             change legacy_key_exchange/legacy_cipher in the config: {err}"
                        );
                        self.device.state = DeviceState::Unreachable;
                        return None;
                    }
                },
                ConnectErrorKind::AuthFailure => {
                    warn!("SSH authentication failure on device {hostname}: {err}");
                    self.device.state = DeviceState::AuthFailure;
                    return None;
                }
                ConnectErrorKind::Unreachable => {
                    warn!("Unable to connect to device {hostname}: {err}");
                    self.device.state = DeviceState::Unreachable;
                    return None;
                }
            }
        }
    }

    /// Send the command set as one configuration batch, then save if asked.
    async fn configure(
        &mut self,
        session: &mut G::Session,
        commands: &[String],
    ) -> Option<Vec<CommandResult>> {
        let hostname = &self.device.hostname;

        if self.cancel.is_cancelled() {
            warn!("Run cancelled before configuring {hostname}");
            self.device.state = DeviceState::PermissionProblem;
            return None;
        }

        let mut results = match session.run_batch(commands).await {
            Ok(results) => results,
            Err(err) => {
                error!("Unable to configure device {hostname}: {err}");
                self.device.state = DeviceState::PermissionProblem;
                return None;
            }
        };
        info!("Sent {} commands to device {hostname}", results.len());

        if self.device.save_config {
            self.save(session, &mut results).await;
        }
        Some(results)
    }

    /// Persist the running configuration. A transport failure leaves the
    /// configuration applied but unsaved, which counts as a rejection.
    async fn save(&mut self, session: &mut G::Session, results: &mut Vec<CommandResult>) {
        let hostname = &self.device.hostname;
        let Some(command) = self.device.platform.save_command() else {
            warn!(
                "Platform {} has no save command, skipping save on {hostname}",
                self.device.platform
            );
            return;
        };

        match session.run(command).await {
            Ok(output) => {
                info!("Saved configuration of device {hostname}");
                results.push(CommandResult::new(command, output));
            }
            Err(err) => {
                error!("Unable to save configuration of device {hostname}: {err}");
                self.device.state = DeviceState::PartiallyAccepted;
            }
        }
    }

    /// Run each command on its own. A failed command is logged and skipped.
    async fn query(&mut self, session: &mut G::Session, commands: &[String]) -> Vec<CommandResult> {
        let hostname = &self.device.hostname;
        let mut results = Vec::with_capacity(commands.len());

        for (index, command) in commands.iter().enumerate() {
            let output = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                output = session.run(command) => Some(output),
            };

            match output {
                Some(Ok(output)) => results.push(CommandResult::new(command.as_str(), output)),
                Some(Err(err)) => {
                    error!("Unable to run command {command:?} on device {hostname}: {err}");
                    self.device.state = DeviceState::Unknown;
                }
                None => {
                    warn!(
                        "Run cancelled, skipping {} remaining commands on {hostname}",
                        commands.len() - index
                    );
                    self.device.state = DeviceState::Unknown;
                    break;
                }
            }
        }

        results
    }

    /// Classify the results and append them to the audit file.
    ///
    /// Classification and persistence run concurrently, linked by a row
    /// channel. Both finish before this returns.
    async fn process(&mut self, results: Vec<CommandResult>) -> (Vec<Rejection>, Option<PathBuf>) {
        let (rows_tx, rows_rx) = mpsc::channel(ROW_CHANNEL_CAPACITY);
        let path = audit_path(&self.ctx.output_folder, &self.device.hostname);

        let classified = classify_results(
            &self.device.hostname,
            self.device.configure,
            &results,
            &self.ctx.markers,
            &mut self.device.state,
            rows_tx,
        );
        let persisted = persist_rows(&self.device.hostname, path, rows_rx);

        tokio::join!(classified, persisted)
    }
}

/// Fold every result into the device state, log rejections and send the
/// formatted rows to the persistence side in command order.
async fn classify_results(
    hostname: &str,
    configure: bool,
    results: &[CommandResult],
    markers: &ErrorMarkers,
    state: &mut DeviceState,
    rows: mpsc::Sender<String>,
) -> Vec<Rejection> {
    let scope = ScanScope::for_mode(configure);
    let mut rejections = Vec::new();

    for result in results {
        let classification = classify(&result.output, scope, markers);
        state.record(classification.accepted);

        if let Some(error) = &classification.error {
            warn!(
                "Got error, device: {hostname:?}, command: {:?}, error: {error:?}",
                result.command
            );
            rejections.push(Rejection {
                hostname: hostname.to_string(),
                command: result.command.clone(),
                error: error.clone(),
            });
        }

        let row = format_row(
            hostname,
            &result.command,
            &result.output,
            &classification,
            configure,
        );
        // A closed receiver means the audit file is unusable; classification
        // still has to finish.
        let _ = rows.send(row).await;
    }

    rejections
}

/// Drain rows into the device's audit file. Failures are logged and the
/// rows dropped.
async fn persist_rows(
    hostname: &str,
    path: PathBuf,
    mut rows: mpsc::Receiver<String>,
) -> Option<PathBuf> {
    info!("Storing device {hostname} data to file...");

    let mut writer = match AuditWriter::open(path).await {
        Ok(writer) => writer,
        Err(err) => {
            error!("{err}; output of device {hostname} not stored");
            return None;
        }
    };

    while let Some(row) = rows.recv().await {
        writer.push(&row);
    }

    match writer.finish().await {
        Ok(path) => {
            info!("Stored device {hostname} data to {}", path.display());
            Some(path)
        }
        Err(err) => {
            error!("{err}; output of device {hostname} not stored");
            None
        }
    }
}
