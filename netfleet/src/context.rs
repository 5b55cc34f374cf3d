//! Run-scoped state shared by every worker.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use crate::classify::ErrorMarkers;
use crate::commands::CommandCache;
use crate::config::AppConfig;
use crate::gateway::{ConnectRequest, LegacySuite, RetryAttempt};
use crate::roster::Device;

/// SSH port dialed on every device.
pub const SSH_PORT: u16 = 22;

/// Everything workers read during a run. Built once before any worker
/// starts and shared behind an `Arc`; never mutated afterwards.
#[derive(Debug)]
pub struct RunContext<G> {
    pub gateway: G,
    pub commands: CommandCache,
    pub markers: ErrorMarkers,
    /// Bound on establishing a session.
    pub dial_timeout: Duration,
    /// Bound on waiting for the prompt after each command.
    pub command_timeout: Duration,
    /// Suite offered on the legacy retry.
    pub legacy: LegacySuite,
    /// Folder receiving the per-device audit files.
    pub output_folder: PathBuf,
    pub port: u16,
}

impl<G> RunContext<G> {
    /// Build the context from the loaded configuration.
    pub fn new(gateway: G, commands: CommandCache, config: &AppConfig) -> Self {
        let markers = config
            .classifier
            .extra_markers
            .iter()
            .fold(ErrorMarkers::default(), |markers, marker| {
                markers.with_marker(marker.as_str())
            });

        Self {
            gateway,
            commands,
            markers,
            dial_timeout: config.client.dial_timeout(),
            command_timeout: config.client.command_timeout(),
            legacy: LegacySuite {
                key_exchange: config.client.legacy_key_exchange.clone(),
                cipher: config.client.legacy_cipher.clone(),
            },
            output_folder: config.data.output_folder.clone(),
            port: SSH_PORT,
        }
    }

    /// Connect request for a device. The legacy suite is only offered on
    /// [`RetryAttempt::LegacyRetry`].
    pub fn connect_request(&self, device: &Device, attempt: RetryAttempt) -> ConnectRequest {
        ConnectRequest {
            host: device.hostname.clone(),
            port: self.port,
            username: device.login.clone(),
            password: SecretString::from(device.password.expose_secret().to_string()),
            platform: device.platform,
            dial_timeout: self.dial_timeout,
            command_timeout: self.command_timeout,
            legacy: match attempt {
                RetryAttempt::First => None,
                RetryAttempt::LegacyRetry => Some(self.legacy.clone()),
            },
        }
    }
}
