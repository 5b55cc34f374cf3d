//! Session gateway: the capability workers use to talk to devices.
//!
//! Workers only see the [`SessionGateway`] and [`Session`] traits. The
//! production implementation is [`SshGateway`]; tests drive workers with a
//! scripted gateway instead.

mod buffer;
#[cfg(test)]
pub(crate) mod mock;
mod ssh;

pub use ssh::{SshGateway, SshSession};

use std::future::Future;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::{BatchError, CommandError, ConnectError};
use crate::platform::Platform;

/// Which connection attempt this is for a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAttempt {
    /// Standard negotiation parameters.
    First,
    /// Second and last attempt, offering the legacy algorithm suite.
    LegacyRetry,
}

impl RetryAttempt {
    /// The attempt following a negotiation failure, if any is left.
    pub fn next(self) -> Option<Self> {
        match self {
            RetryAttempt::First => Some(RetryAttempt::LegacyRetry),
            RetryAttempt::LegacyRetry => None,
        }
    }
}

/// Key exchange and cipher offered to devices that only speak old algorithms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacySuite {
    pub key_exchange: String,
    pub cipher: String,
}

/// Everything needed to open a session to one device.
#[derive(Debug)]
pub struct ConnectRequest {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    pub platform: Platform,
    /// Bound on dialing, key exchange and authentication.
    pub dial_timeout: Duration,
    /// Bound on waiting for the prompt after each command.
    pub command_timeout: Duration,
    /// Set on the legacy retry only.
    pub legacy: Option<LegacySuite>,
}

/// A command paired with the raw text the device returned for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub command: String,
    pub output: String,
}

impl CommandResult {
    pub fn new(command: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            output: output.into(),
        }
    }
}

/// Dials devices.
pub trait SessionGateway: Send + Sync + 'static {
    type Session: Session;

    /// Establish an authenticated session.
    fn connect(
        &self,
        request: &ConnectRequest,
    ) -> impl Future<Output = Result<Self::Session, ConnectError>> + Send;
}

/// An open session to one device.
pub trait Session: Send {
    /// Run one command and return its raw output.
    fn run(&mut self, command: &str) -> impl Future<Output = Result<String, CommandError>> + Send;

    /// Run all commands in configuration mode. Any failure fails the batch.
    fn run_batch(
        &mut self,
        commands: &[String],
    ) -> impl Future<Output = Result<Vec<CommandResult>, BatchError>> + Send;

    /// Close the session.
    fn close(self) -> impl Future<Output = ()> + Send;
}
