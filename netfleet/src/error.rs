//! Error types for netfleet.
//!
//! Startup errors (configuration, roster, command files) abort the run and
//! surface through [`Error`]. Everything that can go wrong while a worker
//! drives a single device is expressed by the per-layer types below and is
//! handled inside that worker.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Main error type for startup-fatal failures.
#[derive(Error, Debug)]
pub enum Error {
    /// Application configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Device roster errors
    #[error("Roster error: {0}")]
    Roster(#[from] RosterError),

    /// Command file errors
    #[error("Command cache error: {0}")]
    Commands(#[from] CommandCacheError),
}

/// Configuration file errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read
    #[error("Cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The config file is not valid YAML for the expected layout
    #[error("Cannot parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The output directory could not be created
    #[error("Cannot create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The log file could not be opened
    #[error("Cannot open log file {path}: {source}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Device roster errors.
#[derive(Error, Debug)]
pub enum RosterError {
    /// The roster file could not be opened
    #[error("Cannot open roster {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A row could not be decoded
    #[error("Malformed roster row {line}: {source}")]
    Row {
        line: u64,
        #[source]
        source: csv::Error,
    },

    /// The same hostname appears twice
    #[error("Duplicate hostname '{hostname}' in roster")]
    DuplicateHost { hostname: String },
}

/// Command file loading errors.
#[derive(Error, Debug)]
pub enum CommandCacheError {
    /// A referenced command file could not be read
    #[error("Unable to read commands file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Classes of dial failure a session gateway can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectErrorKind {
    /// Host could not be reached, timed out, or the protocol failed.
    Unreachable,

    /// The device refused the credentials.
    AuthFailure,

    /// No key exchange or cipher algorithm in common with the device.
    NegotiationIncompatible,
}

/// Failure to establish a session.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct ConnectError {
    pub kind: ConnectErrorKind,
    pub message: String,
}

impl ConnectError {
    pub fn new(kind: ConnectErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::new(ConnectErrorKind::Unreachable, message)
    }

    pub fn auth_failure(message: impl Into<String>) -> Self {
        Self::new(ConnectErrorKind::AuthFailure, message)
    }

    pub fn negotiation(message: impl Into<String>) -> Self {
        Self::new(ConnectErrorKind::NegotiationIncompatible, message)
    }
}

/// A configuration batch was rejected as a whole.
#[derive(Error, Debug)]
pub enum BatchError {
    /// The device did not enter configuration mode
    #[error("Unable to enter configuration mode: {0}")]
    EnterConfig(String),

    /// A command of the batch failed at the transport level
    #[error("Command '{command}' failed: {message}")]
    Command { command: String, message: String },
}

/// A single command failed at the transport level.
#[derive(Error, Debug)]
pub enum CommandError {
    /// Prompt not seen before the deadline
    #[error("Prompt not found within {0:?}")]
    Timeout(std::time::Duration),

    /// Channel closed by the device
    #[error("Channel closed")]
    Closed,

    /// SSH protocol error on the channel
    #[error("Channel SSH error: {0}")]
    Ssh(#[from] russh::Error),
}

/// Per-device audit file errors.
#[derive(Error, Debug)]
pub enum AuditError {
    /// Audit file could not be opened
    #[error("Unable to open output file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Audit rows could not be written or flushed
    #[error("Unable to write output file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Result type alias using netfleet's Error.
pub type Result<T> = std::result::Result<T, Error>;
