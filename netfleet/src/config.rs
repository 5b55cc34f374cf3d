//! Application configuration, loaded from a YAML file.
//!
//! ```yaml
//! client:
//!   ssh_timeout: 10
//!   command_timeout: 30
//!   legacy_key_exchange: diffie-hellman-group1-sha1
//!   legacy_cipher: aes128-cbc
//! data:
//!   input_folder: ./input
//!   devices_data: devices.csv
//!   output_folder: ./output
//!   results_data: results.txt
//! logger:
//!   level: info
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use log::info;
use serde::Deserialize;

use crate::error::ConfigError;

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "./config/config.yml";

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub client: ClientConfig,
    pub data: DataConfig,
    #[serde(default)]
    pub logger: LoggerConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
}

/// Session settings shared by every device.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Dial timeout, in seconds.
    #[serde(default = "default_ssh_timeout")]
    pub ssh_timeout: u64,

    /// How long a command may stay silent before its prompt shows up, in
    /// seconds.
    #[serde(default = "default_command_timeout")]
    pub command_timeout: u64,

    /// Key exchange offered on the second attempt to a legacy device.
    pub legacy_key_exchange: String,

    /// Cipher offered on the second attempt to a legacy device.
    #[serde(alias = "legacy_algorithm")]
    pub legacy_cipher: String,
}

impl ClientConfig {
    pub fn dial_timeout(&self) -> Duration {
        Duration::from_secs(self.ssh_timeout)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout)
    }
}

fn default_ssh_timeout() -> u64 {
    10
}

fn default_command_timeout() -> u64 {
    30
}

/// Input and output locations.
#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    /// Folder holding the roster and the command files.
    pub input_folder: PathBuf,

    /// Roster file name inside `input_folder`.
    pub devices_data: String,

    /// Folder receiving per-device audit files and the summary.
    pub output_folder: PathBuf,

    /// Summary file name inside `output_folder`.
    pub results_data: String,
}

impl DataConfig {
    pub fn roster_path(&self) -> PathBuf {
        self.input_folder.join(&self.devices_data)
    }

    pub fn results_path(&self) -> PathBuf {
        self.output_folder.join(&self.results_data)
    }
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggerConfig {
    /// Default filter when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file; stderr when absent.
    #[serde(default)]
    pub output_path: Option<PathBuf>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            output_path: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Output classifier settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClassifierConfig {
    /// Error line prefixes recognized in addition to the built-in ones.
    #[serde(default)]
    pub extra_markers: Vec<String>,
}

impl AppConfig {
    /// Read and parse the configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse configuration from YAML text.
    pub fn parse(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    /// Create the output folder if it does not exist yet.
    pub fn prepare_output_dir(&self) -> Result<(), ConfigError> {
        let dir = &self.data.output_folder;
        if dir.is_dir() {
            info!("Output directory {} already there", dir.display());
            return Ok(());
        }
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::OutputDir {
            path: dir.clone(),
            source,
        })?;
        info!("Created output directory {}", dir.display());
        Ok(())
    }
}
