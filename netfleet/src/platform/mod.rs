//! Platform definitions for multi-vendor support.
//!
//! The roster names a platform per device; this module maps that name to
//! the prompt pattern and mode commands the SSH gateway uses.

mod definition;
pub mod vendors;

pub use definition::PlatformDefinition;

use std::fmt;

use serde::Deserialize;

/// Device platforms known to the SSH gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[serde(alias = "iosxe", alias = "cisco_ios", alias = "cisco_iosxe")]
    Ios,
    #[serde(alias = "cisco_nxos")]
    Nxos,
    #[serde(alias = "arista_eos")]
    Eos,
    Linux,
}

impl Platform {
    /// Roster name of the platform.
    pub fn name(&self) -> &'static str {
        match self {
            Platform::Ios => "ios",
            Platform::Nxos => "nxos",
            Platform::Eos => "eos",
            Platform::Linux => "linux",
        }
    }

    /// Command persisting the running configuration, if the platform has one.
    pub fn save_command(&self) -> Option<&'static str> {
        match self {
            Platform::Ios => Some("write memory"),
            Platform::Nxos | Platform::Eos => Some("copy running-config startup-config"),
            Platform::Linux => None,
        }
    }

    /// Build the platform's definition.
    pub fn definition(&self) -> PlatformDefinition {
        match self {
            Platform::Ios => vendors::cisco_ios(),
            Platform::Nxos => vendors::cisco_nxos(),
            Platform::Eos => vendors::arista_eos(),
            Platform::Linux => vendors::linux(),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
