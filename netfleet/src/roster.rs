//! Device roster: the CSV file listing every device of a run.
//!
//! ```text
//! hostname,login,password,platform,configure,cmdFile,saveConfig
//! core-sw1,admin,secret,ios,true,vlans.txt,true
//! edge-rtr2,admin,secret,nxos,false,show.txt,
//! ```

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use log::info;
use secrecy::SecretString;
use serde::Deserialize;

use crate::error::RosterError;
use crate::platform::Platform;

/// Terminal status of one device after a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceState {
    /// Nothing conclusive happened (initial value, or a read-only command failed).
    #[default]
    Unknown,

    /// The device could not be reached, or negotiation failed twice.
    Unreachable,

    /// The device rejected the credentials.
    AuthFailure,

    /// The configuration batch was refused, or the run was cancelled before it.
    PermissionProblem,

    /// At least one command was rejected. Sticky for the rest of the run.
    PartiallyAccepted,

    /// Every classified command was accepted.
    Success,
}

impl DeviceState {
    /// Record one classified command. A rejection is sticky: once
    /// [`DeviceState::PartiallyAccepted`] is set, acceptances never clear it.
    pub fn record(&mut self, accepted: bool) {
        if !accepted {
            *self = DeviceState::PartiallyAccepted;
        } else if *self != DeviceState::PartiallyAccepted {
            *self = DeviceState::Success;
        }
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DeviceState::Unknown => "Unknown",
            DeviceState::Unreachable => "Unreachable",
            DeviceState::AuthFailure => "SSH authentication failure",
            DeviceState::PermissionProblem => "Permission problem/Canceled",
            DeviceState::PartiallyAccepted => "Commands accepted with errors",
            DeviceState::Success => "Success",
        };
        f.write_str(label)
    }
}

/// One device of the roster.
#[derive(Debug)]
pub struct Device {
    pub hostname: String,
    pub login: String,
    pub password: SecretString,
    pub platform: Platform,
    /// Configuration mode (one atomic batch) rather than read-only queries.
    pub configure: bool,
    /// Persist the running configuration after a successful batch.
    pub save_config: bool,
    /// Command file name, relative to the input folder.
    pub cmd_file: String,
    pub state: DeviceState,
}

impl Device {
    /// Copy of the record with an empty password and a [`DeviceState::Unknown`]
    /// state, standing in for a device whose worker was lost.
    pub fn without_secret(&self) -> Device {
        Device {
            hostname: self.hostname.clone(),
            login: self.login.clone(),
            password: SecretString::from(String::new()),
            platform: self.platform,
            configure: self.configure,
            save_config: self.save_config,
            cmd_file: self.cmd_file.clone(),
            state: DeviceState::Unknown,
        }
    }
}

/// Raw CSV row. The password is moved into a [`SecretString`] straight away.
#[derive(Deserialize)]
struct RosterRow {
    hostname: String,
    login: String,
    password: String,
    #[serde(alias = "osType")]
    platform: Platform,
    configure: bool,
    #[serde(rename = "cmdFile", alias = "CmdFile")]
    cmd_file: String,
    #[serde(rename = "saveConfig", default, deserialize_with = "csv::invalid_option")]
    save_config: Option<bool>,
}

impl From<RosterRow> for Device {
    fn from(row: RosterRow) -> Self {
        Self {
            hostname: row.hostname,
            login: row.login,
            password: SecretString::from(row.password),
            platform: row.platform,
            configure: row.configure,
            save_config: row.save_config.unwrap_or(false),
            cmd_file: row.cmd_file,
            state: DeviceState::Unknown,
        }
    }
}

/// Load the roster from a CSV file.
pub fn load(path: &Path) -> Result<Vec<Device>, RosterError> {
    info!("Decoding devices data from {}...", path.display());
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| RosterError::Open {
            path: path.to_path_buf(),
            source,
        })?;
    let devices = parse(reader)?;
    info!("Decoding devices data done, {} devices", devices.len());
    Ok(devices)
}

/// Decode roster rows from any CSV reader.
pub fn parse<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Vec<Device>, RosterError> {
    let mut devices = Vec::new();
    let mut seen = HashSet::new();

    for row in reader.deserialize::<RosterRow>() {
        let row = row.map_err(|source| RosterError::Row {
            line: source.position().map(|p| p.line()).unwrap_or_default(),
            source,
        })?;
        if !seen.insert(row.hostname.clone()) {
            return Err(RosterError::DuplicateHost {
                hostname: row.hostname,
            });
        }
        devices.push(Device::from(row));
    }

    Ok(devices)
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    fn parse_str(data: &str) -> Result<Vec<Device>, RosterError> {
        parse(
            csv::ReaderBuilder::new()
                .trim(csv::Trim::All)
                .from_reader(data.as_bytes()),
        )
    }

    #[test]
    fn test_parse_roster() {
        let devices = parse_str(
            "hostname,login,password,platform,configure,cmdFile\n\
             sw1,admin,s3cret,ios,true,vlans.txt\n\
             sw2,ops,pw,nxos,false,show.txt\n",
        )
        .unwrap();

        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].hostname, "sw1");
        assert_eq!(devices[0].password.expose_secret(), "s3cret");
        assert_eq!(devices[0].platform, Platform::Ios);
        assert!(devices[0].configure);
        assert!(!devices[0].save_config);
        assert_eq!(devices[1].cmd_file, "show.txt");
        assert!(devices.iter().all(|d| d.state == DeviceState::Unknown));
    }

    #[test]
    fn test_parse_legacy_columns() {
        let devices = parse_str(
            "hostname,login,password,osType,configure,CmdFile,saveConfig\n\
             sw1,admin,pw,cisco_ios,true,a.txt,true\n\
             sw2,admin,pw,eos,true,a.txt,\n",
        )
        .unwrap();

        assert_eq!(devices[0].platform, Platform::Ios);
        assert!(devices[0].save_config);
        assert!(!devices[1].save_config);
    }

    #[test]
    fn test_unknown_platform_is_fatal() {
        let err = parse_str(
            "hostname,login,password,platform,configure,cmdFile\n\
             sw1,admin,pw,os2,true,a.txt\n",
        )
        .unwrap_err();
        assert!(matches!(err, RosterError::Row { .. }));
    }

    #[test]
    fn test_duplicate_hostname() {
        let err = parse_str(
            "hostname,login,password,platform,configure,cmdFile\n\
             sw1,admin,pw,ios,true,a.txt\n\
             sw1,admin,pw,ios,false,b.txt\n",
        )
        .unwrap_err();
        assert!(matches!(err, RosterError::DuplicateHost { .. }));
    }

    #[test]
    fn test_password_not_in_debug() {
        let devices = parse_str(
            "hostname,login,password,platform,configure,cmdFile\n\
             sw1,admin,hunter2,ios,true,a.txt\n",
        )
        .unwrap();
        assert!(!format!("{:?}", devices[0]).contains("hunter2"));
    }

    #[test]
    fn test_state_record_is_sticky() {
        let mut state = DeviceState::Unknown;
        state.record(true);
        assert_eq!(state, DeviceState::Success);
        state.record(false);
        assert_eq!(state, DeviceState::PartiallyAccepted);
        state.record(true);
        state.record(true);
        assert_eq!(state, DeviceState::PartiallyAccepted);
    }

    #[test]
    fn test_state_labels() {
        assert_eq!(DeviceState::Success.to_string(), "Success");
        assert_eq!(
            DeviceState::PartiallyAccepted.to_string(),
            "Commands accepted with errors"
        );
        assert_eq!(DeviceState::AuthFailure.to_string(), "SSH authentication failure");
    }
}
