//! Command cache: one loaded copy of every command file the roster names.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use log::{debug, info};

use crate::error::CommandCacheError;
use crate::roster::Device;

/// Ordered commands of one command file. Blank lines are kept as entries.
pub type CommandSet = Arc<[String]>;

/// Mapping from command file name to its commands.
///
/// Built once before any worker starts and read-only afterwards, so workers
/// share it without locking.
#[derive(Debug, Default)]
pub struct CommandCache {
    sets: HashMap<String, CommandSet>,
}

impl CommandCache {
    /// Load every distinct command file referenced by `devices`.
    ///
    /// Each file is read exactly once. Any unreadable file fails the whole
    /// build.
    pub fn build(devices: &[Device], input_folder: &Path) -> Result<Self, CommandCacheError> {
        info!("Building cmd cache...");
        let mut cache = Self::default();

        for device in devices {
            if cache.sets.contains_key(&device.cmd_file) {
                continue;
            }
            let path = input_folder.join(&device.cmd_file);
            let text = std::fs::read_to_string(&path)
                .map_err(|source| CommandCacheError::Read { path, source })?;
            let commands = split_lines(&text);
            debug!("Loaded {} commands from {}", commands.len(), device.cmd_file);
            cache.sets.insert(device.cmd_file.clone(), commands);
        }

        info!("Building cmd cache done, {} command files", cache.sets.len());
        Ok(cache)
    }

    /// Commands for a file name.
    pub fn get(&self, cmd_file: &str) -> Option<&CommandSet> {
        self.sets.get(cmd_file)
    }

    /// Insert a command set directly.
    pub fn insert(&mut self, cmd_file: impl Into<String>, commands: Vec<String>) {
        self.sets.insert(cmd_file.into(), commands.into());
    }
}

/// Split file contents into lines the way a line scanner does: `\n`
/// separated, trailing `\r` dropped, no entry after a final newline.
fn split_lines(text: &str) -> CommandSet {
    text.lines().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use secrecy::SecretString;

    use super::*;
    use crate::platform::Platform;
    use crate::roster::DeviceState;

    fn device(hostname: &str, cmd_file: &str) -> Device {
        Device {
            hostname: hostname.to_string(),
            login: "admin".to_string(),
            password: SecretString::from("pw".to_string()),
            platform: Platform::Ios,
            configure: true,
            save_config: false,
            cmd_file: cmd_file.to_string(),
            state: DeviceState::Unknown,
        }
    }

    #[test]
    fn test_shared_file_loaded_once() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("a.txt"), "interface Gi1\nno shutdown\n").unwrap();
        fs::write(tmp.path().join("b.txt"), "show version\n").unwrap();

        let devices = vec![device("sw1", "a.txt"), device("sw2", "b.txt"), device("sw3", "a.txt")];
        let cache = CommandCache::build(&devices, tmp.path()).unwrap();

        assert_eq!(cache.sets.len(), 2);
        let a = cache.get("a.txt").unwrap();
        assert_eq!(&a[..], ["interface Gi1", "no shutdown"]);

        // Both devices referencing a.txt see the same allocation.
        let again = cache.get(&devices[2].cmd_file).unwrap();
        assert!(Arc::ptr_eq(a, again));
    }

    #[test]
    fn test_blank_lines_preserved() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("a.txt"), "conf t\r\n\r\nend\n").unwrap();

        let cache = CommandCache::build(&[device("sw1", "a.txt")], tmp.path()).unwrap();
        assert_eq!(&cache.get("a.txt").unwrap()[..], ["conf t", "", "end"]);
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("a.txt"), "show clock\n").unwrap();

        let devices = vec![device("sw1", "a.txt"), device("sw2", "missing.txt")];
        let err = CommandCache::build(&devices, tmp.path()).unwrap_err();
        let CommandCacheError::Read { path, .. } = err;
        assert!(path.ends_with("missing.txt"));
    }
}
