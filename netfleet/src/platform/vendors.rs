//! Built-in platform definitions.
//!
//! Prompt patterns are adapted from [scrapli](https://github.com/carlmontanari/scrapli).
//! A single pattern per platform covers every mode, since the gateway only
//! needs to know when the device is done talking, not which mode it is in.
//!
//! ```text
//! router>                  # exec
//! router#                  # privileged exec
//! router(config)#          # configuration
//! router(config-if)#       # configuration sub-mode
//! ```

use super::PlatformDefinition;

/// Cisco IOS / IOS-XE.
pub fn cisco_ios() -> PlatformDefinition {
    PlatformDefinition::new("ios", r"(?m)^[\w.\-@/:]{1,63}(\(conf[\w.\-@/:+]{0,63}\))?[>#]\s?$")
        .unwrap()
        .with_on_open_command("terminal length 0")
        .with_on_open_command("terminal width 511")
        .with_config_mode("configure terminal", "end")
}

/// Cisco NX-OS.
pub fn cisco_nxos() -> PlatformDefinition {
    PlatformDefinition::new(
        "nxos",
        r"(?m)^[\w.\-@/:]{1,63}(\(conf[\w.\-@/:+]{0,63}\))?[>#]\s?$",
    )
    .unwrap()
    .with_on_open_command("terminal length 0")
    .with_on_open_command("terminal width 511")
    .with_config_mode("configure terminal", "end")
}

/// Arista EOS.
pub fn arista_eos() -> PlatformDefinition {
    PlatformDefinition::new(
        "eos",
        r"(?m)^[\w.\-@()/: ]{1,63}(\(config[\w.\-@/:+]{0,63}\))?[>#]\s?$",
    )
    .unwrap()
    .with_on_open_command("terminal length 0")
    .with_on_open_command("terminal width 32767")
    .with_config_mode("configure terminal", "end")
    .with_terminal_size(32767, 24)
}

/// Linux / Unix shells. No configuration mode.
pub fn linux() -> PlatformDefinition {
    PlatformDefinition::new("linux", r"[$#]\s*$").unwrap()
}
