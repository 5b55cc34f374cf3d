//! Platform definition for vendor-specific session handling.

use regex::bytes::Regex;

/// Everything the SSH gateway needs to know to drive one kind of device.
#[derive(Debug, Clone)]
pub struct PlatformDefinition {
    /// Platform name as it appears in the roster (e.g., "ios", "eos").
    pub name: &'static str,

    /// Pattern matching any prompt of this platform (exec, enable or config).
    pub prompt: Regex,

    /// Commands run once after the shell comes up (paging off, width).
    pub on_open_commands: Vec<String>,

    /// Command entering configuration mode, if the platform has one.
    pub config_enter: Option<String>,

    /// Command leaving configuration mode.
    pub config_exit: Option<String>,

    /// Terminal width for PTY.
    pub terminal_width: u32,

    /// Terminal height for PTY.
    pub terminal_height: u32,
}

impl PlatformDefinition {
    /// Create a new platform definition with a prompt pattern.
    pub fn new(name: &'static str, prompt: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            name,
            prompt: Regex::new(prompt)?,
            on_open_commands: vec![],
            config_enter: None,
            config_exit: None,
            terminal_width: 511,
            terminal_height: 24,
        })
    }

    /// Add an on_open command.
    pub fn with_on_open_command(mut self, command: impl Into<String>) -> Self {
        self.on_open_commands.push(command.into());
        self
    }

    /// Set the commands used to enter and leave configuration mode.
    pub fn with_config_mode(mut self, enter: impl Into<String>, exit: impl Into<String>) -> Self {
        self.config_enter = Some(enter.into());
        self.config_exit = Some(exit.into());
        self
    }

    /// Set terminal dimensions.
    pub fn with_terminal_size(mut self, width: u32, height: u32) -> Self {
        self.terminal_width = width;
        self.terminal_height = height;
        self
    }
}
