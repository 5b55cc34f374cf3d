//! Output classifier: decides from free-text output whether a device
//! accepted a command.
//!
//! Devices report a rejected command with a banner line such as
//! `% Invalid input detected at '^' marker.` or `Command rejected: ...`.
//! The classifier looks for the first line starting with one of a list of
//! known markers.

/// Number of leading lines scanned for read-only commands. Query commands
/// print their error banner at the head of the output, and the rest can be
/// very large.
pub const READ_ONLY_SCAN_LINES: usize = 3;

/// Ordered list of line prefixes that mark a rejected command.
#[derive(Debug, Clone)]
pub struct ErrorMarkers {
    prefixes: Vec<String>,
}

impl ErrorMarkers {
    /// Markers from an explicit list.
    pub fn new(prefixes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    /// Add a marker after the existing ones.
    pub fn with_marker(mut self, prefix: impl Into<String>) -> Self {
        self.prefixes.push(prefix.into());
        self
    }

    /// Check if the line starts with any marker.
    pub fn matches(&self, line: &str) -> bool {
        self.prefixes.iter().any(|p| line.starts_with(p.as_str()))
    }
}

impl Default for ErrorMarkers {
    fn default() -> Self {
        Self::new(["%", "Command rejected:"])
    }
}

/// How much of an output is scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanScope {
    /// Every line (configuration mode).
    Full,
    /// Only the first lines (read-only mode).
    Head(usize),
}

impl ScanScope {
    /// Scope used for a device's execution mode.
    pub fn for_mode(configure: bool) -> Self {
        if configure {
            ScanScope::Full
        } else {
            ScanScope::Head(READ_ONLY_SCAN_LINES)
        }
    }
}

/// Judgment on one command result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub accepted: bool,
    /// The error line that caused the rejection.
    pub error: Option<String>,
}

impl Classification {
    /// Extracted error text, empty when accepted.
    pub fn error_text(&self) -> &str {
        self.error.as_deref().unwrap_or_default()
    }
}

/// Classify one command output.
pub fn classify(output: &str, scope: ScanScope, markers: &ErrorMarkers) -> Classification {
    let limit = match scope {
        ScanScope::Full => usize::MAX,
        ScanScope::Head(n) => n,
    };

    let error = output
        .split('\n')
        .take(limit)
        .find(|line| markers.matches(line))
        .map(|line| line.trim_end_matches('\r').to_string());

    Classification {
        accepted: error.is_none(),
        error,
    }
}
