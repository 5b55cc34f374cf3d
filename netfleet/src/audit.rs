//! Per-device audit trail.
//!
//! Every run appends a session marker followed by one row per command to
//! `<output_folder>/<hostname>_commandStatus.txt`, so the file accumulates
//! the device's history across runs.

use std::path::{Path, PathBuf};

use chrono::Local;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use crate::classify::Classification;
use crate::error::AuditError;

/// Separator between read-only rows, whose outputs span many lines.
const ROW_SEPARATOR: &str = "==========================================";

/// Audit file for a hostname.
pub fn audit_path(output_folder: &Path, hostname: &str) -> PathBuf {
    output_folder.join(format!("{hostname}_commandStatus.txt"))
}

/// Timestamped line opening one run's rows.
pub fn session_marker() -> String {
    let now = Local::now().format("%d %b %y %H:%M %Z");
    format!("======================== \"{now}\" =======================\n")
}

/// Format the audit row of one command.
///
/// Configuration rows are one line. Read-only rows carry the full output
/// when accepted and only the error line when rejected.
pub fn format_row(
    hostname: &str,
    command: &str,
    output: &str,
    classification: &Classification,
    configure: bool,
) -> String {
    let accepted = classification.accepted;
    let error = classification.error_text();

    if configure {
        format!("device: {hostname:?}, command: {command:?}, accepted: {accepted}, error: {error:?}\n")
    } else if accepted {
        format!(
            "device: {hostname:?}, command: {command:?}, accepted: {accepted}, error: {error:?} output:\n{output}\n{ROW_SEPARATOR}\n"
        )
    } else {
        format!(
            "device: {hostname:?}, command: {command:?}, accepted: {accepted}, error: {error:?}\n{ROW_SEPARATOR}\n"
        )
    }
}

/// Buffered writer for one device's audit file.
///
/// The file is opened up front so an unusable path is reported before any
/// row is produced. Rows are held in memory and written with a single
/// write and flush in [`AuditWriter::finish`].
pub struct AuditWriter {
    path: PathBuf,
    file: tokio::fs::File,
    buffer: String,
}

impl AuditWriter {
    /// Open (or create) the audit file in append mode.
    pub async fn open(path: PathBuf) -> Result<Self, AuditError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|source| AuditError::Open {
                path: path.clone(),
                source,
            })?;

        Ok(Self {
            path,
            file,
            buffer: session_marker(),
        })
    }

    /// Queue a row.
    pub fn push(&mut self, row: &str) {
        self.buffer.push_str(row);
    }

    /// Write all queued rows and flush.
    pub async fn finish(self) -> Result<PathBuf, AuditError> {
        let Self {
            path,
            mut file,
            buffer,
        } = self;

        if let Err(source) = file.write_all(buffer.as_bytes()).await {
            return Err(AuditError::Write { path, source });
        }
        if let Err(source) = file.flush().await {
            return Err(AuditError::Write { path, source });
        }
        Ok(path)
    }
}
