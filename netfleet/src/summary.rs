//! Fleet summary: one table row per device, appended to the results file.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

use chrono::Local;
use log::{error, info};
use tabled::{Table, Tabled, settings::Style};

use crate::roster::DeviceState;
use crate::worker::WorkerReport;

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Device")]
    device: String,
    #[tabled(rename = "Platform")]
    platform: String,
    #[tabled(rename = "Configure")]
    configure: bool,
    #[tabled(rename = "Command Run Status")]
    status: String,
}

impl From<&WorkerReport> for SummaryRow {
    fn from(report: &WorkerReport) -> Self {
        Self {
            device: report.device.hostname.clone(),
            platform: report.device.platform.to_string(),
            configure: report.device.configure,
            status: report.device.state.to_string(),
        }
    }
}

/// Render the summary table followed by a timestamp line.
pub fn render(reports: &[WorkerReport]) -> String {
    let rows: Vec<SummaryRow> = reports.iter().map(SummaryRow::from).collect();
    let table = Table::new(rows).with(Style::ascii()).to_string();
    let now = Local::now().format("%d %b %y %H:%M %Z");
    format!("{table}\nRun finished: {now}\n\n")
}

/// Append a rendered summary to the results file.
pub fn append(path: &Path, summary: &str) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(summary.as_bytes())?;
    file.flush()
}

/// Render, store and print the summary. A results file that cannot be
/// written is logged; the table still goes to stdout.
pub fn publish(reports: &[WorkerReport], results_path: &Path) {
    let succeeded = reports
        .iter()
        .filter(|r| r.device.state == DeviceState::Success)
        .count();
    info!(
        "{succeeded} of {} devices succeeded, {} rejected commands",
        reports.len(),
        reports.iter().map(|r| r.rejections.len()).sum::<usize>()
    );

    let summary = render(reports);
    match append(results_path, &summary) {
        Ok(()) => info!("Summary written to {}", results_path.display()),
        Err(err) => error!(
            "Unable to write summary to {}: {err}",
            results_path.display()
        ),
    }
    print!("{summary}");
}
