//! Fleet runner: one task per device, joined in roster order.

use std::sync::Arc;

use log::{error, info};
use tokio_util::sync::CancellationToken;

use crate::context::RunContext;
use crate::gateway::SessionGateway;
use crate::roster::Device;
use crate::worker::{Worker, WorkerReport};

/// Run every device concurrently and collect their reports.
///
/// All workers are spawned before any is awaited. Reports come back in
/// roster order; a worker that panics is reported with an unknown state.
pub async fn run_fleet<G: SessionGateway>(
    ctx: Arc<RunContext<G>>,
    devices: Vec<Device>,
    cancel: CancellationToken,
) -> Vec<WorkerReport> {
    info!("Starting workers for {} devices", devices.len());

    let handles: Vec<_> = devices
        .into_iter()
        .map(|device| {
            let fallback = device.without_secret();
            let worker = Worker::new(Arc::clone(&ctx), device, cancel.child_token());
            (fallback, tokio::spawn(worker.run()))
        })
        .collect();

    let mut reports = Vec::with_capacity(handles.len());
    for (fallback, handle) in handles {
        let report = match handle.await {
            Ok(report) => report,
            Err(err) => {
                error!("Worker for device {} failed: {err}", fallback.hostname);
                WorkerReport {
                    device: fallback,
                    rejections: Vec::new(),
                    audit_file: None,
                }
            }
        };
        reports.push(report);
    }

    info!("All workers finished");
    reports
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use secrecy::SecretString;
    use tempfile::TempDir;
    use tokio::sync::Barrier;

    use super::*;
    use crate::classify::ErrorMarkers;
    use crate::commands::CommandCache;
    use crate::error::ConnectError;
    use crate::gateway::LegacySuite;
    use crate::gateway::mock::{HostScript, MockGateway};
    use crate::platform::Platform;
    use crate::roster::DeviceState;

    fn device(hostname: &str) -> Device {
        Device {
            hostname: hostname.to_string(),
            login: "admin".to_string(),
            password: SecretString::from("secret".to_string()),
            platform: Platform::Eos,
            configure: true,
            save_config: false,
            cmd_file: "vlans.txt".to_string(),
            state: DeviceState::Unknown,
        }
    }

    fn context(gateway: MockGateway, output: &TempDir) -> Arc<RunContext<MockGateway>> {
        let mut commands = CommandCache::default();
        commands.insert("vlans.txt", vec!["vlan 10".to_string(), "name users".to_string()]);

        Arc::new(RunContext {
            gateway,
            commands,
            markers: ErrorMarkers::default(),
            dial_timeout: Duration::from_secs(1),
            command_timeout: Duration::from_secs(1),
            legacy: LegacySuite {
                key_exchange: "diffie-hellman-group14-sha1".to_string(),
                cipher: "aes256-cbc".to_string(),
            },
            output_folder: output.path().to_path_buf(),
            port: 22,
        })
    }

    #[tokio::test]
    async fn test_reports_in_roster_order() {
        let output = TempDir::new().unwrap();
        let gateway = MockGateway::new()
            .host(
                "sw2",
                HostScript::default().dial(Err(ConnectError::unreachable("timed out"))),
            )
            .host("sw3", HostScript::default().output("vlan 10", "% Invalid input"));

        let ctx = context(gateway.clone(), &output);

        let devices = vec![device("sw1"), device("sw2"), device("sw3")];
        let reports = run_fleet(ctx, devices, CancellationToken::new()).await;

        let outcome: Vec<_> = reports
            .iter()
            .map(|r| (r.device.hostname.as_str(), r.device.state))
            .collect();
        assert_eq!(
            outcome,
            vec![
                ("sw1", DeviceState::Success),
                ("sw2", DeviceState::Unreachable),
                ("sw3", DeviceState::PartiallyAccepted),
            ]
        );
        assert_eq!(gateway.journal(|journal| journal.closed.len()), 2);
    }

    #[tokio::test]
    async fn test_workers_run_concurrently() {
        let output = TempDir::new().unwrap();
        let hosts = ["sw1", "sw2", "sw3", "sw4"];
        // Every connect waits until all devices are dialing at once.
        let gateway = MockGateway::new().barrier(Arc::new(Barrier::new(hosts.len())));
        let ctx = context(gateway.clone(), &output);

        let devices = hosts.iter().map(|host| device(host)).collect();
        let reports = tokio::time::timeout(
            Duration::from_secs(5),
            run_fleet(ctx, devices, CancellationToken::new()),
        )
        .await
        .expect("workers were not all running at the same time");

        assert_eq!(reports.len(), hosts.len());
        assert!(reports.iter().all(|r| r.device.state == DeviceState::Success));
        assert_eq!(gateway.journal(|journal| journal.connects.len()), hosts.len());
    }
}
