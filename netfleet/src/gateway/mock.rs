//! Scripted in-memory gateway for exercising workers without devices.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use tokio::sync::Barrier;
use tokio_util::sync::CancellationToken;

use super::{CommandResult, ConnectRequest, LegacySuite, Session, SessionGateway};
use crate::error::{BatchError, CommandError, ConnectError};

/// Scripted behavior of one host.
#[derive(Debug, Default)]
pub struct HostScript {
    /// Outcomes of successive connect attempts; success once exhausted.
    pub dials: VecDeque<Result<(), ConnectError>>,
    /// Output per command; commands not listed echo empty output.
    pub outputs: HashMap<String, String>,
    /// Commands that fail at the transport level when run alone.
    pub failing: Vec<String>,
    /// Make `run_batch` fail.
    pub batch_error: bool,
    /// Cancel the token once this many commands were answered (0: as soon
    /// as the session opens).
    pub cancel_after: Option<(usize, CancellationToken)>,
}

impl HostScript {
    pub fn dial(mut self, outcome: Result<(), ConnectError>) -> Self {
        self.dials.push_back(outcome);
        self
    }

    pub fn output(mut self, command: &str, output: &str) -> Self {
        self.outputs.insert(command.to_string(), output.to_string());
        self
    }

    pub fn failing(mut self, command: &str) -> Self {
        self.failing.push(command.to_string());
        self
    }

    pub fn batch_error(mut self) -> Self {
        self.batch_error = true;
        self
    }

    pub fn cancel_after(mut self, commands: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((commands, token));
        self
    }
}

/// What the gateway saw, for assertions.
#[derive(Debug, Default)]
pub struct Journal {
    /// (host, legacy suite offered) per connect call.
    pub connects: Vec<(String, Option<LegacySuite>)>,
    /// (host, command) per command run, batch commands included.
    pub commands: Vec<(String, String)>,
    /// Hosts whose session was closed.
    pub closed: Vec<String>,
}

#[derive(Debug, Default)]
struct Inner {
    hosts: HashMap<String, HostScript>,
    journal: Journal,
    /// Every connect waits here before answering.
    barrier: Option<Arc<Barrier>>,
}

impl Inner {
    /// Cancel the host's token if its command count reached the threshold.
    fn maybe_cancel(&self, host: &str) {
        let Some((after, token)) = self.hosts.get(host).and_then(|s| s.cancel_after.as_ref())
        else {
            return;
        };
        let answered = self.journal.commands.iter().filter(|(h, _)| h == host).count();
        if answered >= *after {
            token.cancel();
        }
    }
}

/// Gateway answering from per-host scripts.
#[derive(Debug, Clone, Default)]
pub struct MockGateway {
    inner: Arc<Mutex<Inner>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn host(self, host: &str, script: HostScript) -> Self {
        self.inner
            .lock()
            .unwrap()
            .hosts
            .insert(host.to_string(), script);
        self
    }

    /// Hold every connect until `barrier` releases.
    pub fn barrier(self, barrier: Arc<Barrier>) -> Self {
        self.inner.lock().unwrap().barrier = Some(barrier);
        self
    }

    /// Inspect the journal.
    pub fn journal<T>(&self, f: impl FnOnce(&Journal) -> T) -> T {
        f(&self.inner.lock().unwrap().journal)
    }
}

impl SessionGateway for MockGateway {
    type Session = MockSession;

    async fn connect(&self, request: &ConnectRequest) -> Result<MockSession, ConnectError> {
        let barrier = self.inner.lock().unwrap().barrier.clone();
        if let Some(barrier) = barrier {
            barrier.wait().await;
        }

        let mut inner = self.inner.lock().unwrap();
        inner
            .journal
            .connects
            .push((request.host.clone(), request.legacy.clone()));

        let outcome = inner
            .hosts
            .get_mut(&request.host)
            .and_then(|script| script.dials.pop_front())
            .unwrap_or(Ok(()));
        outcome?;
        inner.maybe_cancel(&request.host);

        Ok(MockSession {
            host: request.host.clone(),
            inner: self.inner.clone(),
        })
    }
}

/// Session answering from its host's script.
#[derive(Debug)]
pub struct MockSession {
    host: String,
    inner: Arc<Mutex<Inner>>,
}

impl MockSession {
    fn answer(&self, command: &str) -> (String, bool) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .journal
            .commands
            .push((self.host.clone(), command.to_string()));
        inner.maybe_cancel(&self.host);
        match inner.hosts.get(&self.host) {
            Some(script) => (
                script.outputs.get(command).cloned().unwrap_or_default(),
                script.failing.iter().any(|c| c == command),
            ),
            None => (String::new(), false),
        }
    }
}

impl Session for MockSession {
    async fn run(&mut self, command: &str) -> Result<String, CommandError> {
        let (output, failing) = self.answer(command);
        if failing {
            return Err(CommandError::Closed);
        }
        Ok(output)
    }

    async fn run_batch(&mut self, commands: &[String]) -> Result<Vec<CommandResult>, BatchError> {
        let batch_error = {
            let inner = self.inner.lock().unwrap();
            inner.hosts.get(&self.host).is_some_and(|s| s.batch_error)
        };
        if batch_error {
            return Err(BatchError::EnterConfig("% Authorization failed".to_string()));
        }

        Ok(commands
            .iter()
            .map(|command| CommandResult::new(command.as_str(), self.answer(command).0))
            .collect())
    }

    async fn close(self) {
        self.inner.lock().unwrap().journal.closed.push(self.host);
    }
}
