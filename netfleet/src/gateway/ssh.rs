//! SSH session gateway using russh.
//!
//! Opens a PTY shell, disables paging, and drives commands by reading until
//! the platform prompt shows up again.

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use russh::client::{self, Handle, Msg};
use russh::keys::PublicKey;
use russh::{Channel, ChannelMsg, Preferred, cipher, kex};
use secrecy::ExposeSecret;

use super::buffer::PatternBuffer;
use super::{CommandResult, ConnectRequest, LegacySuite, Session, SessionGateway};
use crate::error::{BatchError, CommandError, ConnectError};
use crate::platform::PlatformDefinition;

/// Gateway dialing devices over SSH with password authentication.
#[derive(Debug, Clone)]
pub struct SshGateway {
    /// Bytes from the end of the output searched for the prompt.
    search_depth: usize,
}

impl SshGateway {
    pub fn new() -> Self {
        Self { search_depth: 1000 }
    }
}

impl Default for SshGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionGateway for SshGateway {
    type Session = SshSession;

    async fn connect(&self, request: &ConnectRequest) -> Result<SshSession, ConnectError> {
        let ssh_config = Arc::new(client::Config {
            preferred: preferred_algorithms(request.legacy.as_ref())?,
            ..Default::default()
        });

        let handler = SshHandler {
            host: request.host.clone(),
        };

        let mut handle = tokio::time::timeout(
            request.dial_timeout,
            client::connect(ssh_config, (request.host.as_str(), request.port), handler),
        )
        .await
        .map_err(|_| {
            ConnectError::unreachable(format!(
                "connection to {}:{} timed out after {:?}",
                request.host, request.port, request.dial_timeout
            ))
        })?
        .map_err(dial_error)?;

        let authenticated = tokio::time::timeout(
            request.dial_timeout,
            handle.authenticate_password(&request.username, request.password.expose_secret()),
        )
        .await
        .map_err(|_| {
            ConnectError::unreachable(format!(
                "authentication on {} timed out after {:?}",
                request.host, request.dial_timeout
            ))
        })?
        .map_err(dial_error)?
        .success();
        if !authenticated {
            return Err(ConnectError::auth_failure(format!(
                "unable to authenticate user '{}'",
                request.username
            )));
        }

        let platform = request.platform.definition();
        let channel = open_shell(&handle, &platform)
            .await
            .map_err(|e| ConnectError::unreachable(format!("unable to open shell: {e}")))?;

        let mut session = SshSession {
            handle,
            channel,
            platform,
            buffer: PatternBuffer::new(self.search_depth),
            timeout: request.command_timeout,
        };
        session
            .open()
            .await
            .map_err(|e| ConnectError::unreachable(format!("no prompt after login: {e}")))?;

        Ok(session)
    }
}

/// Default algorithm preferences, with the legacy suite in front when given.
fn preferred_algorithms(legacy: Option<&LegacySuite>) -> Result<Preferred, ConnectError> {
    let mut preferred = Preferred::default();
    let Some(suite) = legacy else {
        return Ok(preferred);
    };

    let kex_name = kex::Name::try_from(suite.key_exchange.as_str()).map_err(|_| {
        ConnectError::negotiation(format!(
            "unsupported legacy key exchange '{}'",
            suite.key_exchange
        ))
    })?;
    let cipher_name = cipher::Name::try_from(suite.cipher.as_str()).map_err(|_| {
        ConnectError::negotiation(format!("unsupported legacy cipher '{}'", suite.cipher))
    })?;

    let mut kexes = vec![kex_name];
    kexes.extend(preferred.kex.iter().copied().filter(|k| *k != kex_name));
    preferred.kex = Cow::Owned(kexes);

    let mut ciphers = vec![cipher_name];
    ciphers.extend(preferred.cipher.iter().copied().filter(|c| *c != cipher_name));
    preferred.cipher = Cow::Owned(ciphers);

    Ok(preferred)
}

/// Map a russh dial error onto a connect error class.
fn dial_error(err: russh::Error) -> ConnectError {
    let message = err.to_string();
    match err {
        russh::Error::NoCommonAlgo { .. } => ConnectError::negotiation(message),
        // Negotiation failures surfaced through another variant still name it.
        _ if message.to_lowercase().contains("no common") => ConnectError::negotiation(message),
        _ => ConnectError::unreachable(message),
    }
}

/// Open a PTY channel and request a shell.
async fn open_shell(
    handle: &Handle<SshHandler>,
    platform: &PlatformDefinition,
) -> Result<Channel<Msg>, russh::Error> {
    let channel = handle.channel_open_session().await?;
    channel
        .request_pty(
            true,
            "xterm",
            platform.terminal_width,
            platform.terminal_height,
            0,
            0,
            &[],
        )
        .await?;
    channel.request_shell(true).await?;
    Ok(channel)
}

/// Interactive shell session on one device.
pub struct SshSession {
    handle: Handle<SshHandler>,
    channel: Channel<Msg>,
    platform: PlatformDefinition,
    buffer: PatternBuffer,
    /// Longest silence tolerated while waiting for the prompt.
    timeout: Duration,
}

impl SshSession {
    /// Wait for the first prompt, then run the platform's on-open commands.
    async fn open(&mut self) -> Result<(), CommandError> {
        self.read_until_prompt().await?;
        for command in self.platform.on_open_commands.clone() {
            self.send_command(&command).await?;
        }
        Ok(())
    }

    /// Send a command and return its normalized output.
    async fn send_command(&mut self, command: &str) -> Result<String, CommandError> {
        self.buffer.clear();
        let line = format!("{command}\n");
        self.channel.data(line.as_bytes()).await?;

        let raw = self.read_until_prompt().await?;
        let output = normalize_output(&String::from_utf8_lossy(&raw), command);
        debug!(
            "{}: '{}' returned {} bytes",
            self.platform.name,
            command,
            output.len()
        );
        Ok(output)
    }

    /// Read until the prompt is found in the buffer tail.
    ///
    /// Returns everything before the prompt.
    async fn read_until_prompt(&mut self) -> Result<Vec<u8>, CommandError> {
        let deadline = tokio::time::Instant::now() + self.timeout;

        loop {
            if let Some(start) = self.buffer.search_tail(&self.platform.prompt) {
                let mut data = self.buffer.take();
                data.truncate(start);
                return Ok(data);
            }

            let msg = tokio::time::timeout_at(deadline, self.channel.wait())
                .await
                .map_err(|_| CommandError::Timeout(self.timeout))?;

            match msg {
                Some(ChannelMsg::Data { ref data }) => self.buffer.extend(data),
                Some(ChannelMsg::ExtendedData { ref data, .. }) => self.buffer.extend(data),
                Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => {
                    return Err(CommandError::Closed);
                }
                Some(_) => {}
            }
        }
    }
}

impl Session for SshSession {
    async fn run(&mut self, command: &str) -> Result<String, CommandError> {
        self.send_command(command).await
    }

    async fn run_batch(&mut self, commands: &[String]) -> Result<Vec<CommandResult>, BatchError> {
        if let Some(enter) = self.platform.config_enter.clone() {
            self.send_command(&enter)
                .await
                .map_err(|e| BatchError::EnterConfig(e.to_string()))?;
        }

        let mut results = Vec::with_capacity(commands.len());
        for command in commands {
            let output = self
                .send_command(command)
                .await
                .map_err(|e| BatchError::Command {
                    command: command.clone(),
                    message: e.to_string(),
                })?;
            results.push(CommandResult::new(command.as_str(), output));
        }

        if let Some(exit) = self.platform.config_exit.clone() {
            self.send_command(&exit)
                .await
                .map_err(|e| BatchError::Command {
                    command: exit.clone(),
                    message: e.to_string(),
                })?;
        }

        Ok(results)
    }

    async fn close(self) {
        if let Err(e) = self
            .handle
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await
        {
            warn!("Error while closing {} session: {}", self.platform.name, e);
        }
    }
}

/// Strip the command echo and surrounding blank lines.
fn normalize_output(raw: &str, command: &str) -> String {
    let text = raw.replace("\r\n", "\n");
    let text = text.trim_start_matches(['\r', '\n']);
    let text = text.strip_prefix(command).unwrap_or(text);
    text.trim_start_matches(['\r', '\n'])
        .trim_end_matches(['\r', '\n'])
        .to_string()
}

/// SSH client handler for russh.
///
/// Network devices rarely have their host keys distributed ahead of time,
/// so every key is accepted.
struct SshHandler {
    host: String,
}

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        debug!("Accepting host key of {}", self.host);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConnectErrorKind;

    #[test]
    fn test_normalize_strips_echo() {
        let raw = "show clock\r\n10:00:00.000 UTC Mon Oct 12 2026\r\n";
        assert_eq!(
            normalize_output(raw, "show clock"),
            "10:00:00.000 UTC Mon Oct 12 2026"
        );
    }

    #[test]
    fn test_normalize_keeps_error_banner_first() {
        let raw = "show ip\r\n% Incomplete command.\r\n\r\n";
        assert_eq!(normalize_output(raw, "show ip"), "% Incomplete command.");
    }

    #[test]
    fn test_normalize_empty_config_output() {
        assert_eq!(normalize_output("no shutdown\r\n", "no shutdown"), "");
    }

    #[test]
    fn test_dial_error_classes() {
        let refused = russh::Error::IO(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        ));
        assert_eq!(dial_error(refused).kind, ConnectErrorKind::Unreachable);

        let reworded = russh::Error::IO(std::io::Error::other(
            "No common key exchange algorithm with peer",
        ));
        assert_eq!(
            dial_error(reworded).kind,
            ConnectErrorKind::NegotiationIncompatible
        );
    }

    #[test]
    fn test_default_preferences_without_legacy() {
        let preferred = preferred_algorithms(None).unwrap();
        assert_eq!(preferred.kex.len(), Preferred::default().kex.len());
    }

    #[test]
    fn test_unknown_legacy_algorithm_is_negotiation_error() {
        let suite = LegacySuite {
            key_exchange: "not-a-kex".to_string(),
            cipher: "aes128-cbc".to_string(),
        };
        let err = preferred_algorithms(Some(&suite)).unwrap_err();
        assert_eq!(err.kind, ConnectErrorKind::NegotiationIncompatible);
    }
}
