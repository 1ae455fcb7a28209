//! Transport that pipes messages into a local sendmail binary.
//!
//! The configured command is split on whitespace into a program and its
//! flags. The formatted message is written to its stdin. The envelope sender
//! is passed as `-f <from>` unless the command sets one itself. Unless the
//! command carries `-t` (recipients read from the headers), the envelope
//! recipients follow as `-- <rcpt>...`.

use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::message::build_message;
use crate::email::Email;
use crate::error::{InvalidConfiguration, MailError};
use crate::transport::{DeliveryResult, Transport};

/// Command used when `transport_sendmail_command` is not set.
pub const DEFAULT_SENDMAIL_COMMAND: &str = "/usr/sbin/sendmail -i";

/// Sendmail transport.
#[derive(Debug, Clone)]
pub struct SendmailTransport {
    command: String,
    program: String,
    args: Vec<String>,
}

impl SendmailTransport {
    /// Create a transport for the given command line.
    ///
    /// Rejects an empty command. The SMTP-over-stdio flag `-bs` is dropped:
    /// the message is always piped as a raw message, as with `-i`.
    pub fn new(command: &str) -> Result<Self, InvalidConfiguration> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| InvalidConfiguration::new("sendmail command is empty"))?;
        let mut args: Vec<String> = parts.collect();

        if args.iter().any(|a| a == "-bs") {
            tracing::warn!(
                command = command.trim(),
                "sendmail -bs is not supported, piping the message instead"
            );
            args.retain(|a| a != "-bs");
        }

        Ok(Self {
            command: command.trim().to_string(),
            program,
            args,
        })
    }

    /// The full configured command line.
    pub fn command(&self) -> &str {
        &self.command
    }

    fn reads_recipients_from_headers(&self) -> bool {
        self.args.iter().any(|a| a == "-t")
    }

    fn sets_sender(&self) -> bool {
        self.args.iter().any(|a| a.starts_with("-f"))
    }
}

impl Default for SendmailTransport {
    fn default() -> Self {
        Self {
            command: DEFAULT_SENDMAIL_COMMAND.to_string(),
            program: "/usr/sbin/sendmail".to_string(),
            args: vec!["-i".to_string()],
        }
    }
}

#[async_trait]
impl Transport for SendmailTransport {
    async fn send(&self, email: &Email) -> Result<DeliveryResult, MailError> {
        let message = build_message(email)?;

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        let envelope = message.envelope();
        if !self.sets_sender() {
            if let Some(from) = envelope.from() {
                cmd.arg("-f").arg(from.to_string());
            }
        }
        if !self.reads_recipients_from_headers() {
            cmd.arg("--");
            cmd.args(envelope.to().iter().map(|rcpt| rcpt.to_string()));
        }

        let mut child = cmd
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&message.formatted()).await?;
            stdin.shutdown().await?;
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MailError::SendError(format!(
                "sendmail exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(DeliveryResult::new(uuid::Uuid::new_v4().to_string()))
    }

    fn name(&self) -> &'static str {
        "sendmail"
    }
}
