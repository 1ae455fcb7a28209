//! SMTP transport using lettre.
//!
//! # Example
//!
//! ```rust,ignore
//! use conveyor::transports::{SmtpTransport, TlsMode};
//!
//! let transport = SmtpTransport::new("smtp.example.com", 465)
//!     .tls(TlsMode::Wrapper)
//!     .credentials("username", "password")
//!     .build()?;
//! ```

use async_trait::async_trait;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};

use super::message::build_message;
use crate::email::Email;
use crate::error::{InvalidConfiguration, MailError};
use crate::transport::{DeliveryResult, Transport};

/// Port used when the server setting names none.
pub const DEFAULT_SMTP_PORT: u16 = 25;

/// Split a `host[:port]` server setting.
///
/// The split happens at the last `:`. A missing or empty port segment means
/// [`DEFAULT_SMTP_PORT`]. Bracketed IPv6 literals are not special-cased.
///
/// ```
/// use conveyor::transports::parse_server;
///
/// assert_eq!(parse_server("localhost").unwrap(), ("localhost".to_string(), 25));
/// assert_eq!(parse_server("localhost:").unwrap(), ("localhost".to_string(), 25));
/// assert_eq!(parse_server("localhost:2525").unwrap(), ("localhost".to_string(), 2525));
/// ```
pub fn parse_server(server: &str) -> Result<(String, u16), InvalidConfiguration> {
    let server = server.trim();
    let (host, port) = match server.rsplit_once(':') {
        None => (server, DEFAULT_SMTP_PORT),
        Some((host, "")) => (host, DEFAULT_SMTP_PORT),
        Some((host, port)) => {
            let port = port.parse::<u16>().map_err(|_| {
                InvalidConfiguration::new(format!(
                    "SMTP server \"{}\" has an invalid port \"{}\"",
                    server, port
                ))
            })?;
            (host, port)
        }
    };

    if host.is_empty() {
        return Err(InvalidConfiguration::new(format!(
            "SMTP server \"{}\" has no host",
            server
        )));
    }

    Ok((host.to_string(), port))
}

/// TLS mode for the SMTP connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsMode {
    /// Plain connection, never upgraded.
    None,
    /// Upgrade with STARTTLS when the server offers it.
    Opportunistic,
    /// Implicit TLS from the first byte (usually port 465).
    Wrapper,
}

/// SMTP transport.
pub struct SmtpTransport {
    host: String,
    port: u16,
    tls: TlsMode,
    inner: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpTransport {
    /// Start building an SMTP transport. Defaults to [`TlsMode::Opportunistic`].
    pub fn new(host: &str, port: u16) -> SmtpBuilder {
        SmtpBuilder {
            host: host.to_string(),
            port,
            credentials: None,
            tls: TlsMode::Opportunistic,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// The TLS mode actually in effect.
    pub fn tls_mode(&self) -> TlsMode {
        self.tls
    }
}

impl std::fmt::Debug for SmtpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpTransport")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("tls", &self.tls)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Transport for SmtpTransport {
    async fn send(&self, email: &Email) -> Result<DeliveryResult, MailError> {
        let message = build_message(email)?;

        let response = self.inner.send(message).await?;

        // Servers usually echo a queue ID in the final reply
        let message_id = response
            .message()
            .next()
            .and_then(|m| m.lines().next())
            .map(|s| s.to_string())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        Ok(DeliveryResult::new(message_id))
    }

    fn name(&self) -> &'static str {
        "smtp"
    }
}

/// Builder for [`SmtpTransport`].
pub struct SmtpBuilder {
    host: String,
    port: u16,
    credentials: Option<Credentials>,
    tls: TlsMode,
}

impl SmtpBuilder {
    /// Set SMTP AUTH credentials.
    pub fn credentials(mut self, username: &str, password: &str) -> Self {
        self.credentials = Some(Credentials::new(username.to_string(), password.to_string()));
        self
    }

    pub fn tls(mut self, mode: TlsMode) -> Self {
        self.tls = mode;
        self
    }

    /// Build the transport. No connection is opened until the first send.
    ///
    /// Fails only when implicit TLS was requested and no TLS client can be
    /// set up for the host. If opportunistic TLS cannot be set up the
    /// transport falls back to a plain connection.
    pub fn build(self) -> Result<SmtpTransport, InvalidConfiguration> {
        let (builder, tls) = match self.tls {
            TlsMode::None => (
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&self.host),
                TlsMode::None,
            ),
            TlsMode::Opportunistic => match TlsParameters::new(self.host.clone()) {
                Ok(params) => (
                    AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&self.host)
                        .tls(Tls::Opportunistic(params)),
                    TlsMode::Opportunistic,
                ),
                Err(e) => {
                    tracing::warn!(host = %self.host, error = %e, "TLS unavailable, using plain SMTP");
                    (
                        AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&self.host),
                        TlsMode::None,
                    )
                }
            },
            TlsMode::Wrapper => {
                let builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&self.host).map_err(
                    |e| {
                        InvalidConfiguration::new(format!(
                            "cannot set up TLS for SMTP server \"{}\": {}",
                            self.host, e
                        ))
                    },
                )?;
                (builder, TlsMode::Wrapper)
            }
        };

        let mut builder = builder.port(self.port);
        if let Some(creds) = self.credentials {
            builder = builder.credentials(creds);
        }

        Ok(SmtpTransport {
            host: self.host,
            port: self.port,
            tls,
            inner: builder.build(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_server_splits_on_last_colon() {
        assert_eq!(
            parse_server("::1:2525").unwrap(),
            ("::1".to_string(), 2525)
        );
        assert_eq!(
            parse_server(" mail.example.com:587 ").unwrap(),
            ("mail.example.com".to_string(), 587)
        );
    }

    #[test]
    fn test_parse_server_rejects_bad_input() {
        assert!(parse_server("localhost:smtp").is_err());
        assert!(parse_server("localhost:70000").is_err());
        assert!(parse_server(":25").is_err());
        assert_eq!(parse_server("").unwrap_err().code(), 1291068569);
    }

    #[test]
    fn test_builder_keeps_endpoint() {
        let transport = SmtpTransport::new("localhost", 2525)
            .tls(TlsMode::None)
            .credentials("user", "secret")
            .build()
            .unwrap();

        assert_eq!(transport.host(), "localhost");
        assert_eq!(transport.port(), 2525);
        assert_eq!(transport.tls_mode(), TlsMode::None);
        assert_eq!(transport.name(), "smtp");
    }
}
