//! Error types for conveyor.

use thiserror::Error;

/// Diagnostic code carried by every [`InvalidConfiguration`] error.
pub const INVALID_CONFIGURATION_CODE: u32 = 1291068569;

/// Mail settings could not be turned into a transport.
///
/// This is the only failure [`TransportFactory::build`](crate::TransportFactory::build)
/// can produce. It is fatal: surface it as a startup error instead of retrying.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid mail configuration ({code}): {reason}", code = INVALID_CONFIGURATION_CODE)]
pub struct InvalidConfiguration {
    reason: String,
}

impl InvalidConfiguration {
    /// Create a configuration error with a human-readable reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// The fixed diagnostic code, always [`INVALID_CONFIGURATION_CODE`].
    pub fn code(&self) -> u32 {
        INVALID_CONFIGURATION_CODE
    }

    /// Why the configuration was rejected.
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Errors that can occur when sending emails.
#[derive(Debug, Clone, Error)]
pub enum MailError {
    /// The mailer could not be configured.
    #[error(transparent)]
    InvalidConfiguration(#[from] InvalidConfiguration),

    /// Missing required field (e.g., from address).
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Invalid email address format.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Error building the email message.
    #[error("Build error: {0}")]
    BuildError(String),

    /// Error sending the email.
    #[error("Send error: {0}")]
    SendError(String),

    /// Error queueing or reading back a spooled email.
    #[error("Spool error: {0}")]
    SpoolError(String),

    /// Filesystem or process I/O failed.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for MailError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for MailError {
    fn from(err: serde_json::Error) -> Self {
        Self::SpoolError(err.to_string())
    }
}

impl From<lettre::error::Error> for MailError {
    fn from(err: lettre::error::Error) -> Self {
        Self::BuildError(err.to_string())
    }
}

impl From<lettre::transport::smtp::Error> for MailError {
    fn from(err: lettre::transport::smtp::Error) -> Self {
        Self::SendError(err.to_string())
    }
}

impl From<lettre::address::AddressError> for MailError {
    fn from(err: lettre::address::AddressError) -> Self {
        Self::InvalidAddress(err.to_string())
    }
}
