//! # Conveyor
//!
//! Resolve mail settings into a ready-to-use delivery transport.
//!
//! ## Quick Start
//!
//! Set environment variables:
//! ```bash
//! MAIL_TRANSPORT=smtp
//! MAIL_TRANSPORT_SMTP_SERVER=mail.example.com:587
//! MAIL_DEFAULT_MAIL_FROM_ADDRESS=noreply@example.com
//! ```
//!
//! Build a mailer once at startup and send through it:
//! ```rust,ignore
//! use conveyor::{Email, Mailer};
//!
//! let mailer = Mailer::from_env()?; // fails fast on bad settings
//!
//! let email = Email::new()
//!     .to("user@example.com")
//!     .subject("Welcome!")
//!     .text_body("Hello");
//!
//! mailer.deliver(&email).await?;
//! ```
//!
//! ## Settings
//!
//! | Key | Description |
//! |-----|-------------|
//! | `transport` | `smtp`, `sendmail`, `mbox`, `null`, or a registered transport |
//! | `transport_smtp_server` | `host` or `host:port` (port defaults to 25) |
//! | `transport_smtp_encrypt` | truthy for implicit TLS |
//! | `transport_smtp_username` | SMTP username |
//! | `transport_smtp_password` | SMTP password |
//! | `transport_sendmail_command` | sendmail command line |
//! | `transport_mbox_file` | mbox file to append to |
//! | `spool` | `memory` or `file` to queue instead of sending |
//! | `transport_spool_filepath` | directory for the `file` spool |
//! | `default_mail_from_address` | sender for emails without one |
//! | `default_mail_from_name` | display name for that sender |
//!
//! Invalid settings fail with [`InvalidConfiguration`] (code
//! [`INVALID_CONFIGURATION_CODE`]) when the mailer is built, never later.
//!
//! ## Feature Flags
//!
//! - `metrics` - Prometheus-style metrics (counters/histograms)
//!
//! ## Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `conveyor_emails_total` | Counter | transport, status | Emails sent, spooled or failed |
//! | `conveyor_delivery_duration_seconds` | Histogram | transport | Delivery duration |

/// The version of the conveyor crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

mod address;
mod email;
mod error;
mod event;
mod factory;
mod mailer;
mod settings;
mod transport;

pub mod spool;
pub mod transports;

// Re-exports
pub use address::{Address, ToAddress};
pub use email::Email;
pub use error::{InvalidConfiguration, MailError, INVALID_CONFIGURATION_CODE};
pub use event::{TransportCreated, TransportObserver};
pub use factory::{TransportBuilder, TransportFactory, BUILTIN_TRANSPORTS};
pub use mailer::{Mailer, MailerBuilder};
pub use settings::{keys, ConfigProvider, EnvConfigProvider, MailSettings};
pub use spool::DelayedTransport;
pub use transport::{DeliveryResult, Transport};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::Address;
    pub use crate::DeliveryResult;
    pub use crate::Email;
    pub use crate::InvalidConfiguration;
    pub use crate::MailError;
    pub use crate::MailSettings;
    pub use crate::Mailer;
    pub use crate::ToAddress;
    pub use crate::Transport;
    pub use crate::TransportFactory;
}
