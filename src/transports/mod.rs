//! Built-in transport implementations.
//!
//! Each transport implements the [`Transport`](crate::Transport) trait and is
//! selected by the `transport` setting:
//!
//! | Setting | Transport | Required keys |
//! |---------|-----------|---------------|
//! | `smtp` | [`SmtpTransport`] | `transport_smtp_server` |
//! | `sendmail` | [`SendmailTransport`] | none (`transport_sendmail_command` optional) |
//! | `mbox` | [`MboxTransport`] | `transport_mbox_file` |
//! | `null` | [`NullTransport`] | none |

pub(crate) mod message;

mod mbox;
mod null;
mod sendmail;
mod smtp;

pub use mbox::MboxTransport;
pub use null::NullTransport;
pub use sendmail::{SendmailTransport, DEFAULT_SENDMAIL_COMMAND};
pub use smtp::{parse_server, SmtpBuilder, SmtpTransport, TlsMode, DEFAULT_SMTP_PORT};
