//! Transport trait and delivery result types.
//!
//! # Why `async_trait`?
//!
//! The factory picks a transport at runtime from configuration and hands it
//! out as `Arc<dyn Transport>`. Native async trait methods are not object
//! safe, so the futures are boxed by `#[async_trait]`. Sending mail is I/O
//! bound; the allocation does not show up.
//!
//! Callers holding a concrete type (e.g. an [`SmtpTransport`](crate::transports::SmtpTransport))
//! can call its methods directly without going through `dyn`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;

use crate::email::Email;
use crate::error::MailError;
use crate::spool::DelayedTransport;

/// Result of a successful send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryResult {
    /// Message ID reported by the transport, or a generated one.
    pub message_id: String,
    /// `true` when the message was put on a spool instead of being sent.
    #[serde(default)]
    pub queued: bool,
}

impl DeliveryResult {
    /// A message that left through the transport.
    pub fn new(message_id: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            queued: false,
        }
    }

    /// A message that was spooled for later delivery.
    pub fn queued(message_id: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            queued: true,
        }
    }
}

/// Something that can deliver an [`Email`].
///
/// Built-in implementations live in [`transports`](crate::transports). Implement
/// it for your own type and register it with
/// [`TransportFactory::register_type`](crate::TransportFactory::register_type)
/// to make it selectable from configuration.
///
/// ```ignore
/// use conveyor::{DeliveryResult, Email, MailError, Transport};
///
/// #[derive(Default)]
/// struct Webhook;
///
/// #[async_trait::async_trait]
/// impl Transport for Webhook {
///     async fn send(&self, email: &Email) -> Result<DeliveryResult, MailError> {
///         // ...
///         Ok(DeliveryResult::new("hook-1"))
///     }
/// }
/// ```
#[async_trait]
pub trait Transport: Any + Send + Sync {
    /// Send a single email.
    async fn send(&self, email: &Email) -> Result<DeliveryResult, MailError>;

    /// Send several emails, stopping at the first failure.
    async fn send_many(&self, emails: &[Email]) -> Result<Vec<DeliveryResult>, MailError> {
        let mut results = Vec::with_capacity(emails.len());
        for email in emails {
            results.push(self.send(email).await?);
        }
        Ok(results)
    }

    /// Short transport name (for logging/metrics).
    fn name(&self) -> &'static str {
        "unknown"
    }

    /// `Some` only for the spool decorator.
    fn as_delayed(&self) -> Option<&DelayedTransport> {
        None
    }
}

impl dyn Transport {
    /// Downcast to a concrete transport type.
    ///
    /// ```
    /// use conveyor::{Transport, transports::NullTransport};
    ///
    /// let transport: Box<dyn Transport> = Box::new(NullTransport::new());
    /// assert!(transport.downcast_ref::<NullTransport>().is_some());
    /// ```
    pub fn downcast_ref<T: Transport>(&self) -> Option<&T> {
        (self as &dyn Any).downcast_ref::<T>()
    }

    /// Whether this is a spool decorator.
    pub fn is_delayed(&self) -> bool {
        self.as_delayed().is_some()
    }
}

impl fmt::Debug for dyn Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport")
            .field("name", &self.name())
            .field("delayed", &self.is_delayed())
            .finish()
    }
}
