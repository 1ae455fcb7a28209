//! Transport that discards every message.
//!
//! Selected by `transport = null`, and the fallback when no transport is
//! configured at all. Useful for tests and for environments where mail is
//! switched off.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::email::Email;
use crate::error::MailError;
use crate::transport::{DeliveryResult, Transport};

/// Accepts and drops emails, emitting a debug event for each.
#[derive(Debug, Default)]
pub struct NullTransport {
    discarded: AtomicUsize,
}

impl NullTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of emails dropped so far.
    pub fn discarded(&self) -> usize {
        self.discarded.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Transport for NullTransport {
    async fn send(&self, email: &Email) -> Result<DeliveryResult, MailError> {
        let message_id = uuid::Uuid::new_v4().to_string();
        self.discarded.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(
            message_id = %message_id,
            to = ?email.to.iter().map(|a| &a.email).collect::<Vec<_>>(),
            subject = %email.subject,
            "Email discarded"
        );

        Ok(DeliveryResult::new(message_id))
    }

    fn name(&self) -> &'static str {
        "null"
    }
}
