//! Spooling: queue emails now, deliver them later.
//!
//! When the `spool` setting is non-empty the factory wraps the real
//! transport in a [`DelayedTransport`]. Sending through it only enqueues;
//! [`DelayedTransport::flush`] later pushes the queue through the real
//! transport.
//!
//! | `spool` | Queue | Extra keys |
//! |---------|-------|------------|
//! | `memory` | [`MemorySpool`] | none |
//! | `file` | [`FileSpool`] | `transport_spool_filepath` |

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use crate::email::Email;
use crate::error::{InvalidConfiguration, MailError};
use crate::settings::{keys, MailSettings};
use crate::transport::{DeliveryResult, Transport};

mod file;
mod memory;

pub use file::FileSpool;
pub use memory::MemorySpool;

/// An email waiting on a spool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedEmail {
    pub id: String,
    pub email: Email,
    pub queued_at: DateTime<Utc>,
}

impl QueuedEmail {
    fn new(email: Email) -> Self {
        let queued_at = Utc::now();
        // Sortable by name: zero-padded, strictly increasing timestamp first
        let id = format!(
            "{:020}-{}",
            next_sequence(queued_at.timestamp_micros()),
            uuid::Uuid::new_v4().simple()
        );
        Self {
            id,
            email,
            queued_at,
        }
    }
}

static LAST_SEQUENCE: AtomicI64 = AtomicI64::new(0);

/// `now` in microseconds, bumped past the last value handed out.
fn next_sequence(now: i64) -> i64 {
    let mut last = LAST_SEQUENCE.load(Ordering::Relaxed);
    loop {
        let next = now.max(last + 1);
        match LAST_SEQUENCE.compare_exchange_weak(last, next, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(current) => last = current,
        }
    }
}

/// Storage for spooled emails.
#[async_trait]
pub trait Spool: Send + Sync {
    /// Enqueue an email and return its queue ID.
    async fn push(&self, email: Email) -> Result<String, MailError>;

    /// All queued emails, oldest first.
    async fn pending(&self) -> Result<Vec<QueuedEmail>, MailError>;

    /// Drop an email from the queue. Returns whether it was there.
    async fn remove(&self, id: &str) -> Result<bool, MailError>;

    /// Short spool name (for logging).
    fn kind(&self) -> &'static str;
}

/// Spool selected by the `spool` setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpoolKind {
    Memory,
    File(PathBuf),
}

impl SpoolKind {
    /// Read the spool settings. `Ok(None)` when `spool` is absent, empty or
    /// not a known spool.
    pub fn from_settings(settings: &MailSettings) -> Result<Option<Self>, InvalidConfiguration> {
        let Some(spool) = settings.get_non_empty(keys::SPOOL) else {
            return Ok(None);
        };

        match spool {
            "memory" => Ok(Some(Self::Memory)),
            "file" => {
                let path = settings.get_non_empty(keys::SPOOL_FILEPATH).ok_or_else(|| {
                    InvalidConfiguration::new(format!(
                        "spool \"file\" requires \"{}\" to be set",
                        keys::SPOOL_FILEPATH
                    ))
                })?;
                Ok(Some(Self::File(PathBuf::from(path))))
            }
            other => {
                tracing::warn!(spool = other, "Unknown spool, sending without one");
                Ok(None)
            }
        }
    }

    /// Create an empty spool of this kind.
    pub fn open(&self) -> Box<dyn Spool> {
        match self {
            Self::Memory => Box::new(MemorySpool::new()),
            Self::File(dir) => Box::new(FileSpool::new(dir.clone())),
        }
    }
}

/// Decorator that spools emails instead of sending them.
///
/// Owns the real transport; [`real_transport`](Self::real_transport) hands
/// it back unchanged. Spool decoration is never nested.
pub struct DelayedTransport {
    real: Arc<dyn Transport>,
    spool: Box<dyn Spool>,
    /// Held for a whole flush.
    flushing: tokio::sync::Mutex<()>,
}

impl DelayedTransport {
    pub fn new(real: Arc<dyn Transport>, spool: Box<dyn Spool>) -> Self {
        Self {
            real,
            spool,
            flushing: tokio::sync::Mutex::new(()),
        }
    }

    /// The wrapped transport.
    pub fn real_transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.real)
    }

    pub fn spool(&self) -> &dyn Spool {
        self.spool.as_ref()
    }

    /// Send every queued email through the real transport, oldest first.
    ///
    /// Each email leaves the queue only once it was sent. On the first
    /// failure the error is returned and the rest stays queued. Concurrent
    /// flushes of the same transport run one after the other, so the second
    /// only sees what the first left behind.
    pub async fn flush(&self) -> Result<usize, MailError> {
        let _guard = self.flushing.lock().await;
        let pending = self.spool.pending().await?;
        let mut sent = 0;

        for queued in pending {
            self.real.send(&queued.email).await?;
            self.spool.remove(&queued.id).await?;
            sent += 1;
        }

        tracing::debug!(
            spool = self.spool.kind(),
            transport = self.real.name(),
            sent,
            "Spool flushed"
        );

        Ok(sent)
    }
}

impl std::fmt::Debug for DelayedTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DelayedTransport")
            .field("real", &self.real.name())
            .field("spool", &self.spool.kind())
            .finish()
    }
}

#[async_trait]
impl Transport for DelayedTransport {
    async fn send(&self, email: &Email) -> Result<DeliveryResult, MailError> {
        let id = self.spool.push(email.clone()).await?;
        tracing::debug!(queue_id = %id, spool = self.spool.kind(), "Email spooled");
        Ok(DeliveryResult::queued(id))
    }

    fn name(&self) -> &'static str {
        self.real.name()
    }

    fn as_delayed(&self) -> Option<&DelayedTransport> {
        Some(self)
    }
}
