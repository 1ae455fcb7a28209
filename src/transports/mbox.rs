//! Transport that appends messages to a local mbox file.
//!
//! Entries use the mboxrd convention: each message starts with a
//! `From <sender> <asctime>` separator line, body lines matching `>*From `
//! get one more `>`, and the entry ends with an empty line.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::message::build_message;
use crate::email::Email;
use crate::error::MailError;
use crate::transport::{DeliveryResult, Transport};

/// Mbox transport.
#[derive(Debug)]
pub struct MboxTransport {
    path: PathBuf,
    /// Serializes appends from this process.
    write_lock: Mutex<()>,
}

impl MboxTransport {
    /// The file is created on first send if it does not exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Transport for MboxTransport {
    async fn send(&self, email: &Email) -> Result<DeliveryResult, MailError> {
        let message = build_message(email)?;
        let sender = message
            .envelope()
            .from()
            .map(|a| a.to_string())
            .unwrap_or_else(|| "MAILER-DAEMON".to_string());

        let entry = mbox_entry(&sender, Utc::now(), &message.formatted());

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&entry).await?;
        file.flush().await?;

        tracing::debug!(path = %self.path.display(), "Email appended to mbox");

        Ok(DeliveryResult::new(uuid::Uuid::new_v4().to_string()))
    }

    fn name(&self) -> &'static str {
        "mbox"
    }
}

fn mbox_entry(sender: &str, date: DateTime<Utc>, raw: &[u8]) -> Vec<u8> {
    let raw = String::from_utf8_lossy(raw);
    let mut entry = format!("From {} {}\n", sender, date.format("%a %b %e %H:%M:%S %Y"));

    for line in raw.lines() {
        if line.trim_start_matches('>').starts_with("From ") {
            entry.push('>');
        }
        entry.push_str(line);
        entry.push('\n');
    }
    entry.push('\n');

    entry.into_bytes()
}
