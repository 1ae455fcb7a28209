//! In-memory spool. Lost when the process exits.

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{QueuedEmail, Spool};
use crate::email::Email;
use crate::error::MailError;

/// Thread-safe in-memory queue, kept in insertion order.
#[derive(Debug, Default)]
pub struct MemorySpool {
    queue: Mutex<Vec<QueuedEmail>>,
}

impl MemorySpool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}

#[async_trait]
impl Spool for MemorySpool {
    async fn push(&self, email: Email) -> Result<String, MailError> {
        let queued = QueuedEmail::new(email);
        let id = queued.id.clone();
        self.queue.lock().push(queued);
        Ok(id)
    }

    async fn pending(&self) -> Result<Vec<QueuedEmail>, MailError> {
        Ok(self.queue.lock().clone())
    }

    async fn remove(&self, id: &str) -> Result<bool, MailError> {
        let mut queue = self.queue.lock();
        let before = queue.len();
        queue.retain(|q| q.id != id);
        Ok(queue.len() != before)
    }

    fn kind(&self) -> &'static str {
        "memory"
    }
}
