//! Directory-backed spool that survives restarts.
//!
//! One JSON file per email, named `<queue id>.json`. Queue IDs start with a
//! zero-padded timestamp, so sorting file names gives queue order. Files are
//! written under a `.tmp` name and renamed into place, so a reader never
//! sees a partial entry.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{QueuedEmail, Spool};
use crate::email::Email;
use crate::error::MailError;

const EXTENSION: &str = "json";

/// File spool rooted at a directory, created on first push.
#[derive(Debug, Clone)]
pub struct FileSpool {
    dir: PathBuf,
}

impl FileSpool {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", id, EXTENSION))
    }
}

#[async_trait]
impl Spool for FileSpool {
    async fn push(&self, email: Email) -> Result<String, MailError> {
        let queued = QueuedEmail::new(email);
        let json = serde_json::to_vec(&queued)?;

        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.entry_path(&queued.id);
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &path).await?;

        Ok(queued.id)
    }

    async fn pending(&self) -> Result<Vec<QueuedEmail>, MailError> {
        let mut dir = match tokio::fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut paths = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some(EXTENSION) {
                paths.push(path);
            }
        }
        paths.sort();

        let mut queued = Vec::with_capacity(paths.len());
        for path in paths {
            let bytes = tokio::fs::read(&path).await?;
            let entry: QueuedEmail = serde_json::from_slice(&bytes).map_err(|e| {
                MailError::SpoolError(format!("{}: {}", path.display(), e))
            })?;
            queued.push(entry);
        }

        Ok(queued)
    }

    async fn remove(&self, id: &str) -> Result<bool, MailError> {
        match tokio::fs::remove_file(self.entry_path(id)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn kind(&self) -> &'static str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_spool_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let spool_dir = dir.path().join("spool");

        let spool = FileSpool::new(&spool_dir);
        assert!(spool.pending().await.unwrap().is_empty());

        let first = spool
            .push(Email::new().subject("First").header("X-A", "1"))
            .await
            .unwrap();
        spool.push(Email::new().subject("Second")).await.unwrap();

        let reopened = FileSpool::new(&spool_dir);
        let pending = reopened.pending().await.unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].id, first);
        assert_eq!(pending[0].email.headers.get("X-A").map(String::as_str), Some("1"));
        assert_eq!(pending[1].email.subject, "Second");

        assert!(reopened.remove(&first).await.unwrap());
        assert!(!reopened.remove(&first).await.unwrap());
        assert_eq!(spool.pending().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ignores_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("README"), "not an email").unwrap();
        std::fs::write(dir.path().join("half.tmp"), "{").unwrap();

        let spool = FileSpool::new(dir.path());
        assert!(spool.pending().await.unwrap().is_empty());
    }
}
