use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use conveyor::spool::{FileSpool, MemorySpool, Spool};
use conveyor::{DelayedTransport, DeliveryResult, Email, MailError, Transport};

/// Delivers the first `budget` emails, then fails.
struct FlakyTransport {
    budget: usize,
    sent: AtomicUsize,
}

impl FlakyTransport {
    fn new(budget: usize) -> Self {
        Self {
            budget,
            sent: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Transport for FlakyTransport {
    async fn send(&self, email: &Email) -> Result<DeliveryResult, MailError> {
        let n = self.sent.load(Ordering::SeqCst);
        if n >= self.budget {
            return Err(MailError::SendError(format!("refused {}", email.subject)));
        }
        self.sent.store(n + 1, Ordering::SeqCst);
        Ok(DeliveryResult::new(format!("flaky-{}", n)))
    }

    fn name(&self) -> &'static str {
        "flaky"
    }
}

fn email(subject: &str) -> Email {
    Email::new()
        .from("a@example.com")
        .to("b@example.com")
        .subject(subject)
}

#[tokio::test]
async fn flush_stops_at_first_failure_and_keeps_the_rest() {
    let real = Arc::new(FlakyTransport::new(1));
    let delayed = DelayedTransport::new(real.clone(), Box::new(MemorySpool::new()));

    for subject in ["One", "Two", "Three"] {
        assert!(delayed.send(&email(subject)).await.unwrap().queued);
    }
    assert_eq!(real.sent.load(Ordering::SeqCst), 0);

    let err = delayed.flush().await.unwrap_err();
    assert!(matches!(err, MailError::SendError(ref m) if m == "refused Two"));

    let pending = delayed.spool().pending().await.unwrap();
    let subjects: Vec<&str> = pending.iter().map(|q| q.email.subject.as_str()).collect();
    assert_eq!(subjects, ["Two", "Three"]);
}

#[tokio::test]
async fn file_spool_is_flushed_by_a_later_transport() {
    let dir = tempfile::tempdir().unwrap();

    let first = DelayedTransport::new(
        Arc::new(FlakyTransport::new(0)),
        Box::new(FileSpool::new(dir.path())),
    );
    let queued = first.send(&email("Persisted")).await.unwrap();
    assert!(dir.path().join(format!("{}.json", queued.message_id)).exists());
    drop(first);

    let real = Arc::new(FlakyTransport::new(10));
    let second = DelayedTransport::new(real.clone(), Box::new(FileSpool::new(dir.path())));
    assert_eq!(second.flush().await.unwrap(), 1);
    assert_eq!(real.sent.load(Ordering::SeqCst), 1);
    assert!(second.spool().pending().await.unwrap().is_empty());
}

#[tokio::test]
async fn send_many_queues_in_order() {
    let spool_dir = tempfile::tempdir().unwrap();
    let delayed = DelayedTransport::new(
        Arc::new(FlakyTransport::new(10)),
        Box::new(FileSpool::new(spool_dir.path())),
    );

    let emails: Vec<Email> = (0..5).map(|i| email(&format!("#{}", i))).collect();
    let results = delayed.send_many(&emails).await.unwrap();
    assert!(results.iter().all(|r| r.queued));

    let pending = delayed.spool().pending().await.unwrap();
    let ids: Vec<&str> = pending.iter().map(|q| q.id.as_str()).collect();
    let expected: Vec<&str> = results.iter().map(|r| r.message_id.as_str()).collect();
    assert_eq!(ids, expected);
}

#[tokio::test]
async fn spool_is_usable_directly() {
    let spool: Box<dyn Spool> = Box::new(MemorySpool::new());
    let id = spool.push(email("Direct")).await.unwrap();
    assert_eq!(spool.kind(), "memory");
    assert!(spool.remove(&id).await.unwrap());
    assert!(spool.pending().await.unwrap().is_empty());
}

/// Counts sends and yields to the runtime before each one.
#[derive(Default)]
struct SlowTransport {
    sent: AtomicUsize,
}

#[async_trait]
impl Transport for SlowTransport {
    async fn send(&self, _email: &Email) -> Result<DeliveryResult, MailError> {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let n = self.sent.fetch_add(1, Ordering::SeqCst);
        Ok(DeliveryResult::new(format!("slow-{}", n)))
    }
}

#[tokio::test]
async fn concurrent_flushes_send_each_email_once() {
    let real = Arc::new(SlowTransport::default());
    let delayed = DelayedTransport::new(real.clone(), Box::new(MemorySpool::new()));
    for subject in ["One", "Two", "Three"] {
        delayed.send(&email(subject)).await.unwrap();
    }

    let (a, b) = tokio::join!(delayed.flush(), delayed.flush());

    assert_eq!(a.unwrap() + b.unwrap(), 3);
    assert_eq!(real.sent.load(Ordering::SeqCst), 3);
    assert!(delayed.spool().pending().await.unwrap().is_empty());
}
