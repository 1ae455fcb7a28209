use conveyor::transports::MboxTransport;
use conveyor::{Email, MailError, Transport};

fn email(subject: &str, body: &str) -> Email {
    Email::new()
        .from(("Sender", "sender@example.com"))
        .to("rcpt@example.com")
        .subject(subject)
        .text_body(body)
}

#[tokio::test]
async fn appends_one_entry_per_message() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sent.mbox");
    let transport = MboxTransport::new(&path);

    transport.send(&email("First", "one")).await.unwrap();
    transport.send(&email("Second", "two")).await.unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    let separators: Vec<&str> = contents
        .lines()
        .filter(|l| l.starts_with("From "))
        .collect();
    assert_eq!(separators.len(), 2);
    assert!(separators.iter().all(|l| l.starts_with("From sender@example.com ")));
    assert!(contents.find("Subject: First").unwrap() < contents.find("Subject: Second").unwrap());
    assert!(contents.ends_with("\n\n"));
}

#[tokio::test]
async fn quotes_from_lines_in_body() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("quoted.mbox");
    let transport = MboxTransport::new(&path);

    transport
        .send(&email("Quote", "Hello\nFrom the other side\nbye"))
        .await
        .unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.contains("\n>From the other side\n"));
    assert_eq!(contents.lines().filter(|l| l.starts_with("From ")).count(), 1);
}

#[tokio::test]
async fn concurrent_sends_do_not_interleave() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("busy.mbox");
    let transport = std::sync::Arc::new(MboxTransport::new(&path));

    let mut handles = Vec::new();
    for i in 0..8 {
        let transport = transport.clone();
        handles.push(tokio::spawn(async move {
            transport
                .send(&email(&format!("Message {}", i), "body"))
                .await
                .unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let contents = std::fs::read_to_string(&path).unwrap();
    let entries: Vec<&str> = contents.split("\n\nFrom ").collect();
    assert_eq!(entries.len(), 8);
    for entry in entries {
        assert_eq!(entry.matches("Subject: Message").count(), 1);
    }
}

#[tokio::test]
async fn missing_directory_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let transport = MboxTransport::new(dir.path().join("missing").join("sent.mbox"));

    let err = transport.send(&email("Lost", "body")).await.unwrap_err();
    assert!(matches!(err, MailError::Io(_)));
}
