//! Sendmail tests against a fake sendmail shell script.

use std::path::Path;

use conveyor::transports::SendmailTransport;
use conveyor::{Email, MailError, Transport};

/// Write a script that records its arguments and stdin next to itself.
fn fake_sendmail(dir: &Path, exit_code: i32) -> String {
    let script = dir.join("fake-sendmail.sh");
    std::fs::write(
        &script,
        format!(
            "echo \"$@\" > '{args}'\ncat > '{message}'\necho 'queue full' >&2\nexit {code}\n",
            args = dir.join("args").display(),
            message = dir.join("message").display(),
            code = exit_code,
        ),
    )
    .unwrap();
    format!("/bin/sh {}", script.display())
}

fn email() -> Email {
    Email::new()
        .from("sender@example.com")
        .to("one@example.com")
        .cc("two@example.com")
        .bcc("hidden@example.com")
        .subject("Piped")
        .text_body("Through stdin")
}

#[tokio::test]
async fn appends_envelope_and_pipes_message() {
    let dir = tempfile::tempdir().unwrap();
    let transport = SendmailTransport::new(&format!("{} -i", fake_sendmail(dir.path(), 0))).unwrap();

    let result = transport.send(&email()).await.unwrap();
    assert!(!result.queued);

    let args = std::fs::read_to_string(dir.path().join("args")).unwrap();
    let (flags, rcpts) = args.trim().split_once(" -- ").unwrap();
    assert_eq!(flags, "-i -f sender@example.com");
    let mut rcpts: Vec<&str> = rcpts.split(' ').collect();
    rcpts.sort();
    assert_eq!(rcpts, ["hidden@example.com", "one@example.com", "two@example.com"]);

    let message = std::fs::read_to_string(dir.path().join("message")).unwrap();
    assert!(message.contains("Subject: Piped"));
    assert!(message.contains("Through stdin"));
    assert!(!message.contains("hidden@example.com"));
}

#[tokio::test]
async fn header_recipients_mode_keeps_envelope_sender() {
    let dir = tempfile::tempdir().unwrap();
    let transport =
        SendmailTransport::new(&format!("{} -t -i", fake_sendmail(dir.path(), 0))).unwrap();

    transport.send(&email()).await.unwrap();

    let args = std::fs::read_to_string(dir.path().join("args")).unwrap();
    assert_eq!(args.trim(), "-t -i -f sender@example.com");
}

#[tokio::test]
async fn configured_sender_is_not_overridden() {
    let dir = tempfile::tempdir().unwrap();
    let command = format!("{} -t -f bounce@example.com", fake_sendmail(dir.path(), 0));
    let transport = SendmailTransport::new(&command).unwrap();

    transport.send(&email()).await.unwrap();

    let args = std::fs::read_to_string(dir.path().join("args")).unwrap();
    assert_eq!(args.trim(), "-t -f bounce@example.com");
}

#[tokio::test]
async fn bs_mode_pipes_the_message() {
    let dir = tempfile::tempdir().unwrap();
    let transport =
        SendmailTransport::new(&format!("{} -bs", fake_sendmail(dir.path(), 0))).unwrap();

    transport.send(&email()).await.unwrap();

    let args = std::fs::read_to_string(dir.path().join("args")).unwrap();
    assert!(args.starts_with("-f sender@example.com -- "), "{}", args);
    let message = std::fs::read_to_string(dir.path().join("message")).unwrap();
    assert!(message.contains("Subject: Piped"));
}

#[tokio::test]
async fn non_zero_exit_is_a_send_error() {
    let dir = tempfile::tempdir().unwrap();
    let transport = SendmailTransport::new(&fake_sendmail(dir.path(), 75)).unwrap();

    match transport.send(&email()).await.unwrap_err() {
        MailError::SendError(msg) => assert!(msg.contains("queue full"), "{}", msg),
        other => panic!("expected SendError, got {:?}", other),
    }
}

#[tokio::test]
async fn missing_binary_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("no-such-sendmail");
    let transport = SendmailTransport::new(&missing.to_string_lossy()).unwrap();

    let err = transport.send(&email()).await.unwrap_err();
    assert!(matches!(err, MailError::Io(_)));
}

#[tokio::test]
async fn email_without_sender_is_rejected_before_spawning() {
    let dir = tempfile::tempdir().unwrap();
    let transport = SendmailTransport::new(&fake_sendmail(dir.path(), 0)).unwrap();

    let err = transport
        .send(&Email::new().to("one@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, MailError::MissingField("from")));
    assert!(!dir.path().join("args").exists());
}
