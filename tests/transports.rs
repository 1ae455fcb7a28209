//! Transport integration tests.

#[path = "transports/mbox_test.rs"]
mod mbox_test;
#[cfg(unix)]
#[path = "transports/sendmail_test.rs"]
mod sendmail_test;
#[path = "transports/spool_test.rs"]
mod spool_test;
