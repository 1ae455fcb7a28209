//! Conversion of [`Email`] into an RFC 5322 message via lettre.
//!
//! Shared by every transport that writes the raw message somewhere
//! (SMTP, sendmail stdin, mbox file).

use lettre::message::header::{ContentType, HeaderName, HeaderValue};
use lettre::message::{Mailbox, MultiPart};
use lettre::Message;

use crate::address::Address;
use crate::email::Email;
use crate::error::MailError;

/// Build a lettre [`Message`] from an [`Email`].
///
/// Requires a sender and at least one recipient.
pub(crate) fn build_message(email: &Email) -> Result<Message, MailError> {
    let from = email
        .from
        .as_ref()
        .ok_or(MailError::MissingField("from"))?;

    if email.to.is_empty() && email.cc.is_empty() && email.bcc.is_empty() {
        return Err(MailError::MissingField("to"));
    }

    let mut builder = Message::builder()
        .from(address_to_mailbox(from)?)
        .subject(&email.subject);

    for to in &email.to {
        builder = builder.to(address_to_mailbox(to)?);
    }
    for cc in &email.cc {
        builder = builder.cc(address_to_mailbox(cc)?);
    }
    for bcc in &email.bcc {
        builder = builder.bcc(address_to_mailbox(bcc)?);
    }
    for reply_to in &email.reply_to {
        builder = builder.reply_to(address_to_mailbox(reply_to)?);
    }

    for (name, value) in &email.headers {
        let name = HeaderName::new_from_ascii(name.clone())
            .map_err(|_| MailError::BuildError(format!("invalid header name '{}'", name)))?;
        builder = builder.raw_header(HeaderValue::new(name, value.clone()));
    }

    let message = match (&email.html_body, &email.text_body) {
        (Some(html), Some(text)) => {
            builder.multipart(MultiPart::alternative_plain_html(text.clone(), html.clone()))?
        }
        (Some(html), None) => builder.header(ContentType::TEXT_HTML).body(html.clone())?,
        (None, Some(text)) => builder.header(ContentType::TEXT_PLAIN).body(text.clone())?,
        (None, None) => builder.header(ContentType::TEXT_PLAIN).body(String::new())?,
    };

    Ok(message)
}

fn address_to_mailbox(addr: &Address) -> Result<Mailbox, MailError> {
    let email = addr.email.parse()?;
    Ok(Mailbox::new(addr.name.clone(), email))
}
