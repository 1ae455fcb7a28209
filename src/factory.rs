//! Turning [`MailSettings`] into a [`Transport`].
//!
//! [`TransportFactory::build`] reads the `transport` key and dispatches:
//!
//! | `transport` | Result |
//! |-------------|--------|
//! | absent / empty | [`NullTransport`] (with a warning) |
//! | `smtp` | [`SmtpTransport`] on `transport_smtp_server` |
//! | `sendmail` | [`SendmailTransport`] running `transport_sendmail_command` |
//! | `mbox` | [`MboxTransport`] appending to `transport_mbox_file` |
//! | `null` | [`NullTransport`] |
//! | anything else | the transport registered under that identifier |
//!
//! When `spool` is set, the result is wrapped in a
//! [`DelayedTransport`](crate::spool::DelayedTransport).
//!
//! # Custom transports
//!
//! ```rust,ignore
//! use conveyor::{MailSettings, TransportFactory};
//!
//! let mut factory = TransportFactory::new();
//! factory.register("webhook", |settings: &MailSettings| {
//!     Ok(WebhookTransport::new(settings.get("webhook_url").unwrap_or_default()))
//! })?;
//! factory.register_type::<MyTransport>()?; // selectable as "my_crate::MyTransport"
//! ```

use std::any::type_name;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::InvalidConfiguration;
use crate::event::{TransportCreated, TransportObserver};
use crate::settings::{keys, MailSettings};
use crate::spool::{DelayedTransport, SpoolKind};
use crate::transport::Transport;
use crate::transports::{
    parse_server, MboxTransport, NullTransport, SendmailTransport, SmtpTransport, TlsMode,
};

/// Transport identifiers handled by the factory itself.
pub const BUILTIN_TRANSPORTS: &[&str] = &["smtp", "sendmail", "mbox", "null"];

type Provider =
    Arc<dyn Fn(&MailSettings) -> Result<Arc<dyn Transport>, InvalidConfiguration> + Send + Sync>;

/// Anything that can build a transport from settings.
///
/// [`Mailer`](crate::Mailer) depends on this rather than on
/// [`TransportFactory`] directly, so tests can hand it a closure.
pub trait TransportBuilder: Send + Sync {
    fn build(&self, settings: &MailSettings) -> Result<Arc<dyn Transport>, InvalidConfiguration>;
}

impl<F> TransportBuilder for F
where
    F: Fn(&MailSettings) -> Result<Arc<dyn Transport>, InvalidConfiguration> + Send + Sync,
{
    fn build(&self, settings: &MailSettings) -> Result<Arc<dyn Transport>, InvalidConfiguration> {
        (self)(settings)
    }
}

/// Builds transports from settings.
#[derive(Clone)]
pub struct TransportFactory {
    providers: HashMap<String, Provider>,
    observers: Vec<Arc<dyn TransportObserver>>,
}

impl TransportFactory {
    /// A factory with the built-in transports and [`NullTransport`]
    /// registered under its type name.
    pub fn new() -> Self {
        let mut factory = Self {
            providers: HashMap::new(),
            observers: Vec::new(),
        };
        factory.insert_type::<NullTransport>();
        factory
    }

    /// Notify `observer` about every transport this factory builds.
    pub fn with_observer(mut self, observer: impl TransportObserver + 'static) -> Self {
        self.observers.push(Arc::new(observer));
        self
    }

    /// Make a custom transport selectable as `transport = <identifier>`.
    ///
    /// The provider receives the full settings and may reject them. Built-in
    /// identifiers cannot be taken over; a later registration under the same
    /// custom identifier replaces the earlier one.
    pub fn register<T, F>(
        &mut self,
        identifier: impl Into<String>,
        provider: F,
    ) -> Result<(), InvalidConfiguration>
    where
        T: Transport,
        F: Fn(&MailSettings) -> Result<T, InvalidConfiguration> + Send + Sync + 'static,
    {
        let identifier = identifier.into();
        if identifier.trim().is_empty() {
            return Err(InvalidConfiguration::new(
                "cannot register a transport under an empty identifier",
            ));
        }
        if BUILTIN_TRANSPORTS.contains(&identifier.as_str()) {
            return Err(InvalidConfiguration::new(format!(
                "\"{}\" is a built-in transport and cannot be replaced",
                identifier
            )));
        }

        self.providers.insert(
            identifier,
            Arc::new(move |settings: &MailSettings| {
                provider(settings).map(|t| Arc::new(t) as Arc<dyn Transport>)
            }),
        );
        Ok(())
    }

    /// Register `T` under its fully-qualified type name, e.g.
    /// `conveyor::transports::null::NullTransport`.
    pub fn register_type<T: Transport + Default>(&mut self) -> Result<(), InvalidConfiguration> {
        self.register(type_name::<T>(), |_: &MailSettings| Ok(T::default()))
    }

    fn insert_type<T: Transport + Default>(&mut self) {
        self.providers.insert(
            type_name::<T>().to_string(),
            Arc::new(|_: &MailSettings| {
                Ok::<_, InvalidConfiguration>(Arc::new(T::default()) as Arc<dyn Transport>)
            }),
        );
    }

    /// Whether `identifier` resolves to a transport.
    pub fn is_registered(&self, identifier: &str) -> bool {
        BUILTIN_TRANSPORTS.contains(&identifier) || self.providers.contains_key(identifier)
    }

    /// Build the transport described by `settings`.
    ///
    /// Fails with [`InvalidConfiguration`] when the selected transport or
    /// spool lacks a required key, or when the transport is unknown. Nothing
    /// is built and no observer runs in that case. An unknown spool is
    /// ignored with a warning.
    pub fn build(
        &self,
        settings: &MailSettings,
    ) -> Result<Arc<dyn Transport>, InvalidConfiguration> {
        let spool = SpoolKind::from_settings(settings)?;
        let base = self.build_base(settings)?;

        let event = TransportCreated::new(settings, base.as_ref());
        for observer in &self.observers {
            observer.transport_created(&event);
        }

        tracing::debug!(
            transport = base.name(),
            spool = ?spool,
            "Mail transport built"
        );

        Ok(match spool {
            Some(kind) => Arc::new(DelayedTransport::new(base, kind.open())) as Arc<dyn Transport>,
            None => base,
        })
    }

    fn build_base(
        &self,
        settings: &MailSettings,
    ) -> Result<Arc<dyn Transport>, InvalidConfiguration> {
        let Some(transport) = settings.get_non_empty(keys::TRANSPORT) else {
            tracing::warn!("No mail transport configured, discarding all mail");
            return Ok(Arc::new(NullTransport::new()));
        };

        match transport {
            "smtp" => Ok(Arc::new(build_smtp(settings)?)),
            "sendmail" => {
                let transport = match settings.get_non_empty(keys::SENDMAIL_COMMAND) {
                    Some(command) => SendmailTransport::new(command)?,
                    None => SendmailTransport::default(),
                };
                Ok(Arc::new(transport))
            }
            "mbox" => {
                let file = settings.get_non_empty(keys::MBOX_FILE).ok_or_else(|| {
                    InvalidConfiguration::new(format!(
                        "transport \"mbox\" requires \"{}\" to be set",
                        keys::MBOX_FILE
                    ))
                })?;
                Ok(Arc::new(MboxTransport::new(file)))
            }
            "null" => Ok(Arc::new(NullTransport::new())),
            custom => {
                let provider = self.providers.get(custom).ok_or_else(|| {
                    InvalidConfiguration::new(format!(
                        "transport \"{}\" is neither built in nor registered",
                        custom
                    ))
                })?;
                provider(settings)
            }
        }
    }
}

fn build_smtp(settings: &MailSettings) -> Result<SmtpTransport, InvalidConfiguration> {
    let server = settings.get_non_empty(keys::SMTP_SERVER).ok_or_else(|| {
        InvalidConfiguration::new(format!(
            "transport \"smtp\" requires \"{}\" to be set",
            keys::SMTP_SERVER
        ))
    })?;
    let (host, port) = parse_server(server)?;

    let tls = if settings.is_enabled(keys::SMTP_ENCRYPT) {
        TlsMode::Wrapper
    } else {
        TlsMode::Opportunistic
    };

    let mut builder = SmtpTransport::new(&host, port).tls(tls);
    if let Some(username) = settings.get_non_empty(keys::SMTP_USERNAME) {
        let password = settings.get(keys::SMTP_PASSWORD).unwrap_or_default();
        builder = builder.credentials(username, password);
    }

    builder.build()
}

impl Default for TransportFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportBuilder for TransportFactory {
    fn build(&self, settings: &MailSettings) -> Result<Arc<dyn Transport>, InvalidConfiguration> {
        TransportFactory::build(self, settings)
    }
}

impl std::fmt::Debug for TransportFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut registered: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        registered.sort_unstable();
        f.debug_struct("TransportFactory")
            .field("registered", &registered)
            .field("observers", &self.observers.len())
            .finish()
    }
}
