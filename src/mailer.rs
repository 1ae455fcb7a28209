//! The mailer: settings in, transport out, emails through.
//!
//! A [`Mailer`] resolves its settings once, builds its transport once, and
//! keeps both for its lifetime. Settings come from one of two places:
//!
//! 1. settings injected on the [`MailerBuilder`], used verbatim;
//! 2. otherwise the [`ConfigProvider`] (by default the `MAIL_*` environment).
//!
//! The two are never merged. Injected settings replace the provider's
//! settings entirely.
//!
//! ```rust,ignore
//! use conveyor::{Email, MailSettings, Mailer};
//!
//! let mailer = Mailer::builder()
//!     .inject_settings(
//!         MailSettings::new()
//!             .set("transport", "smtp")
//!             .set("transport_smtp_server", "mail.example.com:587"),
//!     )
//!     .build()?;
//!
//! mailer.deliver(&Email::new().from("app@example.com").to("user@example.com")).await?;
//! ```

use std::sync::Arc;
use tracing::Instrument;

#[cfg(feature = "metrics")]
use std::time::Instant;

use crate::address::Address;
use crate::email::Email;
use crate::error::{InvalidConfiguration, MailError};
use crate::factory::{TransportBuilder, TransportFactory};
use crate::settings::{keys, ConfigProvider, EnvConfigProvider, MailSettings};
use crate::transport::{DeliveryResult, Transport};

/// Collects a mailer's collaborators and settings before it is built.
#[derive(Default)]
pub struct MailerBuilder {
    factory: Option<Arc<dyn TransportBuilder>>,
    config: Option<Arc<dyn ConfigProvider>>,
    settings: Option<MailSettings>,
}

impl MailerBuilder {
    /// Transport builder to use. Defaults to [`TransportFactory::new`].
    pub fn factory(mut self, factory: impl TransportBuilder + 'static) -> Self {
        self.factory = Some(Arc::new(factory));
        self
    }

    /// Share a transport builder between mailers.
    pub fn factory_arc(mut self, factory: Arc<dyn TransportBuilder>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Where to read settings when none are injected. Defaults to
    /// [`EnvConfigProvider`].
    pub fn config_provider(mut self, provider: impl ConfigProvider + 'static) -> Self {
        self.config = Some(Arc::new(provider));
        self
    }

    /// Use exactly these settings, ignoring the config provider.
    pub fn inject_settings(mut self, settings: MailSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Resolve the settings and build the transport.
    ///
    /// On failure no mailer exists; the error is meant to stop startup.
    pub fn build(self) -> Result<Mailer, InvalidConfiguration> {
        let factory = self
            .factory
            .unwrap_or_else(|| Arc::new(TransportFactory::new()));
        let config = self
            .config
            .unwrap_or_else(|| Arc::new(EnvConfigProvider::new()));

        let settings = resolve_settings(self.settings.as_ref(), config.as_ref());
        let transport = factory.build(&settings)?;

        Ok(Mailer {
            factory,
            config,
            injected: self.settings,
            settings,
            transport,
        })
    }
}

fn resolve_settings(injected: Option<&MailSettings>, config: &dyn ConfigProvider) -> MailSettings {
    match injected {
        Some(settings) => {
            tracing::debug!(source = "injected", "Resolved mail settings");
            settings.clone()
        }
        None => {
            tracing::debug!(source = "provider", "Resolved mail settings");
            config.mail_settings()
        }
    }
}

/// Owns the resolved settings and transport of one mail-sending context.
pub struct Mailer {
    factory: Arc<dyn TransportBuilder>,
    config: Arc<dyn ConfigProvider>,
    injected: Option<MailSettings>,
    settings: MailSettings,
    transport: Arc<dyn Transport>,
}

impl Mailer {
    pub fn builder() -> MailerBuilder {
        MailerBuilder::default()
    }

    /// Mailer configured from the `MAIL_*` environment variables.
    pub fn from_env() -> Result<Self, InvalidConfiguration> {
        Self::builder().build()
    }

    /// Mailer for the given settings, with the default factory.
    pub fn with_settings(settings: MailSettings) -> Result<Self, InvalidConfiguration> {
        Self::builder().inject_settings(settings).build()
    }

    /// The settings the current transport was built from.
    pub fn settings(&self) -> &MailSettings {
        &self.settings
    }

    /// The transport as built, spool decorator included.
    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.transport)
    }

    /// The transport underneath any spool decorator.
    ///
    /// Identical to [`transport`](Self::transport) when no spool is configured.
    pub fn real_transport(&self) -> Arc<dyn Transport> {
        match self.transport.as_delayed() {
            Some(delayed) => delayed.real_transport(),
            None => self.transport(),
        }
    }

    /// Resolve the settings and build the transport again.
    ///
    /// The new transport replaces the current one only if the build
    /// succeeds; on error the mailer keeps working with what it had.
    /// Emails still spooled on the old transport stay with it.
    pub fn rebuild(&mut self) -> Result<(), InvalidConfiguration> {
        let settings = resolve_settings(self.injected.as_ref(), self.config.as_ref());
        let transport = self.factory.build(&settings)?;

        self.settings = settings;
        self.transport = transport;
        Ok(())
    }

    /// Sender used for emails that have none, from
    /// `default_mail_from_address` and `default_mail_from_name`.
    pub fn default_from(&self) -> Option<Address> {
        let email = self.settings.get_non_empty(keys::DEFAULT_FROM_ADDRESS)?;
        Some(match self.settings.get_non_empty(keys::DEFAULT_FROM_NAME) {
            Some(name) => Address::with_name(name, email),
            None => Address::new(email),
        })
    }

    /// Fill in the default sender and require a sender and at least one
    /// recipient in to, cc or bcc.
    fn prepare(&self, email: &Email) -> Result<Email, MailError> {
        let mut email = email.clone();
        if email.from.is_none() {
            email.from = self.default_from();
        }
        if email.from.is_none() {
            return Err(MailError::MissingField("from"));
        }
        if email.all_recipients().is_empty() {
            return Err(MailError::MissingField("to"));
        }
        Ok(email)
    }

    /// Send an email through the transport.
    ///
    /// With a spool configured the email is only queued; see
    /// [`flush_queue`](Self::flush_queue).
    pub async fn deliver(&self, email: &Email) -> Result<DeliveryResult, MailError> {
        let email = self.prepare(email)?;
        let transport = self.transport.name();

        let span = tracing::info_span!(
            "conveyor.deliver",
            transport = transport,
            to = ?email.to.iter().map(|a| &a.email).collect::<Vec<_>>(),
            subject = %email.subject,
        );

        async {
            tracing::debug!("Delivering email");

            #[cfg(feature = "metrics")]
            let start = Instant::now();

            let result = self.transport.send(&email).await;

            #[cfg(feature = "metrics")]
            {
                let duration = start.elapsed().as_secs_f64();
                let status = match &result {
                    Ok(r) if r.queued => "queued",
                    Ok(_) => "success",
                    Err(_) => "error",
                };
                metrics::counter!("conveyor_emails_total", "transport" => transport, "status" => status)
                    .increment(1);
                metrics::histogram!("conveyor_delivery_duration_seconds", "transport" => transport)
                    .record(duration);
            }

            match &result {
                Ok(r) if r.queued => tracing::info!(queue_id = %r.message_id, "Email spooled"),
                Ok(r) => tracing::info!(message_id = %r.message_id, "Email delivered"),
                Err(e) => tracing::error!(error = %e, "Email delivery failed"),
            }

            result
        }
        .instrument(span)
        .await
    }

    /// Send several emails, validating all of them first.
    pub async fn deliver_many(&self, emails: &[Email]) -> Result<Vec<DeliveryResult>, MailError> {
        let emails = emails
            .iter()
            .map(|e| self.prepare(e))
            .collect::<Result<Vec<_>, _>>()?;

        let span = tracing::info_span!(
            "conveyor.deliver_many",
            transport = self.transport.name(),
            count = emails.len(),
        );

        self.transport.send_many(&emails).instrument(span).await
    }

    /// Send everything on the spool through the real transport.
    ///
    /// Returns how many emails were sent; `0` without a spool.
    pub async fn flush_queue(&self) -> Result<usize, MailError> {
        match self.transport.as_delayed() {
            Some(delayed) => delayed.flush().await,
            None => Ok(0),
        }
    }
}

impl std::fmt::Debug for Mailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mailer")
            .field("transport", &self.transport.name())
            .field("spooled", &self.transport.is_delayed())
            .field("injected", &self.injected.is_some())
            .finish_non_exhaustive()
    }
}
