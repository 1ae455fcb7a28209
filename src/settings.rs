//! Mail settings and where they come from.
//!
//! [`MailSettings`] is a flat string-to-string map, the same shape the
//! settings have in a config file or the environment. The factory reads the
//! keys listed in [`keys`]; anything else is carried along untouched so
//! custom transports can read their own options.
//!
//! A [`ConfigProvider`] supplies the process-wide defaults a
//! [`Mailer`](crate::Mailer) falls back to when no settings were injected.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;

/// Setting keys understood by the built-in transports.
pub mod keys {
    /// `smtp`, `sendmail`, `mbox`, `null` or a registered transport identifier.
    pub const TRANSPORT: &str = "transport";
    /// `host` or `host:port`.
    pub const SMTP_SERVER: &str = "transport_smtp_server";
    /// Truthy for implicit TLS; otherwise STARTTLS is used when offered.
    pub const SMTP_ENCRYPT: &str = "transport_smtp_encrypt";
    pub const SMTP_USERNAME: &str = "transport_smtp_username";
    pub const SMTP_PASSWORD: &str = "transport_smtp_password";
    pub const SENDMAIL_COMMAND: &str = "transport_sendmail_command";
    pub const MBOX_FILE: &str = "transport_mbox_file";
    /// `""`, `memory` or `file`.
    pub const SPOOL: &str = "spool";
    /// Directory for the `file` spool.
    pub const SPOOL_FILEPATH: &str = "transport_spool_filepath";
    pub const DEFAULT_FROM_ADDRESS: &str = "default_mail_from_address";
    pub const DEFAULT_FROM_NAME: &str = "default_mail_from_name";

    /// Every key above, in declaration order.
    pub const ALL: &[&str] = &[
        TRANSPORT,
        SMTP_SERVER,
        SMTP_ENCRYPT,
        SMTP_USERNAME,
        SMTP_PASSWORD,
        SENDMAIL_COMMAND,
        MBOX_FILE,
        SPOOL,
        SPOOL_FILEPATH,
        DEFAULT_FROM_ADDRESS,
        DEFAULT_FROM_NAME,
    ];
}

/// Flat mail configuration map.
///
/// ```
/// use conveyor::MailSettings;
///
/// let settings = MailSettings::new()
///     .set("transport", "smtp")
///     .set("transport_smtp_server", "mail.example.com:587");
///
/// assert_eq!(settings.get("transport"), Some("smtp"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MailSettings(BTreeMap<String, String>);

impl MailSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Like [`get`](Self::get), but an empty or blank value counts as absent.
    pub fn get_non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).map(str::trim).filter(|v| !v.is_empty())
    }

    /// `1`, `true`, `yes` and `on` (any case) are truthy.
    pub fn is_enabled(&self, key: &str) -> bool {
        matches!(
            self.get_non_empty(key).map(str::to_ascii_lowercase).as_deref(),
            Some("1" | "true" | "yes" | "on")
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MailSettings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for MailSettings {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

/// Source of the process-wide default mail settings.
///
/// Consulted by [`Mailer`](crate::Mailer) only when no settings were
/// injected. Implemented for [`MailSettings`] (a fixed table), for
/// [`EnvConfigProvider`], and for closures returning settings.
pub trait ConfigProvider: Send + Sync {
    fn mail_settings(&self) -> MailSettings;
}

impl ConfigProvider for MailSettings {
    fn mail_settings(&self) -> MailSettings {
        self.clone()
    }
}

impl<F> ConfigProvider for F
where
    F: Fn() -> MailSettings + Send + Sync,
{
    fn mail_settings(&self) -> MailSettings {
        (self)()
    }
}

/// Reads mail settings from environment variables.
///
/// Each key in [`keys::ALL`] maps to the upper-cased key with a prefix,
/// `MAIL_` by default:
///
/// | Variable | Key |
/// |----------|-----|
/// | `MAIL_TRANSPORT` | `transport` |
/// | `MAIL_TRANSPORT_SMTP_SERVER` | `transport_smtp_server` |
/// | `MAIL_TRANSPORT_SENDMAIL_COMMAND` | `transport_sendmail_command` |
/// | `MAIL_TRANSPORT_MBOX_FILE` | `transport_mbox_file` |
/// | `MAIL_SPOOL` | `spool` |
///
/// Any other variable with the prefix is read too, its remainder
/// lower-cased, so registered transports can take their own options
/// (`MAIL_WEBHOOK_URL` becomes `webhook_url`). Unset variables are left out
/// of the map.
#[derive(Debug, Clone)]
pub struct EnvConfigProvider {
    prefix: String,
}

impl EnvConfigProvider {
    pub fn new() -> Self {
        Self::with_prefix("MAIL_")
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn var_name(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key.to_ascii_uppercase())
    }

    fn key_name(&self, var: &str) -> Option<String> {
        var.strip_prefix(&self.prefix)
            .filter(|rest| !rest.is_empty())
            .map(str::to_ascii_lowercase)
    }
}

impl Default for EnvConfigProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigProvider for EnvConfigProvider {
    fn mail_settings(&self) -> MailSettings {
        let mut settings: MailSettings = keys::ALL
            .iter()
            .filter_map(|key| env::var(self.var_name(key)).ok().map(|v| (*key, v)))
            .collect();

        for (var, value) in env::vars_os() {
            let (Some(var), Some(value)) = (var.to_str(), value.to_str()) else {
                continue;
            };
            if let Some(key) = self.key_name(var) {
                settings.insert(key, value);
            }
        }

        settings
    }
}
