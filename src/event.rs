//! Notifications emitted while transports are built.
//!
//! Observers are told about every transport the factory creates. They see
//! the transport and the settings it was built from but cannot swap either.
//!
//! ```rust,ignore
//! use conveyor::{TransportCreated, TransportFactory};
//!
//! let factory = TransportFactory::new().with_observer(|event: &TransportCreated<'_>| {
//!     println!("mail goes through {}", event.transport().name());
//! });
//! ```

use crate::settings::MailSettings;
use crate::transport::Transport;

/// A base transport was constructed.
///
/// Emitted before any spool decoration, so [`transport`](Self::transport) is
/// always the real transport.
pub struct TransportCreated<'a> {
    settings: &'a MailSettings,
    transport: &'a (dyn Transport + 'static),
}

impl<'a> TransportCreated<'a> {
    pub(crate) fn new(settings: &'a MailSettings, transport: &'a (dyn Transport + 'static)) -> Self {
        Self {
            settings,
            transport,
        }
    }

    pub fn settings(&self) -> &MailSettings {
        self.settings
    }

    pub fn transport(&self) -> &(dyn Transport + 'static) {
        self.transport
    }
}

/// Receives [`TransportCreated`] events.
pub trait TransportObserver: Send + Sync {
    fn transport_created(&self, event: &TransportCreated<'_>);
}

/// Blanket implementation for closures.
impl<F> TransportObserver for F
where
    F: Fn(&TransportCreated<'_>) + Send + Sync,
{
    fn transport_created(&self, event: &TransportCreated<'_>) {
        (self)(event)
    }
}
