//! Application notification slots.

use std::fmt;

use spacewire_sats::Identity;

/// Invoked with the assigned identity and token.
pub type ConnectCallback = Box<dyn FnMut(&Identity, &str) + Send>;
/// Invoked with the reason a connect attempt failed.
pub type ConnectErrorCallback = Box<dyn FnMut(&str) + Send>;
/// Invoked with the close reason (empty for a clean close).
pub type DisconnectCallback = Box<dyn FnMut(&str) + Send>;

/// One slot per notification. Only ever touched from the application thread.
#[derive(Default)]
pub(crate) struct Callbacks {
    connect: Option<ConnectCallback>,
    connect_error: Option<ConnectErrorCallback>,
    disconnect: Option<DisconnectCallback>,
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("connect", &self.connect.is_some())
            .field("connect_error", &self.connect_error.is_some())
            .field("disconnect", &self.disconnect.is_some())
            .finish()
    }
}

impl Callbacks {
    pub(crate) fn set_connect(&mut self, callback: ConnectCallback) {
        self.connect = Some(callback);
    }

    pub(crate) fn set_connect_error(&mut self, callback: ConnectErrorCallback) {
        self.connect_error = Some(callback);
    }

    pub(crate) fn set_disconnect(&mut self, callback: DisconnectCallback) {
        self.disconnect = Some(callback);
    }

    pub(crate) fn connected(&mut self, identity: &Identity, token: &str) {
        if let Some(callback) = self.connect.as_mut() {
            callback(identity, token);
        }
    }

    pub(crate) fn connect_failed(&mut self, reason: &str) {
        if let Some(callback) = self.connect_error.as_mut() {
            callback(reason);
        }
    }

    pub(crate) fn disconnected(&mut self, reason: &str) {
        if let Some(callback) = self.disconnect.as_mut() {
            callback(reason);
        }
    }

    /// Drops every registered callback.
    pub(crate) fn clear(&mut self) {
        *self = Self::default();
    }
}
