use std::{default::Default, fmt, time::Duration};

use crate::{
    constants::{BSATN_PROTOCOL, CONNECT_TIMEOUT, DEFAULT_HOST, MAX_MESSAGE_SIZE, WAKE_INTERVAL},
    error::{DecodingErrorKind, ErrorKind},
};

/// Compression mode of a server frame.
///
/// The discriminant is the tag byte that prefixes every inbound frame.
#[derive(Clone, Debug, Copy, PartialEq, Eq, Hash, Default)]
pub enum Compression {
    /// Frame payload is the raw encoded message.
    #[default]
    None = 0,
    /// Frame payload is gzip-compressed.
    Gzip = 1,
}

impl Compression {
    /// Returns the tag byte written in front of a frame.
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Returns the value used for the `compression` query parameter.
    pub fn as_query_value(self) -> &'static str {
        match self {
            Compression::None => "None",
            Compression::Gzip => "Gzip",
        }
    }
}

impl TryFrom<u8> for Compression {
    type Error = ErrorKind;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Compression::None),
            1 => Ok(Compression::Gzip),
            tag => Err(ErrorKind::DecodingError(DecodingErrorKind::Compression(tag))),
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_query_value())
    }
}

#[derive(Clone, Debug)]
/// Parameters the embedding application supplies for one connection.
pub struct ConnectionConfig {
    /// Scheme and authority prefix, e.g. `ws://localhost:3000`.
    pub host: String,
    /// Module name or address to subscribe to.
    pub module_name: String,
    /// Bearer token sent in the `Authorization` header. Empty tokens are not sent.
    pub token: Option<String>,
    /// Compression mode requested from the server.
    pub compression: Compression,
    /// Request light transaction updates.
    pub light: bool,
    /// Websocket sub-protocol handed to the transport.
    pub protocol: String,
    /// Upper bound on the synchronous handshake wait.
    pub connect_timeout: Duration,
    /// Worker wake period when no explicit signal arrives.
    pub wake_interval: Duration,
    /// Inbound frames larger than this close the transport.
    pub max_message_size: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            module_name: String::new(),
            token: None,
            compression: Compression::None,
            light: false,
            protocol: BSATN_PROTOCOL.to_string(),
            connect_timeout: CONNECT_TIMEOUT,
            wake_interval: WAKE_INTERVAL,
            max_message_size: MAX_MESSAGE_SIZE,
        }
    }
}

impl ConnectionConfig {
    /// Creates a configuration for `module_name` on `host` with default settings.
    pub fn new(host: impl Into<String>, module_name: impl Into<String>) -> Self {
        Self { host: host.into(), module_name: module_name.into(), ..Self::default() }
    }

    /// Sets the server host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the module name or address.
    pub fn with_module_name(mut self, module_name: impl Into<String>) -> Self {
        self.module_name = module_name.into();
        self
    }

    /// Sets the bearer token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Sets the requested compression mode.
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Enables or disables light mode.
    pub fn with_light(mut self, light: bool) -> Self {
        self.light = light;
        self
    }

    /// Overrides the handshake timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Overrides the worker wake interval.
    pub fn with_wake_interval(mut self, interval: Duration) -> Self {
        self.wake_interval = interval;
        self
    }

    /// Overrides the inbound frame cap.
    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    /// Returns the bearer token if one is set and non-empty.
    pub fn bearer_token(&self) -> Option<&str> {
        self.token.as_deref().filter(|token| !token.is_empty())
    }
}
