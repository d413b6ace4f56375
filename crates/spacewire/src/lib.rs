#![warn(missing_docs)]

//! Spacewire: a small public API facade for the workspace.
//!
//! This crate re-exports the pieces most applications need to talk to a database
//! over the BSATN sync protocol:
//!
//! - The connection engine and its states (`ConnectionEngine`, `ConnectionState`)
//! - The transport seam the application implements (`Transport`, `TransportObserver`)
//! - Messages and domain types (`ClientMessage`, `ServerMessage`, `Identity`, ...)
//! - Configuration (`ConnectionConfig`, `Compression`)
//!
//! Example
//! ```ignore
//! use spacewire::prelude::*;
//!
//! let config = ConnectionConfig::new("ws://localhost:3000", "quickstart-chat");
//! let mut engine = ConnectionEngine::new(config);
//! engine.on_connect(|identity, _token| println!("connected as {}", identity));
//! engine.connect(MyWebSocket::default())?;
//!
//! engine.call_reducer("say_hello", Vec::new())?;
//! loop {
//!     engine.pump(|message| println!("received {}", message.kind()));
//! }
//! ```

// Core: configuration, errors, transport seam
pub use spacewire_core::{
    config::{Compression, ConnectionConfig},
    error::{DecodingErrorKind, ErrorKind, Result},
    transport::{ConnectRequest, Transport, TransportObserver},
};
// Client: the engine
pub use spacewire_client::{ConnectionEngine, ConnectionState};
// Codec: messages and domain types
pub use spacewire_sats::{
    compress_frame, decompress_frame, message, BinaryBuffer, BinaryCursor, Bsatn, ClientMessage,
    ConnectionId, Identity, QueryId, ServerMessage, TimeDuration, Timestamp, I128, I256, U128, U256,
};

/// Convenience prelude with the most commonly used items.
pub mod prelude {
    pub use crate::{
        Bsatn, ClientMessage, Compression, ConnectRequest, ConnectionConfig, ConnectionEngine,
        ConnectionId, ConnectionState, Identity, ServerMessage, Transport, TransportObserver,
    };
}
