#![warn(missing_docs)]

//! spacewire-client: threaded connection engine over a pluggable transport.

/// Notification callback types.
pub mod callbacks;
/// The connection engine.
pub mod engine;
/// Connection states and processed events.
pub mod events;
/// Subscribe URL building.
pub mod url;

mod worker;

pub use callbacks::{ConnectCallback, ConnectErrorCallback, DisconnectCallback};
pub use engine::ConnectionEngine;
pub use events::{ConnectionState, EngineEvent};
pub use url::{connect_request, generate_connection_id};
pub use worker::decode_frame;
