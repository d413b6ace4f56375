#![warn(missing_docs)]

//! spacewire-core: foundational types shared by every layer.
//!
//! This crate provides the minimal set of pieces the codec and the engine agree on:
//! - Configuration types
//! - Error handling
//! - Protocol constants
//! - The transport collaborator trait and its observer handle
//!
//! Wire encoding lives in `spacewire-sats`; the threaded connection engine lives in
//! `spacewire-client`.

/// Protocol constants shared across layers.
pub mod constants {
    use std::time::Duration;

    /// Largest inbound frame the engine accepts (64 MiB).
    pub const MAX_MESSAGE_SIZE: usize = 0x400_0000;
    /// How long the worker waits for the transport to report the handshake outcome.
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
    /// Periodic worker wake when nothing signals it earlier.
    pub const WAKE_INTERVAL: Duration = Duration::from_millis(50);
    /// Close code used for a client-initiated shutdown.
    pub const CLOSE_NORMAL: u16 = 1000;
    /// Close code used when the peer sent a frame over `MAX_MESSAGE_SIZE`.
    pub const CLOSE_TOO_BIG: u16 = 1013;
    /// Websocket sub-protocol negotiated for binary BSATN messages.
    pub const BSATN_PROTOCOL: &str = "v1.bsatn.spacetimedb";
    /// Default server address.
    pub const DEFAULT_HOST: &str = "ws://127.0.0.1:3000";
}

/// Connection configuration.
pub mod config;
/// Error types and results.
pub mod error;
/// Transport abstraction the engine drives.
pub mod transport;
