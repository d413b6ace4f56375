#![warn(missing_docs)]

//! spacewire-sats: the BSATN binary encoding and the message model built on it.

/// Encode/decode contract shared by wire types.
pub mod bsatn;
/// Frame compression tags and gzip handling.
pub mod compression;
/// 128-bit and 256-bit integers.
pub mod int;
/// Client and server messages.
pub mod message;
/// Bounds-checked reader.
pub mod reader;
/// Domain scalars: timestamps, durations, identities, connection ids.
pub mod types;
/// Growable writer.
pub mod writer;

pub use bsatn::Bsatn;
pub use compression::{compress_frame, decompress_frame};
pub use int::{I128, I256, U128, U256};
pub use message::{ClientMessage, QueryId, ServerMessage};
pub use reader::BinaryCursor;
pub use types::{ConnectionId, Identity, TimeDuration, Timestamp};
pub use writer::BinaryBuffer;
