use std::{fmt, io, result};

use thiserror::Error;

/// Wrapped result type for spacewire operations.
pub type Result<T> = result::Result<T, ErrorKind>;

/// Enum with all possible errors that could occur in spacewire.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// A tagged union carried a discriminant this client does not know.
    #[error("decoding error: {0}")]
    DecodingError(DecodingErrorKind),
    /// A read requested more bytes than remain in the buffer.
    #[error(
        "attempted to read {requested} bytes at position {position} with only {remaining} remaining"
    )]
    OutOfData {
        /// Cursor position at the failed read.
        position: usize,
        /// Bytes the read needed.
        requested: usize,
        /// Bytes left in the buffer.
        remaining: usize,
    },
    /// A length-prefixed string was not valid UTF-8.
    #[error("string payload is not valid UTF-8")]
    InvalidUtf8,
    /// A cursor was moved outside its buffer.
    #[error("position {position} is outside a buffer of {len} bytes")]
    InvalidPosition {
        /// Requested position.
        position: usize,
        /// Buffer length.
        len: usize,
    },
    /// A compressed frame could not be inflated.
    #[error("decompression failed: {0}")]
    Decompression(String),
    /// Wrapper around a std io::Error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    /// The transport did not report the handshake outcome in time.
    #[error("websocket connect timed out")]
    ConnectTimeout,
    /// The transport reported a handshake failure.
    #[error("connect failed: {0}")]
    ConnectFailed(String),
    /// An operation was attempted in the wrong connection state.
    #[error("operation requires state {expected}, engine is {actual}")]
    InvalidState {
        /// State the operation requires.
        expected: &'static str,
        /// State the engine is in.
        actual: &'static str,
    },
    /// The worker thread has exited and no longer accepts messages.
    #[error("connection engine is stopped")]
    EngineStopped,
}

/// Identifies which tagged union failed to decode.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum DecodingErrorKind {
    /// Unknown `ClientMessage` discriminant.
    ClientMessage(u8),
    /// Unknown `ServerMessage` discriminant.
    ServerMessage(u8),
    /// Unknown `RowSizeHint` discriminant.
    RowSizeHint(u8),
    /// Unknown `CompressableQueryUpdate` discriminant.
    CompressableQueryUpdate(u8),
    /// Unknown `UpdateStatus` discriminant.
    UpdateStatus(u8),
    /// Unknown frame compression tag.
    Compression(u8),
}

impl DecodingErrorKind {
    /// Returns the discriminant that failed to decode.
    pub fn tag(&self) -> u8 {
        match *self {
            DecodingErrorKind::ClientMessage(tag)
            | DecodingErrorKind::ServerMessage(tag)
            | DecodingErrorKind::RowSizeHint(tag)
            | DecodingErrorKind::CompressableQueryUpdate(tag)
            | DecodingErrorKind::UpdateStatus(tag)
            | DecodingErrorKind::Compression(tag) => tag,
        }
    }
}

impl fmt::Display for DecodingErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let union = match self {
            DecodingErrorKind::ClientMessage(_) => "ClientMessage",
            DecodingErrorKind::ServerMessage(_) => "ServerMessage",
            DecodingErrorKind::RowSizeHint(_) => "RowSizeHint",
            DecodingErrorKind::CompressableQueryUpdate(_) => "CompressableQueryUpdate",
            DecodingErrorKind::UpdateStatus(_) => "UpdateStatus",
            DecodingErrorKind::Compression(_) => "Compression",
        };
        write!(f, "unknown {} discriminant {}", union, self.tag())
    }
}

impl From<DecodingErrorKind> for ErrorKind {
    fn from(inner: DecodingErrorKind) -> Self {
        ErrorKind::DecodingError(inner)
    }
}
