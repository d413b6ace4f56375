//! Frame-level compression.
//!
//! Every server frame is `[compression tag][payload]`. The tag, not the mode the
//! client asked for, decides how the payload is handled.

use std::io::{self, Read, Write};

use flate2::{read::GzDecoder, write::GzEncoder};
use spacewire_core::{
    config::Compression,
    error::{ErrorKind, Result},
};
use tracing::warn;

/// Strips the tag byte and inflates the payload if needed.
///
/// - `0`: payload returned unchanged
/// - `1`: gzip-inflated, failing once the output would pass `limit` bytes
/// - anything else: payload returned unchanged, with a warning
pub fn decompress_frame(frame: &[u8], limit: usize) -> Result<Vec<u8>> {
    let Some((&tag, payload)) = frame.split_first() else {
        return Err(ErrorKind::Decompression("empty frame".into()));
    };

    match Compression::try_from(tag) {
        Ok(Compression::None) => Ok(payload.to_vec()),
        Ok(Compression::Gzip) => {
            // Server messages compress well; guess 4x to avoid most regrowth.
            let mut decompressed = Vec::with_capacity(payload.len().saturating_mul(4).min(limit));
            // One byte past the limit tells a frame that fits exactly from one that overflows.
            let read_limit = u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1);
            GzDecoder::new(payload)
                .take(read_limit)
                .read_to_end(&mut decompressed)
                .map_err(|err| ErrorKind::Decompression(err.to_string()))?;
            if decompressed.len() > limit {
                return Err(ErrorKind::Decompression("inflated frame exceeds limit".into()));
            }
            decompressed.shrink_to_fit();
            Ok(decompressed)
        }
        Err(_) => {
            warn!("Unknown compression tag {}, passing frame through", tag);
            Ok(payload.to_vec())
        }
    }
}

/// Builds a frame: the tag byte for `compression`, then the (possibly compressed)
/// payload.
pub fn compress_frame(payload: &[u8], compression: Compression) -> io::Result<Vec<u8>> {
    match compression {
        Compression::None => {
            let mut output = Vec::with_capacity(payload.len() + 1);
            output.push(Compression::None.tag());
            output.extend_from_slice(payload);
            Ok(output)
        }
        Compression::Gzip => {
            let mut output = Vec::with_capacity(payload.len() / 2 + 1);
            output.push(Compression::Gzip.tag());
            let mut encoder = GzEncoder::new(output, flate2::Compression::default());
            encoder.write_all(payload)?;
            encoder.finish()
        }
    }
}
