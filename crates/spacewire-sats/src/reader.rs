//! Bounds-checked BSATN reader.
//!
//! Every read advances the cursor by exactly the encoded width. A read that needs
//! more bytes than remain fails with [`ErrorKind::OutOfData`] and leaves the
//! position untouched, so the caller can abandon the message cleanly.

use std::borrow::Cow;

use byteorder::{ByteOrder, LittleEndian};
use spacewire_core::error::{ErrorKind, Result};

use crate::{
    int::{I128, I256, U128, U256},
    types::{ConnectionId, Identity, TimeDuration, Timestamp},
};

/// Position-tracked reader over an owned or borrowed byte buffer.
#[derive(Debug, Clone)]
pub struct BinaryCursor<'a> {
    data: Cow<'a, [u8]>,
    position: usize,
}

impl<'a> BinaryCursor<'a> {
    /// Creates a cursor borrowing `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data: Cow::Borrowed(data), position: 0 }
    }

    /// Creates a cursor that owns `data`.
    pub fn from_vec(data: Vec<u8>) -> BinaryCursor<'static> {
        BinaryCursor { data: Cow::Owned(data), position: 0 }
    }

    /// Current offset from the start of the buffer.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Moves the cursor. `position == len()` is allowed (end of data).
    pub fn set_position(&mut self, position: usize) -> Result<()> {
        if position > self.data.len() {
            return Err(ErrorKind::InvalidPosition { position, len: self.data.len() });
        }
        self.position = position;
        Ok(())
    }

    /// Total buffer length.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    fn take(&mut self, count: usize) -> Result<&[u8]> {
        if count > self.remaining() {
            return Err(ErrorKind::OutOfData {
                position: self.position,
                requested: count,
                remaining: self.remaining(),
            });
        }
        let start = self.position;
        self.position += count;
        debug_assert!(self.position <= self.data.len());
        Ok(&self.data[start..self.position])
    }

    /// Reads `count` raw bytes.
    pub fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>> {
        Ok(self.take(count)?.to_vec())
    }

    /// Reads a single byte; any nonzero value is `true`.
    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    /// Reads an unsigned byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    /// Reads a signed byte.
    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    /// Reads a little-endian `u16`.
    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.take(2)?))
    }

    /// Reads a little-endian `i16`.
    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(LittleEndian::read_i16(self.take(2)?))
    }

    /// Reads a little-endian `u32`.
    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    /// Reads a little-endian `i32`.
    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(LittleEndian::read_i32(self.take(4)?))
    }

    /// Reads a little-endian `u64`.
    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(LittleEndian::read_u64(self.take(8)?))
    }

    /// Reads a little-endian `i64`.
    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(LittleEndian::read_i64(self.take(8)?))
    }

    /// Reads an `f32` from its little-endian bit pattern.
    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    /// Reads an `f64` from its little-endian bit pattern.
    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_bits(self.read_u64()?))
    }

    /// Reads an unsigned 128-bit value: upper half, then lower half.
    pub fn read_u128(&mut self) -> Result<U128> {
        self.ensure_remaining(16)?;
        let upper = self.read_u64()?;
        let lower = self.read_u64()?;
        Ok(U128::new(upper, lower))
    }

    /// Reads a signed 128-bit value: upper half, then lower half.
    pub fn read_i128(&mut self) -> Result<I128> {
        self.ensure_remaining(16)?;
        let upper = self.read_u64()?;
        let lower = self.read_u64()?;
        Ok(I128::new(upper, lower))
    }

    /// Reads an unsigned 256-bit value: upper 128 bits, then lower 128 bits.
    pub fn read_u256(&mut self) -> Result<U256> {
        self.ensure_remaining(32)?;
        let upper = self.read_u128()?;
        let lower = self.read_u128()?;
        Ok(U256::new(upper, lower))
    }

    /// Reads a signed 256-bit value: upper 128 bits, then lower 128 bits.
    pub fn read_i256(&mut self) -> Result<I256> {
        self.ensure_remaining(32)?;
        let upper = self.read_i128()?;
        let lower = self.read_u128()?;
        Ok(I256::new(upper, lower))
    }

    /// Reads an `i32` length prefix. Negative lengths mean "empty".
    fn read_len(&mut self) -> Result<usize> {
        let len = self.read_i32()?;
        Ok(if len < 0 { 0 } else { len as usize })
    }

    /// Reads a length-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_len()?;
        let bytes = self.take(len)?;
        std::str::from_utf8(bytes).map(str::to_owned).map_err(|_| ErrorKind::InvalidUtf8)
    }

    /// Reads a presence byte followed by the value if it is nonzero.
    pub fn read_option<T, F>(&mut self, read: F) -> Result<Option<T>>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        if self.read_bool()? {
            read(self).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Reads a length-prefixed array, decoding each element with `read`.
    pub fn read_array<T, F>(&mut self, mut read: F) -> Result<Vec<T>>
    where
        F: FnMut(&mut Self) -> Result<T>,
    {
        let len = self.read_len()?;
        // Each element takes at least one byte, so a bogus length cannot over-reserve.
        let mut items = Vec::with_capacity(len.min(self.remaining()));
        for _ in 0..len {
            items.push(read(self)?);
        }
        Ok(items)
    }

    /// Reads a length-prefixed byte array.
    pub fn read_byte_array(&mut self) -> Result<Vec<u8>> {
        let len = self.read_len()?;
        self.read_bytes(len)
    }

    /// Reads a length-prefixed array of strings.
    pub fn read_string_array(&mut self) -> Result<Vec<String>> {
        self.read_array(Self::read_string)
    }

    /// Reads an optional string.
    pub fn read_optional_string(&mut self) -> Result<Option<String>> {
        self.read_option(Self::read_string)
    }

    /// Reads an optional `u32`.
    pub fn read_optional_u32(&mut self) -> Result<Option<u32>> {
        self.read_option(Self::read_u32)
    }

    /// Reads a timestamp (microseconds since the Unix epoch).
    pub fn read_timestamp(&mut self) -> Result<Timestamp> {
        Ok(Timestamp::from_micros(self.read_i64()?))
    }

    /// Reads a duration in microseconds.
    pub fn read_duration(&mut self) -> Result<TimeDuration> {
        Ok(TimeDuration::from_micros(self.read_i64()?))
    }

    /// Reads a 128-bit connection id.
    pub fn read_connection_id(&mut self) -> Result<ConnectionId> {
        Ok(ConnectionId::new(self.read_u128()?))
    }

    /// Reads a 256-bit identity.
    pub fn read_identity(&mut self) -> Result<Identity> {
        Ok(Identity::new(self.read_u256()?))
    }

    fn ensure_remaining(&self, count: usize) -> Result<()> {
        if count > self.remaining() {
            Err(ErrorKind::OutOfData {
                position: self.position,
                requested: count,
                remaining: self.remaining(),
            })
        } else {
            Ok(())
        }
    }
}
