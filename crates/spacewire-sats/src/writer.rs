//! BSATN writer, the mirror of [`BinaryCursor`](crate::reader::BinaryCursor).

use byteorder::{ByteOrder, LittleEndian};

use crate::{
    int::{I128, I256, U128, U256},
    types::{ConnectionId, Identity, TimeDuration, Timestamp},
};

/// Growable little-endian byte buffer with a write position.
///
/// Writes land at the current position and overwrite whatever is there, growing the
/// buffer as needed. Moving the position past the end zero-fills the gap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BinaryBuffer {
    buffer: Vec<u8>,
    position: usize,
}

impl BinaryBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty buffer with room for `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self { buffer: Vec::with_capacity(capacity), position: 0 }
    }

    /// Current write offset.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Moves the write offset, zero-filling if it lies past the end.
    pub fn set_position(&mut self, position: usize) {
        if position > self.buffer.len() {
            self.buffer.resize(position, 0);
        }
        self.position = position;
    }

    /// Clears the buffer and rewinds to the start, keeping the allocation.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.position = 0;
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns true if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Borrows the written bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Consumes the buffer, returning the written bytes.
    pub fn into_inner(self) -> Vec<u8> {
        self.buffer
    }

    /// Reserves `count` bytes at the position and returns them for writing.
    fn claim(&mut self, count: usize) -> &mut [u8] {
        let start = self.position;
        let end = start + count;
        if end > self.buffer.len() {
            self.buffer.resize(end, 0);
        }
        self.position = end;
        &mut self.buffer[start..end]
    }

    /// Writes raw bytes without a length prefix.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.claim(bytes.len()).copy_from_slice(bytes);
    }

    /// Writes a boolean as a single `0`/`1` byte.
    pub fn write_bool(&mut self, value: bool) {
        self.write_u8(value as u8);
    }

    /// Writes an unsigned byte.
    pub fn write_u8(&mut self, value: u8) {
        self.claim(1)[0] = value;
    }

    /// Writes a signed byte.
    pub fn write_i8(&mut self, value: i8) {
        self.write_u8(value as u8);
    }

    /// Writes a little-endian `u16`.
    pub fn write_u16(&mut self, value: u16) {
        LittleEndian::write_u16(self.claim(2), value);
    }

    /// Writes a little-endian `i16`.
    pub fn write_i16(&mut self, value: i16) {
        LittleEndian::write_i16(self.claim(2), value);
    }

    /// Writes a little-endian `u32`.
    pub fn write_u32(&mut self, value: u32) {
        LittleEndian::write_u32(self.claim(4), value);
    }

    /// Writes a little-endian `i32`.
    pub fn write_i32(&mut self, value: i32) {
        LittleEndian::write_i32(self.claim(4), value);
    }

    /// Writes a little-endian `u64`.
    pub fn write_u64(&mut self, value: u64) {
        LittleEndian::write_u64(self.claim(8), value);
    }

    /// Writes a little-endian `i64`.
    pub fn write_i64(&mut self, value: i64) {
        LittleEndian::write_i64(self.claim(8), value);
    }

    /// Writes an `f32` through its `u32` bit pattern.
    pub fn write_f32(&mut self, value: f32) {
        self.write_u32(value.to_bits());
    }

    /// Writes an `f64` through its `u64` bit pattern.
    pub fn write_f64(&mut self, value: f64) {
        self.write_u64(value.to_bits());
    }

    /// Writes an unsigned 128-bit value: upper half, then lower half.
    pub fn write_u128(&mut self, value: U128) {
        self.write_u64(value.upper());
        self.write_u64(value.lower());
    }

    /// Writes a signed 128-bit value: upper half, then lower half.
    pub fn write_i128(&mut self, value: I128) {
        self.write_u64(value.upper());
        self.write_u64(value.lower());
    }

    /// Writes an unsigned 256-bit value: upper 128 bits, then lower 128 bits.
    pub fn write_u256(&mut self, value: U256) {
        self.write_u128(value.upper());
        self.write_u128(value.lower());
    }

    /// Writes a signed 256-bit value: upper 128 bits, then lower 128 bits.
    pub fn write_i256(&mut self, value: I256) {
        self.write_i128(value.upper());
        self.write_u128(value.lower());
    }

    fn write_len(&mut self, len: usize) {
        debug_assert!(len <= i32::MAX as usize, "length prefix overflow");
        self.write_i32(len as i32);
    }

    /// Writes a length-prefixed UTF-8 string.
    pub fn write_string(&mut self, value: &str) {
        self.write_len(value.len());
        self.write_bytes(value.as_bytes());
    }

    /// Writes a presence byte, then the value if there is one.
    pub fn write_option<T, F>(&mut self, value: Option<&T>, write: F)
    where
        T: ?Sized,
        F: FnOnce(&mut Self, &T),
    {
        match value {
            Some(value) => {
                self.write_bool(true);
                write(self, value);
            }
            None => self.write_bool(false),
        }
    }

    /// Writes a length-prefixed array, encoding each element with `write`.
    pub fn write_array<T, F>(&mut self, items: &[T], mut write: F)
    where
        F: FnMut(&mut Self, &T),
    {
        self.write_len(items.len());
        for item in items {
            write(self, item);
        }
    }

    /// Writes a length-prefixed byte array.
    pub fn write_byte_array(&mut self, bytes: &[u8]) {
        self.write_len(bytes.len());
        self.write_bytes(bytes);
    }

    /// Writes a length-prefixed array of strings.
    pub fn write_string_array(&mut self, items: &[String]) {
        self.write_array(items, |buffer, item| buffer.write_string(item));
    }

    /// Writes an optional string.
    pub fn write_optional_string(&mut self, value: Option<&str>) {
        self.write_option(value, Self::write_string);
    }

    /// Writes an optional `u32`.
    pub fn write_optional_u32(&mut self, value: Option<u32>) {
        self.write_option(value.as_ref(), |buffer, value| buffer.write_u32(*value));
    }

    /// Writes a timestamp as microseconds since the Unix epoch.
    pub fn write_timestamp(&mut self, value: Timestamp) {
        self.write_i64(value.as_micros());
    }

    /// Writes a duration as microseconds.
    pub fn write_duration(&mut self, value: TimeDuration) {
        self.write_i64(value.as_micros());
    }

    /// Writes a connection id.
    pub fn write_connection_id(&mut self, value: ConnectionId) {
        self.write_u128(value.value());
    }

    /// Writes an identity.
    pub fn write_identity(&mut self, value: Identity) {
        self.write_u256(value.value());
    }
}

impl From<BinaryBuffer> for Vec<u8> {
    fn from(buffer: BinaryBuffer) -> Self {
        buffer.into_inner()
    }
}
