//! The encode/decode contract shared by every wire type.

use spacewire_core::error::Result;

use crate::{reader::BinaryCursor, writer::BinaryBuffer};

/// A type with a fixed BSATN layout.
///
/// `decode` must read exactly the bytes `encode` writes, in the same field order.
pub trait Bsatn: Sized {
    /// Appends the encoded value at the buffer position.
    fn encode(&self, buffer: &mut BinaryBuffer);

    /// Reads one value from the cursor.
    fn decode(cursor: &mut BinaryCursor<'_>) -> Result<Self>;

    /// Encodes into a fresh byte vector.
    fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = BinaryBuffer::new();
        self.encode(&mut buffer);
        buffer.into_inner()
    }

    /// Decodes one value from the start of `bytes`. Trailing bytes are ignored.
    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::decode(&mut BinaryCursor::new(bytes))
    }
}

macro_rules! impl_bsatn_scalar {
    ($($ty:ty => $write:ident, $read:ident;)*) => {
        $(
            impl Bsatn for $ty {
                fn encode(&self, buffer: &mut BinaryBuffer) {
                    buffer.$write(*self);
                }

                fn decode(cursor: &mut BinaryCursor<'_>) -> Result<Self> {
                    cursor.$read()
                }
            }
        )*
    };
}

impl_bsatn_scalar! {
    bool => write_bool, read_bool;
    u8 => write_u8, read_u8;
    i8 => write_i8, read_i8;
    u16 => write_u16, read_u16;
    i16 => write_i16, read_i16;
    u32 => write_u32, read_u32;
    i32 => write_i32, read_i32;
    u64 => write_u64, read_u64;
    i64 => write_i64, read_i64;
    f32 => write_f32, read_f32;
    f64 => write_f64, read_f64;
    crate::int::U128 => write_u128, read_u128;
    crate::int::I128 => write_i128, read_i128;
    crate::int::U256 => write_u256, read_u256;
    crate::int::I256 => write_i256, read_i256;
    crate::types::Timestamp => write_timestamp, read_timestamp;
    crate::types::TimeDuration => write_duration, read_duration;
    crate::types::ConnectionId => write_connection_id, read_connection_id;
    crate::types::Identity => write_identity, read_identity;
}

impl Bsatn for String {
    fn encode(&self, buffer: &mut BinaryBuffer) {
        buffer.write_string(self);
    }

    fn decode(cursor: &mut BinaryCursor<'_>) -> Result<Self> {
        cursor.read_string()
    }
}

impl<T: Bsatn> Bsatn for Option<T> {
    fn encode(&self, buffer: &mut BinaryBuffer) {
        buffer.write_option(self.as_ref(), |buffer, value| value.encode(buffer));
    }

    fn decode(cursor: &mut BinaryCursor<'_>) -> Result<Self> {
        cursor.read_option(T::decode)
    }
}

impl<T: Bsatn> Bsatn for Vec<T> {
    fn encode(&self, buffer: &mut BinaryBuffer) {
        buffer.write_array(self, |buffer, item| item.encode(buffer));
    }

    fn decode(cursor: &mut BinaryCursor<'_>) -> Result<Self> {
        cursor.read_array(T::decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_containers() {
        let value: Vec<Option<String>> = vec![Some("a".into()), None, Some(String::new())];
        let bytes = value.to_bytes();
        assert_eq!(Vec::<Option<String>>::from_bytes(&bytes).unwrap(), value);
    }

    #[test]
    fn test_vec_u8_matches_byte_array_layout() {
        let value: Vec<u8> = vec![1, 2, 3];
        let mut buffer = BinaryBuffer::new();
        buffer.write_byte_array(&value);
        assert_eq!(value.to_bytes(), buffer.into_inner());
    }
}
