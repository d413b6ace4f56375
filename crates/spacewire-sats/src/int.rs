//! Fixed-width 128-bit and 256-bit integers.
//!
//! These are plain value carriers: no arithmetic, only construction from halves,
//! byte import/export, ordering and display. The halves are kept as
//! `(upper, lower)` because that is also their wire order.

use std::{cmp::Ordering, fmt};

use byteorder::{BigEndian, ByteOrder, LittleEndian};

/// Unsigned 128-bit integer stored as two 64-bit halves.
///
/// Field order matters: the derived ordering compares `upper` first.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct U128 {
    upper: u64,
    lower: u64,
}

impl U128 {
    /// Zero.
    pub const ZERO: U128 = U128 { upper: 0, lower: 0 };

    /// Builds a value from its halves.
    pub const fn new(upper: u64, lower: u64) -> Self {
        Self { upper, lower }
    }

    /// Upper 64 bits.
    pub const fn upper(&self) -> u64 {
        self.upper
    }

    /// Lower 64 bits.
    pub const fn lower(&self) -> u64 {
        self.lower
    }

    /// Returns true if every bit is zero.
    pub const fn is_zero(&self) -> bool {
        self.upper == 0 && self.lower == 0
    }

    /// Reads 16 big-endian bytes.
    pub fn from_be_bytes(bytes: [u8; 16]) -> Self {
        Self::new(BigEndian::read_u64(&bytes[..8]), BigEndian::read_u64(&bytes[8..]))
    }

    /// Reads 16 little-endian bytes.
    pub fn from_le_bytes(bytes: [u8; 16]) -> Self {
        Self::new(LittleEndian::read_u64(&bytes[8..]), LittleEndian::read_u64(&bytes[..8]))
    }

    /// Big-endian byte representation.
    pub fn to_be_bytes(&self) -> [u8; 16] {
        let mut out = [0u8; 16];
        BigEndian::write_u64(&mut out[..8], self.upper);
        BigEndian::write_u64(&mut out[8..], self.lower);
        out
    }

    /// Little-endian byte representation.
    pub fn to_le_bytes(&self) -> [u8; 16] {
        let mut out = [0u8; 16];
        LittleEndian::write_u64(&mut out[..8], self.lower);
        LittleEndian::write_u64(&mut out[8..], self.upper);
        out
    }
}

impl From<u128> for U128 {
    fn from(value: u128) -> Self {
        Self::new((value >> 64) as u64, value as u64)
    }
}

impl From<U128> for u128 {
    fn from(value: U128) -> Self {
        ((value.upper as u128) << 64) | value.lower as u128
    }
}

impl fmt::Display for U128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016X}{:016X}", self.upper, self.lower)
    }
}

/// Signed 128-bit integer in two's complement, stored as two 64-bit halves.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct I128 {
    upper: u64,
    lower: u64,
}

impl I128 {
    /// Builds a value from its raw halves. The sign is the top bit of `upper`.
    pub const fn new(upper: u64, lower: u64) -> Self {
        Self { upper, lower }
    }

    /// Upper 64 bits, raw.
    pub const fn upper(&self) -> u64 {
        self.upper
    }

    /// Lower 64 bits.
    pub const fn lower(&self) -> u64 {
        self.lower
    }

    /// Returns true if the sign bit is set.
    pub const fn is_negative(&self) -> bool {
        (self.upper as i64) < 0
    }
}

impl Ord for I128 {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.upper as i64, self.lower).cmp(&(other.upper as i64, other.lower))
    }
}

impl PartialOrd for I128 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<i128> for I128 {
    fn from(value: i128) -> Self {
        Self::new((value >> 64) as u64, value as u64)
    }
}

impl From<I128> for i128 {
    fn from(value: I128) -> Self {
        (((value.upper as u128) << 64) | value.lower as u128) as i128
    }
}

impl fmt::Display for I128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016X}{:016X}", self.upper, self.lower)
    }
}

/// Unsigned 256-bit integer stored as two 128-bit halves.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct U256 {
    upper: U128,
    lower: U128,
}

impl U256 {
    /// Zero.
    pub const ZERO: U256 = U256 { upper: U128::ZERO, lower: U128::ZERO };

    /// Builds a value from its halves.
    pub const fn new(upper: U128, lower: U128) -> Self {
        Self { upper, lower }
    }

    /// Upper 128 bits.
    pub const fn upper(&self) -> U128 {
        self.upper
    }

    /// Lower 128 bits.
    pub const fn lower(&self) -> U128 {
        self.lower
    }

    /// Returns true if every bit is zero.
    pub const fn is_zero(&self) -> bool {
        self.upper.is_zero() && self.lower.is_zero()
    }

    /// Reads 32 big-endian bytes.
    pub fn from_be_bytes(bytes: [u8; 32]) -> Self {
        let (upper, lower) = split_halves(&bytes);
        Self::new(U128::from_be_bytes(upper), U128::from_be_bytes(lower))
    }

    /// Reads 32 little-endian bytes.
    pub fn from_le_bytes(bytes: [u8; 32]) -> Self {
        let (lower, upper) = split_halves(&bytes);
        Self::new(U128::from_le_bytes(upper), U128::from_le_bytes(lower))
    }

    /// Big-endian byte representation.
    pub fn to_be_bytes(&self) -> [u8; 32] {
        join_halves(self.upper.to_be_bytes(), self.lower.to_be_bytes())
    }

    /// Little-endian byte representation.
    pub fn to_le_bytes(&self) -> [u8; 32] {
        join_halves(self.lower.to_le_bytes(), self.upper.to_le_bytes())
    }
}

impl fmt::Display for U256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "0x{:016X}{:016X}{:016X}{:016X}",
            self.upper.upper(),
            self.upper.lower(),
            self.lower.upper(),
            self.lower.lower()
        )
    }
}

/// Signed 256-bit integer in two's complement.
///
/// Only the upper half carries the sign; the lower half is unsigned magnitude.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct I256 {
    upper: I128,
    lower: U128,
}

impl I256 {
    /// Builds a value from its halves.
    pub const fn new(upper: I128, lower: U128) -> Self {
        Self { upper, lower }
    }

    /// Upper 128 bits.
    pub const fn upper(&self) -> I128 {
        self.upper
    }

    /// Lower 128 bits.
    pub const fn lower(&self) -> U128 {
        self.lower
    }

    /// Returns true if the sign bit is set.
    pub const fn is_negative(&self) -> bool {
        self.upper.is_negative()
    }
}

impl Ord for I256 {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.upper, self.lower).cmp(&(other.upper, other.lower))
    }
}

impl PartialOrd for I256 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for I256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "0x{:016X}{:016X}{:016X}{:016X}",
            self.upper.upper(),
            self.upper.lower(),
            self.lower.upper(),
            self.lower.lower()
        )
    }
}

fn split_halves(bytes: &[u8; 32]) -> ([u8; 16], [u8; 16]) {
    let mut first = [0u8; 16];
    let mut second = [0u8; 16];
    first.copy_from_slice(&bytes[..16]);
    second.copy_from_slice(&bytes[16..]);
    (first, second)
}

fn join_halves(first: [u8; 16], second: [u8; 16]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out[..16].copy_from_slice(&first);
    out[16..].copy_from_slice(&second);
    out
}
