//! Domain scalars carried by server messages.

use std::{
    fmt,
    ops::{Add, Sub},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use crate::int::{U128, U256};

/// Microseconds since the Unix epoch.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    micros: i64,
}

impl Timestamp {
    /// The Unix epoch.
    pub const UNIX_EPOCH: Timestamp = Timestamp { micros: 0 };

    /// Creates a timestamp from microseconds since the epoch.
    pub const fn from_micros(micros: i64) -> Self {
        Self { micros }
    }

    /// Microseconds since the epoch.
    pub const fn as_micros(&self) -> i64 {
        self.micros
    }

    /// The current wall-clock time.
    pub fn now() -> Self {
        Self::from(SystemTime::now())
    }

    /// Converts to a [`SystemTime`].
    pub fn to_system_time(&self) -> SystemTime {
        let magnitude = Duration::from_micros(self.micros.unsigned_abs());
        if self.micros >= 0 {
            UNIX_EPOCH + magnitude
        } else {
            UNIX_EPOCH - magnitude
        }
    }
}

impl From<SystemTime> for Timestamp {
    fn from(time: SystemTime) -> Self {
        // Saturates outside the i64 microsecond range.
        let micros = match time.duration_since(UNIX_EPOCH) {
            Ok(after) => i64::try_from(after.as_micros()).unwrap_or(i64::MAX),
            Err(before) => i64::try_from(before.duration().as_micros())
                .map(|micros| -micros)
                .unwrap_or(i64::MIN),
        };
        Self { micros }
    }
}

impl From<Timestamp> for SystemTime {
    fn from(timestamp: Timestamp) -> Self {
        timestamp.to_system_time()
    }
}

impl Add<TimeDuration> for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: TimeDuration) -> Timestamp {
        Timestamp::from_micros(self.micros.saturating_add(rhs.micros))
    }
}

impl Sub<TimeDuration> for Timestamp {
    type Output = Timestamp;

    fn sub(self, rhs: TimeDuration) -> Timestamp {
        Timestamp::from_micros(self.micros.saturating_sub(rhs.micros))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}us", self.micros)
    }
}

/// Signed span of time in microseconds.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeDuration {
    micros: i64,
}

impl TimeDuration {
    /// Zero length.
    pub const ZERO: TimeDuration = TimeDuration { micros: 0 };

    /// Creates a duration from microseconds.
    pub const fn from_micros(micros: i64) -> Self {
        Self { micros }
    }

    /// Creates a duration from whole milliseconds.
    pub const fn from_millis(millis: i64) -> Self {
        Self { micros: millis.saturating_mul(1000) }
    }

    /// Length in microseconds.
    pub const fn as_micros(&self) -> i64 {
        self.micros
    }

    /// Length in fractional milliseconds.
    pub fn as_millis(&self) -> f64 {
        self.micros as f64 / 1000.0
    }

    /// Converts to a std [`Duration`]; `None` if negative.
    pub fn to_std(&self) -> Option<Duration> {
        u64::try_from(self.micros).ok().map(Duration::from_micros)
    }
}

impl From<Duration> for TimeDuration {
    fn from(duration: Duration) -> Self {
        Self { micros: i64::try_from(duration.as_micros()).unwrap_or(i64::MAX) }
    }
}

impl Add for TimeDuration {
    type Output = TimeDuration;

    fn add(self, rhs: TimeDuration) -> TimeDuration {
        TimeDuration::from_micros(self.micros.saturating_add(rhs.micros))
    }
}

impl Sub for TimeDuration {
    type Output = TimeDuration;

    fn sub(self, rhs: TimeDuration) -> TimeDuration {
        TimeDuration::from_micros(self.micros.saturating_sub(rhs.micros))
    }
}

impl fmt::Display for TimeDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3} ms", self.as_millis())
    }
}

/// Identifies one logical client connection.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId {
    value: U128,
}

impl ConnectionId {
    /// Wraps a raw value. Zero is allowed here; the byte importers reject it.
    pub const fn new(value: U128) -> Self {
        Self { value }
    }

    /// The underlying bits.
    pub const fn value(&self) -> U128 {
        self.value
    }

    /// Returns true for the all-zero id, which means "no connection".
    pub const fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    /// Imports 16 little-endian bytes. Zero yields `None`.
    pub fn from_le_bytes(bytes: [u8; 16]) -> Option<Self> {
        Self::non_zero(U128::from_le_bytes(bytes))
    }

    /// Imports 16 big-endian bytes. Zero yields `None`.
    pub fn from_be_bytes(bytes: [u8; 16]) -> Option<Self> {
        Self::non_zero(U128::from_be_bytes(bytes))
    }

    /// Parses 32 hex digits (big-endian, optional `0x`). Zero or malformed input
    /// yields `None`.
    pub fn from_hex(digits: &str) -> Option<Self> {
        let mut bytes = [0u8; 16];
        decode_hex(digits, &mut bytes)?;
        Self::from_be_bytes(bytes)
    }

    /// Little-endian bytes.
    pub fn to_le_bytes(&self) -> [u8; 16] {
        self.value.to_le_bytes()
    }

    /// Big-endian bytes.
    pub fn to_be_bytes(&self) -> [u8; 16] {
        self.value.to_be_bytes()
    }

    /// 32 lowercase hex digits, most significant first.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_be_bytes())
    }

    fn non_zero(value: U128) -> Option<Self> {
        (!value.is_zero()).then_some(Self { value })
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Identifies a user or principal.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identity {
    value: U256,
}

impl Identity {
    /// Wraps a raw value.
    pub const fn new(value: U256) -> Self {
        Self { value }
    }

    /// The underlying bits.
    pub const fn value(&self) -> U256 {
        self.value
    }

    /// Imports 32 little-endian bytes.
    pub fn from_le_bytes(bytes: [u8; 32]) -> Self {
        Self::new(U256::from_le_bytes(bytes))
    }

    /// Imports 32 big-endian bytes.
    pub fn from_be_bytes(bytes: [u8; 32]) -> Self {
        Self::new(U256::from_be_bytes(bytes))
    }

    /// Parses 64 hex digits (big-endian, optional `0x`).
    pub fn from_hex(digits: &str) -> Option<Self> {
        let mut bytes = [0u8; 32];
        decode_hex(digits, &mut bytes)?;
        Some(Self::from_be_bytes(bytes))
    }

    /// Little-endian bytes.
    pub fn to_le_bytes(&self) -> [u8; 32] {
        self.value.to_le_bytes()
    }

    /// Big-endian bytes.
    pub fn to_be_bytes(&self) -> [u8; 32] {
        self.value.to_be_bytes()
    }

    /// 64 lowercase hex digits, most significant first.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_be_bytes())
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Fills `out` from exactly `2 * out.len()` hex digits, with an optional `0x`.
fn decode_hex(digits: &str, out: &mut [u8]) -> Option<()> {
    let digits = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
        .unwrap_or(digits);
    hex::decode_to_slice(digits, out).ok()
}
