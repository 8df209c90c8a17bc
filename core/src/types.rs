//! Identifiers and value objects shared by every layer of the marketplace.
//!
//! Ledger-native values (addresses, hashes, fingerprints) are fixed-size byte arrays
//! rendered as `0x`-prefixed lowercase hex. Amounts are integral wei held in a `u128`
//! and serialized as decimal strings so that no JSON consumer truncates them.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Error returned when parsing a hex-encoded ledger value fails.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseHexError {
    /// The input was not valid hexadecimal
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// The decoded byte length did not match the expected width
    #[error("expected {expected} bytes, got {actual}")]
    InvalidLength {
        /// Expected byte length
        expected: usize,
        /// Decoded byte length
        actual: usize,
    },
}

fn decode_fixed<const N: usize>(input: &str) -> Result<[u8; N], ParseHexError> {
    let trimmed = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .unwrap_or(input);
    let bytes = hex::decode(trimmed).map_err(|e| ParseHexError::InvalidHex(e.to_string()))?;
    let actual = bytes.len();
    bytes.try_into().map_err(|_| ParseHexError::InvalidLength {
        expected: N,
        actual,
    })
}

macro_rules! hex_value {
    ($(#[$meta:meta])* $name:ident, $len:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct $name([u8; $len]);

        impl $name {
            /// The all-zero value
            pub const ZERO: Self = Self([0u8; $len]);

            /// Wrap raw bytes
            #[must_use]
            pub const fn from_bytes(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            /// Borrow the raw bytes
            #[must_use]
            pub const fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            /// Whether every byte is zero
            #[must_use]
            pub fn is_zero(&self) -> bool {
                self.0.iter().all(|b| *b == 0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{}", hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({self})", stringify!($name))
            }
        }

        impl FromStr for $name {
            type Err = ParseHexError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                decode_fixed::<$len>(s).map(Self)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

hex_value!(
    /// A 20-byte ledger account address
    Address,
    20
);

hex_value!(
    /// Content fingerprint (opaque 32-byte hash) pointing at off-ledger event metadata
    Fingerprint,
    32
);

hex_value!(
    /// Ledger transaction hash
    TxHash,
    32
);

impl Address {
    /// Build an address whose trailing eight bytes hold `value` (big endian).
    ///
    /// Handy for fixtures and deterministic test accounts.
    #[must_use]
    pub const fn from_low_u64(value: u64) -> Self {
        let low = value.to_be_bytes();
        let mut bytes = [0u8; 20];
        let mut i = 0;
        while i < low.len() {
            bytes[12 + i] = low[i];
            i += 1;
        }
        Self(bytes)
    }
}

macro_rules! sequence_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Wrap a raw ledger sequence number
            #[must_use]
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            /// The raw sequence number
            #[must_use]
            pub const fn value(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

sequence_id!(
    /// Ledger-assigned event identifier (monotonic, starting at 1)
    EventId
);

sequence_id!(
    /// Ledger-assigned ticket identifier (global, monotonic, starting at 1)
    TicketId
);

sequence_id!(
    /// Ledger-assigned listing identifier (monotonic, never reused)
    ListingId
);

/// Opaque per-event seat key.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeatId(String);

impl SeatId {
    /// Creates a seat identifier
    #[must_use]
    pub fn new(seat: impl Into<String>) -> Self {
        Self(seat.into())
    }

    /// Borrow the raw seat key
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the key is empty or whitespace only
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for SeatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SeatId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Idempotency key shared by every physical attempt of one logical ledger mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationId(Uuid);

impl OperationId {
    /// Creates a new random `OperationId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an `OperationId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for OperationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Amounts
// ============================================================================

/// An amount of the ledger's native currency in its smallest unit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Wei(u128);

impl Wei {
    /// Zero wei
    pub const ZERO: Self = Self(0);

    /// Creates an amount from raw wei
    #[must_use]
    pub const fn new(amount: u128) -> Self {
        Self(amount)
    }

    /// Raw wei value
    #[must_use]
    pub const fn get(&self) -> u128 {
        self.0
    }

    /// Whether the amount is zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Adds two amounts, `None` on overflow
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(sum) => Some(Self(sum)),
            None => None,
        }
    }

    /// Subtracts two amounts, `None` if the result would be negative
    #[must_use]
    pub const fn checked_sub(self, other: Self) -> Option<Self> {
        match self.0.checked_sub(other.0) {
            Some(diff) => Some(Self(diff)),
            None => None,
        }
    }

    /// Adds, clamping at the maximum representable amount
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Subtracts, clamping at zero
    #[must_use]
    pub const fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

impl fmt::Display for Wei {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} wei", self.0)
    }
}

impl From<u128> for Wei {
    fn from(value: u128) -> Self {
        Self(value)
    }
}

impl Serialize for Wei {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Wei {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse::<u128>()
            .map(Self)
            .map_err(serde::de::Error::custom)
    }
}

/// A rate in basis points (1 bps = 0.01%, 10 000 bps = 100%).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bps(u16);

impl Bps {
    /// 100%
    pub const FULL: Self = Self(10_000);

    /// Creates a rate from raw basis points
    #[must_use]
    pub const fn new(bps: u16) -> Self {
        Self(bps)
    }

    /// Raw basis points
    #[must_use]
    pub const fn get(&self) -> u16 {
        self.0
    }

    /// `floor(amount * self / 10_000)` without intermediate overflow.
    ///
    /// Splits `amount` into `q * 10_000 + r`, so the product never exceeds the
    /// original amount for rates up to 100%.
    #[must_use]
    pub const fn share_of(self, amount: Wei) -> Wei {
        let bps = self.0 as u128;
        let quotient = amount.0 / 10_000;
        let remainder = amount.0 % 10_000;
        Wei(quotient.saturating_mul(bps).saturating_add(remainder * bps / 10_000))
    }
}

impl fmt::Display for Bps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} bps", self.0)
    }
}
