//! Entity identifiers
//!
//! A `Uuid` is a plain 64-bit value assigned by the host. It is not a
//! 128-bit RFC 4122 identifier. `0` is reserved as the "no entity" sentinel.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// 64-bit entity identifier, unique within a running scene.
#[derive(
    Debug, Copy, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Uuid(u64);

impl Uuid {
    /// Reserved sentinel: never denotes a live entity.
    pub const NIL: Uuid = Uuid(0);

    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn is_nil(self) -> bool {
        self.0 == 0
    }
}

impl From<u64> for Uuid {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl From<Uuid> for u64 {
    fn from(uuid: Uuid) -> Self {
        uuid.0
    }
}

/// Renders as 16 zero-padded lower-case hex digits.
impl fmt::Display for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid entity uuid '{input}': expected 1 to 16 hex digits")]
pub struct ParseUuidError {
    pub input: String,
}

impl FromStr for Uuid {
    type Err = ParseUuidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseUuidError {
            input: s.to_string(),
        };
        if s.is_empty() || s.len() > 16 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(err());
        }
        u64::from_str_radix(s, 16).map(Uuid).map_err(|_| err())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_nil() {
        assert_eq!(Uuid::default(), Uuid::NIL);
        assert!(Uuid::default().is_nil());
        assert!(!Uuid::from_raw(42).is_nil());
    }

    #[test]
    fn display_is_padded_hex() {
        assert_eq!(Uuid::from_raw(42).to_string(), "000000000000002a");
        assert_eq!(Uuid::NIL.to_string(), "0000000000000000");
        assert_eq!(Uuid::from_raw(u64::MAX).to_string(), "ffffffffffffffff");
    }

    #[test]
    fn parses_display_form() {
        let uuid = Uuid::from_raw(0xdead_beef_0042);
        assert_eq!(uuid.to_string().parse::<Uuid>(), Ok(uuid));
        assert_eq!("2A".parse::<Uuid>(), Ok(Uuid::from_raw(42)));
    }

    #[test]
    fn rejects_malformed_input() {
        assert!("".parse::<Uuid>().is_err());
        assert!("xyz".parse::<Uuid>().is_err());
        assert!("+2a".parse::<Uuid>().is_err());
        assert!("00000000000000000".parse::<Uuid>().is_err());
    }

    #[test]
    fn serializes_as_number() {
        let json = serde_json::to_string(&Uuid::from_raw(7)).unwrap();
        assert_eq!(json, "7");
        let back: Uuid = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Uuid::from_raw(7));
    }
}
