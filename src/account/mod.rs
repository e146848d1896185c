use std::{fmt, str::FromStr};

use ed25519_dalek::VerifyingKey;
use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};

/// Opaque 32-byte account identity.
///
/// Callers are identified by their ed25519 verifying key bytes; the all-zero
/// address is the null account and can never hold a balance.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address([u8; 32]);

impl Address {
    pub const ZERO: Address = Address([0u8; 32]);

    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn from_verifying_key(key: &VerifyingKey) -> Self {
        Self(key.to_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum AddressParseError {
    #[error("invalid address hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
    #[error("address must be 32 bytes (64 hex chars), got {0} bytes")]
    InvalidLength(usize),
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(AddressParseError::InvalidLength(bytes.len()));
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // first 4 bytes are enough to tell accounts apart in logs
        write!(f, "Address({}…)", hex::encode(&self.0[..4]))
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        encoded.parse().map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip_and_prefix() {
        let addr = Address::from_bytes([0xab; 32]);
        let parsed: Address = format!("0x{}", addr).parse().unwrap();
        assert_eq!(parsed, addr);
    }

    #[test]
    fn rejects_short_addresses() {
        let err = "abcd".parse::<Address>().unwrap_err();
        assert_eq!(err, AddressParseError::InvalidLength(2));
    }

    #[test]
    fn rejects_non_hex_addresses() {
        let err = "zz".repeat(32).parse::<Address>().unwrap_err();
        assert!(matches!(err, AddressParseError::InvalidHex(_)));
        assert!(err.to_string().starts_with("invalid address hex"));
    }

    #[test]
    fn zero_address_is_null() {
        assert!(Address::ZERO.is_zero());
        assert!(!Address::from_bytes([1; 32]).is_zero());
    }

    #[test]
    fn serializes_as_map_key() {
        let mut map = std::collections::BTreeMap::new();
        map.insert(Address::from_bytes([7; 32]), 5u128);
        let json = serde_json::to_string(&map).unwrap();
        let back: std::collections::BTreeMap<Address, u128> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }
}
