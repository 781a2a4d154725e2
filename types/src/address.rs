//! Node address type with `0x` prefix.

use crate::error::TypesError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A node identity: 20 bytes, hex encoded with a `0x` prefix.
///
/// Addresses are normalised to lowercase so two spellings of the same
/// identity compare equal.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeAddress(String);

impl NodeAddress {
    /// The standard prefix for all node addresses.
    pub const PREFIX: &'static str = "0x";

    /// Number of raw bytes in an address.
    pub const LEN: usize = 20;

    /// The all-zero address, never a valid member or contract.
    pub fn zero() -> Self {
        Self::from_bytes([0u8; Self::LEN])
    }

    /// Parse and normalise an address string.
    pub fn parse(raw: &str) -> Result<Self, TypesError> {
        let body = raw
            .strip_prefix(Self::PREFIX)
            .ok_or_else(|| TypesError::InvalidAddress(raw.to_string()))?;
        let bytes = hex::decode(body).map_err(|_| TypesError::InvalidAddress(raw.to_string()))?;
        if bytes.len() != Self::LEN {
            return Err(TypesError::InvalidAddress(raw.to_string()));
        }
        Ok(Self(format!("{}{}", Self::PREFIX, body.to_ascii_lowercase())))
    }

    pub fn from_bytes(bytes: [u8; Self::LEN]) -> Self {
        Self(format!("{}{}", Self::PREFIX, hex::encode(bytes)))
    }

    /// Return the raw address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0[Self::PREFIX.len()..].bytes().all(|b| b == b'0')
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NodeAddress {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for NodeAddress {
    type Error = TypesError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<NodeAddress> for String {
    fn from(address: NodeAddress) -> Self {
        address.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_normalises_case() {
        let a = NodeAddress::parse("0xABCDEF0000000000000000000000000000000001").unwrap();
        let b = NodeAddress::parse("0xabcdef0000000000000000000000000000000001").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn parse_rejects_missing_prefix_and_bad_length() {
        assert!(NodeAddress::parse("abcdef0000000000000000000000000000000001").is_err());
        assert!(NodeAddress::parse("0x1234").is_err());
        assert!(NodeAddress::parse("0xzz00000000000000000000000000000000000001").is_err());
    }

    #[test]
    fn zero_address() {
        assert!(NodeAddress::zero().is_zero());
        let mut bytes = [0u8; 20];
        bytes[19] = 1;
        assert!(!NodeAddress::from_bytes(bytes).is_zero());
    }

    #[test]
    fn serde_validates_and_normalises() {
        let a: NodeAddress =
            serde_json::from_str("\"0xABCDEF0000000000000000000000000000000001\"").unwrap();
        assert_eq!(a.as_str(), "0xabcdef0000000000000000000000000000000001");
        assert!(serde_json::from_str::<NodeAddress>("\"0x12\"").is_err());
    }
}
