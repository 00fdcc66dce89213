use std::fmt;
use std::str::FromStr;

use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::PublicKey;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};

use crate::error::AbiError;

/// A 20-byte EVM account or contract address.
///
/// Equality is byte equality, so two textual forms that differ only in
/// letter case compare equal once parsed.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; 20]);

impl Address {
    /// The all-zero address.
    pub const ZERO: Address = Address([0u8; 20]);

    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Derives the address of a secp256k1 public key: the last 20 bytes of
    /// the Keccak-256 hash of the 64-byte uncompressed point.
    pub fn from_public_key(public_key: &PublicKey) -> Self {
        let uncompressed = public_key.to_encoded_point(false);
        Self::hash_point(&uncompressed.as_bytes()[1..])
    }

    fn hash_point(xy: &[u8]) -> Self {
        let hash = Keccak256::digest(xy);
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&hash[12..]);
        Self(bytes)
    }

    /// Derives an address from an uncompressed public key (65 bytes, starting
    /// with 0x04).
    pub fn from_uncompressed_pubkey(pubkey: &[u8]) -> Result<Self, AbiError> {
        if pubkey.len() != 65 || pubkey[0] != 0x04 {
            return Err(AbiError::InvalidPublicKey(
                "uncompressed key must be 65 bytes starting with 0x04".into(),
            ));
        }

        Ok(Self::hash_point(&pubkey[1..]))
    }

    /// Parses an address and, if it is written in mixed case, verifies the
    /// EIP-55 checksum.
    pub fn parse_checksummed(input: &str) -> Result<Self, AbiError> {
        let address: Address = input.parse()?;
        let hex_part = strip_hex_prefix(input.trim());

        let is_all_lower = hex_part.chars().all(|c| !c.is_ascii_uppercase());
        let is_all_upper = hex_part.chars().all(|c| !c.is_ascii_lowercase());
        if is_all_lower || is_all_upper {
            return Ok(address);
        }

        if address.to_checksum()[2..] != *hex_part {
            return Err(AbiError::invalid_address(input, "bad EIP-55 checksum"));
        }
        Ok(address)
    }

    /// Returns the EIP-55 mixed-case checksummed form, `0x`-prefixed.
    pub fn to_checksum(&self) -> String {
        let hex_part = hex::encode(self.0);
        let hash = Keccak256::digest(hex_part.as_bytes());

        let mut checksummed = String::with_capacity(42);
        checksummed.push_str("0x");

        for (i, c) in hex_part.chars().enumerate() {
            // Nibble i of the hash decides the case of character i.
            let byte = hash[i / 2];
            let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
            if c.is_ascii_alphabetic() && nibble >= 8 {
                checksummed.push(c.to_ascii_uppercase());
            } else {
                checksummed.push(c);
            }
        }

        checksummed
    }
}

fn strip_hex_prefix(input: &str) -> &str {
    input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .unwrap_or(input)
}

impl FromStr for Address {
    type Err = AbiError;

    /// Accepts 40 hex characters in any case, with or without a `0x` prefix.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let hex_part = strip_hex_prefix(input.trim());

        if hex_part.len() != 40 {
            return Err(AbiError::invalid_address(
                input,
                format!("expected 40 hex characters, got {}", hex_part.len()),
            ));
        }

        if !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(AbiError::invalid_address(
                input,
                "address contains non-hex characters",
            ));
        }

        let mut bytes = [0u8; 20];
        hex::decode_to_slice(hex_part, &mut bytes)
            .map_err(|e| AbiError::invalid_address(input, format!("invalid hex: {e}")))?;
        Ok(Self(bytes))
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_checksum())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_checksum())
    }
}

impl fmt::LowerHex for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            f.write_str("0x")?;
        }
        f.write_str(&hex::encode(self.0))
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_checksum())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
