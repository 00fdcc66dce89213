use std::fmt;

use k256::ecdsa::signature::hazmat::PrehashSigner;
use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, SigningKey};
use token_abi::Address;
use zeroize::Zeroizing;

use crate::error::TokenError;

/// An ECDSA signature over a 32-byte digest, with its recovery id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    pub r: [u8; 32],
    pub s: [u8; 32],
    /// 0 or 1: parity of the ephemeral point's y coordinate.
    pub recovery_id: u8,
}

/// A signing account. The private key lives only in memory and is wiped
/// when the account is dropped.
pub struct Account {
    signing_key: SigningKey,
    address: Address,
}

impl Account {
    /// Loads an account from a hex private key, with or without `0x`.
    pub fn from_hex(private_key_hex: &str) -> Result<Self, TokenError> {
        let trimmed = private_key_hex.trim();
        let hex_str = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        if hex_str.len() != 64 {
            return Err(TokenError::InvalidKey(format!(
                "expected 64 hex characters, got {}",
                hex_str.len()
            )));
        }

        let mut key_bytes = Zeroizing::new([0u8; 32]);
        hex::decode_to_slice(hex_str, key_bytes.as_mut_slice())
            .map_err(|e| TokenError::InvalidKey(format!("invalid hex: {e}")))?;

        Self::from_bytes(&key_bytes)
    }

    pub fn from_bytes(private_key: &[u8; 32]) -> Result<Self, TokenError> {
        let signing_key = SigningKey::from_bytes(private_key.into())
            .map_err(|e| TokenError::InvalidKey(e.to_string()))?;
        let address = Address::from_public_key(&signing_key.verifying_key().into());

        Ok(Self {
            signing_key,
            address,
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Signs a 32-byte digest with RFC 6979 deterministic nonces. The
    /// resulting `s` is normalized to the lower half of the curve order.
    pub fn sign_digest(&self, digest: &[u8; 32]) -> Result<Signature, TokenError> {
        let (signature, recovery_id): (EcdsaSignature, RecoveryId) = self
            .signing_key
            .sign_prehash(digest)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&signature.r().to_bytes());
        s.copy_from_slice(&signature.s().to_bytes());

        Ok(Signature {
            r,
            s,
            recovery_id: recovery_id.is_y_odd() as u8,
        })
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::VerifyingKey;

    /// Well-known test private key (DO NOT use on mainnet).
    const TEST_KEY_HEX: &str = "0x0000000000000000000000000000000000000000000000000000000000000001";

    #[test]
    fn address_of_known_key() {
        let account = Account::from_hex(TEST_KEY_HEX).unwrap();
        assert_eq!(
            account.address().to_string(),
            "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf"
        );
    }

    #[test]
    fn prefix_is_optional() {
        let with = Account::from_hex(TEST_KEY_HEX).unwrap();
        let without = Account::from_hex(&TEST_KEY_HEX[2..]).unwrap();
        assert_eq!(with.address(), without.address());
    }

    #[test]
    fn rejects_bad_keys() {
        assert!(matches!(Account::from_hex("0x1234"), Err(TokenError::InvalidKey(_))));
        assert!(matches!(
            Account::from_hex(&"zz".repeat(32)),
            Err(TokenError::InvalidKey(_))
        ));
        // Zero is not a valid scalar.
        assert!(matches!(
            Account::from_hex(&"00".repeat(32)),
            Err(TokenError::InvalidKey(_))
        ));
    }

    #[test]
    fn debug_hides_key() {
        let account = Account::from_hex(TEST_KEY_HEX).unwrap();
        let debug = format!("{account:?}");
        assert!(debug.contains("7E5F4552091A69125d5DfCb7b8C2659029395Bdf"));
        assert!(!debug.contains("signing_key"));
    }

    #[test]
    fn signature_is_deterministic_and_recoverable() {
        let account = Account::from_hex(TEST_KEY_HEX).unwrap();
        let digest = [0x42u8; 32];

        let first = account.sign_digest(&digest).unwrap();
        let second = account.sign_digest(&digest).unwrap();
        assert_eq!(first, second);

        let mut bytes = [0u8; 64];
        bytes[..32].copy_from_slice(&first.r);
        bytes[32..].copy_from_slice(&first.s);
        let signature = EcdsaSignature::from_slice(&bytes).unwrap();
        let recovery_id = RecoveryId::from_byte(first.recovery_id).unwrap();
        let recovered = VerifyingKey::recover_from_prehash(&digest, &signature, recovery_id).unwrap();

        assert_eq!(Address::from_public_key(&recovered.into()), account.address());
    }
}
