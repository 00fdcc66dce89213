use alloy_primitives::{B256, U256};
use alloy_rlp::{Encodable, RlpEncodable};
use sha3::{Digest, Keccak256};
use token_abi::Address;

use crate::account::{Account, Signature};
use crate::error::TokenError;

/// An unsigned legacy (gas-price) transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTransaction {
    pub nonce: u64,
    /// Gas price in wei.
    pub gas_price: u128,
    pub gas_limit: u64,
    pub to: Address,
    /// Native value in wei (zero for token calls).
    pub value: U256,
    pub data: Vec<u8>,
}

/// A transaction signed for one chain, ready for broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub transaction: LegacyTransaction,
    pub chain_id: u64,
    pub signature: Signature,
    /// EIP-155 `v`: `recovery_id + 2 * chain_id + 35`.
    pub v: u64,
    /// RLP-encoded signed transaction bytes.
    pub raw: Vec<u8>,
    /// Keccak-256 of `raw`.
    pub hash: B256,
}

impl SignedTransaction {
    /// `0x`-prefixed hex of the raw bytes, as sent to `eth_sendRawTransaction`.
    pub fn raw_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.raw))
    }
}

/// A transaction the network has accepted into its pool.
///
/// Confirmation is not tracked here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedTransaction {
    /// Hash reported by the node, or the locally computed one if the node
    /// reported none.
    pub hash: B256,
    pub signed: SignedTransaction,
}

impl SubmittedTransaction {
    pub fn nonce(&self) -> u64 {
        self.signed.transaction.nonce
    }

    pub fn hash_hex(&self) -> String {
        format!("0x{}", hex::encode(self.hash))
    }
}

impl LegacyTransaction {
    /// Encodes the EIP-155 signing payload:
    /// `rlp([nonce, gasPrice, gasLimit, to, value, data, chainId, 0, 0])`.
    pub fn signing_payload(&self, chain_id: u64) -> Vec<u8> {
        let fields = UnsignedTxFields {
            nonce: self.nonce,
            gas_price: self.gas_price,
            gas_limit: self.gas_limit,
            to: RlpAddress(*self.to.as_bytes()),
            value: RlpU256(self.value.to_be_bytes::<32>()),
            data: RlpBytes(self.data.clone()),
            chain_id,
            empty_r: 0,
            empty_s: 0,
        };

        let mut out = Vec::new();
        fields.encode(&mut out);
        out
    }

    /// Signs the transaction for `chain_id` with the account's key.
    pub fn sign(self, account: &Account, chain_id: u64) -> Result<SignedTransaction, TokenError> {
        let digest: [u8; 32] = Keccak256::digest(self.signing_payload(chain_id)).into();
        let signature = account.sign_digest(&digest)?;
        let v = eip155_v(chain_id, signature.recovery_id).ok_or_else(|| {
            TokenError::Signing(format!("chain id {chain_id} is too large for an EIP-155 v value"))
        })?;

        let fields = SignedTxFields {
            nonce: self.nonce,
            gas_price: self.gas_price,
            gas_limit: self.gas_limit,
            to: RlpAddress(*self.to.as_bytes()),
            value: RlpU256(self.value.to_be_bytes::<32>()),
            data: RlpBytes(self.data.clone()),
            v,
            r: RlpU256(signature.r),
            s: RlpU256(signature.s),
        };

        let mut raw = Vec::new();
        fields.encode(&mut raw);
        let hash = B256::from(<[u8; 32]>::from(Keccak256::digest(&raw)));

        Ok(SignedTransaction {
            transaction: self,
            chain_id,
            signature,
            v,
            raw,
            hash,
        })
    }
}

fn eip155_v(chain_id: u64, recovery_id: u8) -> Option<u64> {
    chain_id
        .checked_mul(2)?
        .checked_add(35 + u64::from(recovery_id))
}

// ---------------------------------------------------------------------------
// RLP-encodable structures
// ---------------------------------------------------------------------------

#[derive(RlpEncodable)]
struct UnsignedTxFields {
    nonce: u64,
    gas_price: u128,
    gas_limit: u64,
    to: RlpAddress,
    value: RlpU256,
    data: RlpBytes,
    chain_id: u64,
    empty_r: u8,
    empty_s: u8,
}

#[derive(RlpEncodable)]
struct SignedTxFields {
    nonce: u64,
    gas_price: u128,
    gas_limit: u64,
    to: RlpAddress,
    value: RlpU256,
    data: RlpBytes,
    v: u64,
    r: RlpU256,
    s: RlpU256,
}

/// A 20-byte address encoded as an RLP byte string.
#[derive(Debug, Clone)]
struct RlpAddress([u8; 20]);

impl Encodable for RlpAddress {
    fn encode(&self, out: &mut dyn alloy_rlp::BufMut) {
        self.0.as_slice().encode(out);
    }

    fn length(&self) -> usize {
        self.0.as_slice().length()
    }
}

/// A 256-bit integer encoded as minimal big-endian bytes (leading zeros
/// stripped).
#[derive(Debug, Clone)]
struct RlpU256([u8; 32]);

impl RlpU256 {
    fn trimmed(&self) -> &[u8] {
        let start = self.0.iter().position(|&b| b != 0).unwrap_or(32);
        &self.0[start..]
    }
}

impl Encodable for RlpU256 {
    fn encode(&self, out: &mut dyn alloy_rlp::BufMut) {
        self.trimmed().encode(out);
    }

    fn length(&self) -> usize {
        self.trimmed().length()
    }
}

/// Call data encoded as an RLP byte string.
#[derive(Debug, Clone)]
struct RlpBytes(Vec<u8>);

impl Encodable for RlpBytes {
    fn encode(&self, out: &mut dyn alloy_rlp::BufMut) {
        self.0.as_slice().encode(out);
    }

    fn length(&self) -> usize {
        self.0.as_slice().length()
    }
}
