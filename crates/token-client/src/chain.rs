//! The narrow interface the token client needs from the network.

use alloy_primitives::B256;
use thiserror::Error;
use token_abi::Address;

use crate::transaction::SignedTransaction;

/// Errors surfaced by a [`ChainClient`] implementation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChainError {
    #[error("transport error: {0}")]
    Transport(String),

    /// The node answered with a JSON-RPC error object. The message is kept
    /// verbatim (e.g. `nonce too low`, `insufficient funds for gas`).
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// A read-only contract call: no signer, no value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallMessage {
    pub to: Address,
    pub data: Vec<u8>,
}

/// Blocking access to an EVM node.
///
/// Implementations own transport, timeouts, and any retry policy; the token
/// client never retries a failed call itself.
pub trait ChainClient: Send + Sync {
    /// Executes a call against the latest state and returns the raw return
    /// data.
    fn call(&self, message: &CallMessage) -> Result<Vec<u8>, ChainError>;

    /// Returns the next nonce to use for `address`.
    fn nonce(&self, address: &Address) -> Result<u64, ChainError>;

    /// Returns the node's suggested gas price in wei.
    fn gas_price(&self) -> Result<u128, ChainError>;

    /// Broadcasts a signed transaction, returning the hash the node reports
    /// if it reports one.
    fn send_raw_transaction(&self, tx: &SignedTransaction) -> Result<Option<B256>, ChainError>;
}

impl<T: ChainClient + ?Sized> ChainClient for &T {
    fn call(&self, message: &CallMessage) -> Result<Vec<u8>, ChainError> {
        (**self).call(message)
    }

    fn nonce(&self, address: &Address) -> Result<u64, ChainError> {
        (**self).nonce(address)
    }

    fn gas_price(&self) -> Result<u128, ChainError> {
        (**self).gas_price()
    }

    fn send_raw_transaction(&self, tx: &SignedTransaction) -> Result<Option<B256>, ChainError> {
        (**self).send_raw_transaction(tx)
    }
}

impl<T: ChainClient + ?Sized> ChainClient for std::sync::Arc<T> {
    fn call(&self, message: &CallMessage) -> Result<Vec<u8>, ChainError> {
        (**self).call(message)
    }

    fn nonce(&self, address: &Address) -> Result<u64, ChainError> {
        (**self).nonce(address)
    }

    fn gas_price(&self) -> Result<u128, ChainError> {
        (**self).gas_price()
    }

    fn send_raw_transaction(&self, tx: &SignedTransaction) -> Result<Option<B256>, ChainError> {
        (**self).send_raw_transaction(tx)
    }
}
