use thiserror::Error;
use token_abi::AbiError;

use crate::chain::ChainError;

/// Token client errors.
///
/// Each variant names the step that failed; facade failures keep the
/// underlying [`ChainError`] as their source.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("invalid address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("invalid private key: {0}")]
    InvalidKey(String),

    #[error("invalid amount {input:?}: {reason}")]
    InvalidAmount { input: String, reason: String },

    #[error("negative amount: {0}")]
    NegativeAmount(String),

    #[error("precision error: {0}")]
    Precision(String),

    #[error(transparent)]
    Abi(#[from] AbiError),

    #[error("call to {function} failed: {source}")]
    Call {
        function: String,
        #[source]
        source: ChainError,
    },

    #[error("private key required for {0}")]
    MissingKey(String),

    #[error("failed to fetch nonce for {address}: {source}")]
    NonceFetch {
        address: String,
        #[source]
        source: ChainError,
    },

    #[error("failed to fetch gas price: {0}")]
    GasPriceFetch(#[source] ChainError),

    #[error("signing error: {0}")]
    Signing(String),

    #[error("broadcast of {function} rejected: {source}")]
    Broadcast {
        function: String,
        #[source]
        source: ChainError,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

impl TokenError {
    pub(crate) fn invalid_address(error: AbiError) -> Self {
        match error {
            AbiError::InvalidAddress { input, reason } => TokenError::InvalidAddress {
                address: input,
                reason,
            },
            other => TokenError::Abi(other),
        }
    }
}
