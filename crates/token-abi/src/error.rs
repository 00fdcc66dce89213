use thiserror::Error;

/// ABI encoding, decoding, and schema errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AbiError {
    #[error("unknown function: {0}")]
    UnknownFunction(String),

    #[error("argument count mismatch for {function}: expected {expected}, got {actual}")]
    ArgumentCountMismatch {
        function: String,
        expected: usize,
        actual: usize,
    },

    #[error("argument type mismatch for {function} at position {index}: expected {expected}, got {actual}")]
    ArgumentTypeMismatch {
        function: String,
        index: usize,
        expected: String,
        actual: String,
    },

    #[error("decode length error for {function}: need {expected} bytes, got {actual}")]
    DecodeLength {
        function: String,
        expected: usize,
        actual: usize,
    },

    #[error("decode type error for {function} at position {index}: {reason}")]
    DecodeType {
        function: String,
        index: usize,
        reason: String,
    },

    #[error("invalid address {input:?}: {reason}")]
    InvalidAddress { input: String, reason: String },

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("invalid ABI schema: {0}")]
    InvalidSchema(String),
}

impl AbiError {
    pub(crate) fn invalid_address(input: &str, reason: impl Into<String>) -> Self {
        AbiError::InvalidAddress {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}
