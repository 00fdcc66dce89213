use std::sync::Arc;

use token_abi::{AbiCodec, AbiError, AbiValue, Address, TokenFunction};
use tracing::debug;

use crate::chain::CallMessage;

/// Builds read-only call messages addressed to the token contract.
#[derive(Debug, Clone)]
pub struct CallBuilder {
    contract: Address,
    codec: Arc<AbiCodec>,
}

impl CallBuilder {
    pub fn new(contract: Address, codec: Arc<AbiCodec>) -> Self {
        Self { contract, codec }
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    /// Encodes `function(args)` and wraps it for the contract. No network
    /// access.
    pub fn build_call(&self, function: &str, args: &[AbiValue]) -> Result<CallMessage, AbiError> {
        let data = self.codec.encode(function, args)?;
        debug!(function, contract = %self.contract, calldata = %hex::encode(&data), "built call");

        Ok(CallMessage {
            to: self.contract,
            data,
        })
    }

    pub fn build(&self, function: TokenFunction, args: &[AbiValue]) -> Result<CallMessage, AbiError> {
        self.build_call(function.name(), args)
    }
}
