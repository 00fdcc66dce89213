use std::sync::Arc;

use serde::{Deserialize, Serialize};
use token_abi::{AbiCodec, AbiError, AbiValue, Address, FunctionTable, TokenFunction, U256};
use tracing::{debug, info, warn};

use crate::account::Account;
use crate::amount::{to_raw, DecimalAmount, TokenAmount};
use crate::call::CallBuilder;
use crate::chain::ChainClient;
use crate::config::TokenConfig;
use crate::error::TokenError;
use crate::nonce::NonceManager;
use crate::rpc::HttpChainClient;
use crate::transaction::{LegacyTransaction, SubmittedTransaction};

/// Token metadata as reported by the contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub total_supply: TokenAmount,
    pub contract_address: Address,
}

/// Client for one token contract, reached through a [`ChainClient`].
///
/// Reads work on any client. Writes need an account, supplied as a private
/// key at construction.
pub struct TokenClient<C> {
    config: TokenConfig,
    chain: C,
    codec: Arc<AbiCodec>,
    calls: CallBuilder,
    account: Option<Account>,
    nonces: NonceManager,
}

impl TokenClient<HttpChainClient> {
    /// Connects to the node named in `config` over HTTP JSON-RPC.
    ///
    /// The private key is validated before the node is contacted.
    pub fn connect(config: TokenConfig, private_key: Option<&str>) -> Result<Self, TokenError> {
        let account = private_key.map(Account::from_hex).transpose()?;
        let chain = HttpChainClient::connect(&config)?;
        Ok(Self::assemble(config, chain, FunctionTable::erc20(), account))
    }
}

impl<C: ChainClient> TokenClient<C> {
    /// Creates a client over an existing facade with the canonical function
    /// table.
    pub fn new(config: TokenConfig, chain: C, private_key: Option<&str>) -> Result<Self, TokenError> {
        Self::with_function_table(config, chain, FunctionTable::erc20(), private_key)
    }

    /// Creates a client whose function table was loaded from ABI JSON.
    pub fn with_function_table(
        config: TokenConfig,
        chain: C,
        table: FunctionTable,
        private_key: Option<&str>,
    ) -> Result<Self, TokenError> {
        let account = private_key.map(Account::from_hex).transpose()?;
        Ok(Self::assemble(config, chain, table, account))
    }

    fn assemble(config: TokenConfig, chain: C, table: FunctionTable, account: Option<Account>) -> Self {
        let codec = Arc::new(AbiCodec::new(table));
        let calls = CallBuilder::new(config.contract_address, Arc::clone(&codec));
        Self {
            config,
            chain,
            codec,
            calls,
            account,
            nonces: NonceManager::new(),
        }
    }

    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    pub fn chain(&self) -> &C {
        &self.chain
    }

    pub fn codec(&self) -> &AbiCodec {
        &self.codec
    }

    pub fn contract_address(&self) -> Address {
        self.config.contract_address
    }

    /// Address of the configured account, if the client can write.
    pub fn address(&self) -> Option<Address> {
        self.account.as_ref().map(Account::address)
    }

    /// Reads name, symbol, decimals and total supply.
    ///
    /// The total supply is scaled with the configured decimals.
    pub fn token_info(&self) -> Result<TokenInfo, TokenError> {
        let name = self.read_string(TokenFunction::Name)?;
        let symbol = self.read_string(TokenFunction::Symbol)?;
        let decimals = self.read_decimals()?;
        let total_supply = self.read_uint(TokenFunction::TotalSupply, &[])?;

        if decimals != self.config.decimals {
            warn!(
                on_chain = decimals,
                configured = self.config.decimals,
                contract = %self.config.contract_address,
                "contract decimals differ from configuration"
            );
        }

        Ok(TokenInfo {
            name,
            symbol,
            decimals,
            total_supply: TokenAmount::from_raw(total_supply, self.config.decimals),
            contract_address: self.config.contract_address,
        })
    }

    /// Token balance of `address`.
    pub fn balance(&self, address: &str) -> Result<TokenAmount, TokenError> {
        let owner = parse_address(address)?;
        let raw = self.read_uint(TokenFunction::BalanceOf, &[owner.into()])?;
        Ok(TokenAmount::from_raw(raw, self.config.decimals))
    }

    /// Amount `spender` may still move on behalf of `owner`.
    pub fn allowance(&self, owner: &str, spender: &str) -> Result<TokenAmount, TokenError> {
        let owner = parse_address(owner)?;
        let spender = parse_address(spender)?;
        let raw = self.read_uint(TokenFunction::Allowance, &[owner.into(), spender.into()])?;
        Ok(TokenAmount::from_raw(raw, self.config.decimals))
    }

    /// Sends `amount` tokens to `to`.
    pub fn transfer(&self, to: &str, amount: &DecimalAmount) -> Result<SubmittedTransaction, TokenError> {
        self.write(TokenFunction::Transfer, to, amount)
    }

    /// Allows `spender` to move up to `amount` tokens from this account.
    pub fn approve(&self, spender: &str, amount: &DecimalAmount) -> Result<SubmittedTransaction, TokenError> {
        self.write(TokenFunction::Approve, spender, amount)
    }

    fn read(&self, function: TokenFunction, args: &[AbiValue]) -> Result<Vec<AbiValue>, TokenError> {
        let message = self.calls.build(function, args)?;
        let data = self.chain.call(&message).map_err(|source| TokenError::Call {
            function: function.name().to_string(),
            source,
        })?;
        debug!(function = function.name(), bytes = data.len(), "call returned");

        Ok(self.codec.decode(function.name(), &data)?)
    }

    fn read_uint(&self, function: TokenFunction, args: &[AbiValue]) -> Result<U256, TokenError> {
        let values = self.read(function, args)?;
        first(function, &values, AbiValue::as_uint)
    }

    fn read_string(&self, function: TokenFunction) -> Result<String, TokenError> {
        let values = self.read(function, &[])?;
        first(function, &values, |v| v.as_str().map(str::to_owned))
    }

    fn read_decimals(&self) -> Result<u8, TokenError> {
        let value = self.read_uint(TokenFunction::Decimals, &[])?;
        if value > U256::from(u8::MAX) {
            return Err(AbiError::DecodeType {
                function: TokenFunction::Decimals.name().to_string(),
                index: 0,
                reason: format!("{value} does not fit uint8"),
            }
            .into());
        }
        Ok(value.as_limbs()[0] as u8)
    }

    /// Builds, signs and broadcasts `function(target, amount)`.
    ///
    /// The account's nonce slot is held from the nonce fetch until the
    /// broadcast returns.
    fn write(
        &self,
        function: TokenFunction,
        target: &str,
        amount: &DecimalAmount,
    ) -> Result<SubmittedTransaction, TokenError> {
        let account = self
            .account
            .as_ref()
            .ok_or_else(|| TokenError::MissingKey(function.name().to_string()))?;

        let target = parse_address(target)?;
        let raw = to_raw(amount, self.config.decimals)?;
        let data = self.codec.encode(function.name(), &[target.into(), raw.into()])?;
        let from = account.address();

        self.nonces.with_account(&from, |guard| -> Result<SubmittedTransaction, TokenError> {
            let network_nonce = self.chain.nonce(&from).map_err(|source| TokenError::NonceFetch {
                address: from.to_string(),
                source,
            })?;
            let nonce = guard.reconcile(network_nonce);
            let gas_price = self.chain.gas_price().map_err(TokenError::GasPriceFetch)?;

            let signed = LegacyTransaction {
                nonce,
                gas_price,
                gas_limit: self.config.gas_limit,
                to: self.config.contract_address,
                value: U256::ZERO,
                data,
            }
            .sign(account, self.config.chain_id)?;

            let reported = self.chain.send_raw_transaction(&signed).map_err(|source| {
                warn!(function = function.name(), nonce, error = %source, "broadcast rejected");
                TokenError::Broadcast {
                    function: function.name().to_string(),
                    source,
                }
            })?;
            guard.commit(nonce);

            let hash = match reported {
                Some(hash) if hash != signed.hash => {
                    warn!(reported = %hash, local = %signed.hash, "node reported a different transaction hash");
                    hash
                }
                Some(hash) => hash,
                None => signed.hash,
            };

            info!(
                function = function.name(),
                from = %from,
                to = %target,
                amount = %amount,
                nonce,
                hash = %hash,
                "transaction submitted"
            );

            Ok(SubmittedTransaction { hash, signed })
        })
    }
}

fn parse_address(input: &str) -> Result<Address, TokenError> {
    input.parse().map_err(TokenError::invalid_address)
}

fn first<T>(
    function: TokenFunction,
    values: &[AbiValue],
    pick: impl FnOnce(&AbiValue) -> Option<T>,
) -> Result<T, TokenError> {
    values.first().and_then(pick).ok_or_else(|| {
        AbiError::DecodeType {
            function: function.name().to_string(),
            index: 0,
            reason: "unexpected return value".to_string(),
        }
        .into()
    })
}
