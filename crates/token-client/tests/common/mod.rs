//! A scripted in-memory [`ChainClient`] that answers token calls from a
//! fixed ledger and records every request it receives.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use alloy_primitives::B256;
use token_client::token_abi::abi::encode_params;
use token_client::token_abi::{AbiCodec, AbiValue, TokenFunction};
use token_client::{Address, CallMessage, ChainClient, ChainError, SignedTransaction, TokenConfig, U256};

pub const KEY: &str = "0x0000000000000000000000000000000000000000000000000000000000000001";
pub const KEY_ADDRESS: &str = "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf";
pub const RECIPIENT: &str = "0x3535353535353535353535353535353535353535";

pub fn config() -> TokenConfig {
    let mut config = TokenConfig::trag_bsc();
    config.rpc_url = "http://mock.invalid".into();
    config
}

pub struct MockChain {
    pub codec: AbiCodec,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub total_supply: U256,
    pub balances: HashMap<Address, U256>,
    pub allowances: HashMap<(Address, Address), U256>,
    /// Returned verbatim by every `call`, bypassing the ledger.
    pub raw_return: Option<Vec<u8>>,
    /// Pending nonce the node reports; never advanced by broadcasts.
    pub network_nonce: u64,
    pub gas_price: u128,
    /// Hash reported on broadcast; `None` makes the node report nothing.
    pub reported_hash: Option<B256>,
    /// Delay inside `nonce` to widen race windows.
    pub nonce_delay: Duration,
    pub rejections: Mutex<Vec<ChainError>>,
    pub gas_price_failures: Mutex<Vec<ChainError>>,
    pub broadcasts: Mutex<Vec<SignedTransaction>>,
    pub call_count: AtomicUsize,
    pub nonce_count: AtomicUsize,
    pub gas_price_count: AtomicUsize,
    pub broadcast_count: AtomicUsize,
}

impl Default for MockChain {
    fn default() -> Self {
        Self {
            codec: AbiCodec::default(),
            name: "TRAG Token".into(),
            symbol: "TRAG".into(),
            decimals: 6,
            total_supply: U256::from(1_000_000_000_000_000u64),
            balances: HashMap::new(),
            allowances: HashMap::new(),
            raw_return: None,
            network_nonce: 5,
            gas_price: 3_000_000_000,
            reported_hash: None,
            nonce_delay: Duration::ZERO,
            rejections: Mutex::new(Vec::new()),
            gas_price_failures: Mutex::new(Vec::new()),
            broadcasts: Mutex::new(Vec::new()),
            call_count: AtomicUsize::new(0),
            nonce_count: AtomicUsize::new(0),
            gas_price_count: AtomicUsize::new(0),
            broadcast_count: AtomicUsize::new(0),
        }
    }
}

impl MockChain {
    /// Makes the next broadcast fail with `error`.
    pub fn reject_next(&self, error: ChainError) {
        self.rejections.lock().unwrap().push(error);
    }

    /// Makes the next gas price query fail with `error`.
    pub fn fail_gas_price_next(&self, error: ChainError) {
        self.gas_price_failures.lock().unwrap().push(error);
    }

    pub fn broadcasts(&self) -> Vec<SignedTransaction> {
        self.broadcasts.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn total_requests(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
            + self.nonce_count.load(Ordering::SeqCst)
            + self.gas_price_count.load(Ordering::SeqCst)
            + self.broadcast_count.load(Ordering::SeqCst)
    }

    fn answer(&self, function: TokenFunction, args: &[AbiValue]) -> Vec<AbiValue> {
        let address = |i: usize| args[i].as_address().unwrap();
        match function {
            TokenFunction::Name => vec![self.name.clone().into()],
            TokenFunction::Symbol => vec![self.symbol.clone().into()],
            TokenFunction::Decimals => vec![U256::from(self.decimals).into()],
            TokenFunction::TotalSupply => vec![self.total_supply.into()],
            TokenFunction::BalanceOf => {
                vec![self.balances.get(&address(0)).copied().unwrap_or_default().into()]
            }
            TokenFunction::Allowance => vec![self
                .allowances
                .get(&(address(0), address(1)))
                .copied()
                .unwrap_or_default()
                .into()],
            TokenFunction::Transfer | TokenFunction::Approve => vec![true.into()],
        }
    }
}

impl ChainClient for MockChain {
    fn call(&self, message: &CallMessage) -> Result<Vec<u8>, ChainError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Some(raw) = &self.raw_return {
            return Ok(raw.clone());
        }

        let function = TokenFunction::ALL
            .into_iter()
            .find(|f| message.data.starts_with(&self.codec.descriptor(*f).selector()))
            .ok_or_else(|| ChainError::Rpc {
                code: -32000,
                message: "execution reverted".into(),
            })?;
        let args = self
            .codec
            .decode_call(function.name(), &message.data)
            .map_err(|e| ChainError::Rpc {
                code: -32000,
                message: e.to_string(),
            })?;

        Ok(encode_params(&self.answer(function, &args)))
    }

    fn nonce(&self, _: &Address) -> Result<u64, ChainError> {
        self.nonce_count.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.nonce_delay);
        Ok(self.network_nonce)
    }

    fn gas_price(&self) -> Result<u128, ChainError> {
        self.gas_price_count.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.gas_price_failures.lock().unwrap().pop() {
            return Err(error);
        }
        Ok(self.gas_price)
    }

    fn send_raw_transaction(&self, tx: &SignedTransaction) -> Result<Option<B256>, ChainError> {
        self.broadcast_count.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.rejections.lock().unwrap().pop() {
            return Err(error);
        }
        self.broadcasts.lock().unwrap().push(tx.clone());
        Ok(self.reported_hash)
    }
}
