use std::time::Duration;

use serde::{Deserialize, Serialize};
use token_abi::Address;

use crate::error::TokenError;

/// Definition of an EVM-compatible network.
#[derive(Debug, Clone, Serialize)]
pub struct EvmChain {
    pub chain_id: u64,
    pub name: &'static str,
    pub symbol: &'static str,
    pub rpc_url: &'static str,
    pub explorer_url: &'static str,
    pub is_testnet: bool,
}

/// BNB Smart Chain (chain ID 56).
pub const BSC: EvmChain = EvmChain {
    chain_id: 56,
    name: "BNB Smart Chain",
    symbol: "BNB",
    rpc_url: "https://bsc-dataseed1.binance.org/",
    explorer_url: "https://bscscan.com",
    is_testnet: false,
};

/// BNB Smart Chain Testnet (chain ID 97).
pub const BSC_TESTNET: EvmChain = EvmChain {
    chain_id: 97,
    name: "BNB Smart Chain Testnet",
    symbol: "tBNB",
    rpc_url: "https://data-seed-prebsc-1-s1.binance.org:8545/",
    explorer_url: "https://testnet.bscscan.com",
    is_testnet: true,
};

/// Ethereum Mainnet (chain ID 1).
pub const ETHEREUM: EvmChain = EvmChain {
    chain_id: 1,
    name: "Ethereum",
    symbol: "ETH",
    rpc_url: "https://eth.llamarpc.com",
    explorer_url: "https://etherscan.io",
    is_testnet: false,
};

/// Sepolia Testnet (chain ID 11155111).
pub const SEPOLIA: EvmChain = EvmChain {
    chain_id: 11155111,
    name: "Sepolia",
    symbol: "ETH",
    rpc_url: "https://rpc.sepolia.org",
    explorer_url: "https://sepolia.etherscan.io",
    is_testnet: true,
};

const ALL_CHAINS: &[&EvmChain] = &[&BSC, &BSC_TESTNET, &ETHEREUM, &SEPOLIA];

/// Looks up a known network by chain ID.
pub fn chain_by_id(chain_id: u64) -> Option<&'static EvmChain> {
    ALL_CHAINS.iter().copied().find(|c| c.chain_id == chain_id)
}

/// Address of the TRAG token contract on BNB Smart Chain.
pub const TRAG_CONTRACT: &str = "0x7Cc723dE7fBDb6B06d6628E259e6B8c62673BF1C";

/// Number of decimal places of the TRAG token.
pub const TRAG_DECIMALS: u8 = 6;

pub const DEFAULT_GAS_LIMIT: u64 = 100_000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Everything a [`crate::TokenClient`] needs to know about its token and
/// network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenConfig {
    pub contract_address: Address,
    pub rpc_url: String,
    pub chain_id: u64,
    /// Fixed scaling constant between raw units and human amounts.
    pub decimals: u8,
    /// Gas limit ceiling for every write.
    #[serde(default = "default_gas_limit")]
    pub gas_limit: u64,
    /// Per-request network timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_gas_limit() -> u64 {
    DEFAULT_GAS_LIMIT
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl TokenConfig {
    /// The TRAG token on BNB Smart Chain mainnet.
    pub fn trag_bsc() -> Self {
        Self {
            contract_address: Address::new(TRAG_CONTRACT_BYTES),
            rpc_url: BSC.rpc_url.to_string(),
            chain_id: BSC.chain_id,
            decimals: TRAG_DECIMALS,
            gas_limit: DEFAULT_GAS_LIMIT,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Loads a configuration from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, TokenError> {
        serde_json::from_str(json).map_err(|e| TokenError::Config(e.to_string()))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// The known network this configuration points at, if any.
    pub fn chain(&self) -> Option<&'static EvmChain> {
        chain_by_id(self.chain_id)
    }
}

const TRAG_CONTRACT_BYTES: [u8; 20] = [
    0x7c, 0xc7, 0x23, 0xde, 0x7f, 0xbd, 0xb6, 0xb0, 0x6d, 0x66, 0x28, 0xe2, 0x59, 0xe6, 0xb8,
    0xc6, 0x26, 0x73, 0xbf, 0x1c,
];
