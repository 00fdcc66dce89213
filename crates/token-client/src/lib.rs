//! Client for a single ERC-20 token contract on an EVM chain.
//!
//! This crate provides:
//! - Exact scaling between raw token units and decimal amounts
//! - Read calls (name, symbol, decimals, total supply, balance, allowance)
//! - Legacy EIP-155 transaction signing for `transfer` and `approve`
//! - Per-account nonce serialization for concurrent writes
//! - A narrow [`ChainClient`] facade with a JSON-RPC implementation over HTTP
//!
//! ```no_run
//! use token_client::{TokenClient, TokenConfig};
//!
//! let client = TokenClient::connect(TokenConfig::trag_bsc(), None)?;
//! let info = client.token_info()?;
//! println!("{} ({}) supply {}", info.name, info.symbol, info.total_supply);
//! # Ok::<(), token_client::TokenError>(())
//! ```

pub mod account;
pub mod amount;
pub mod call;
pub mod chain;
pub mod client;
pub mod config;
pub mod error;
pub mod nonce;
pub mod rpc;
pub mod transaction;

pub use account::{Account, Signature};
pub use amount::{to_decimal, to_raw, DecimalAmount, TokenAmount};
pub use call::CallBuilder;
pub use chain::{CallMessage, ChainClient, ChainError};
pub use client::{TokenClient, TokenInfo};
pub use config::{EvmChain, TokenConfig};
pub use error::TokenError;
pub use nonce::NonceManager;
pub use rpc::HttpChainClient;
pub use transaction::{LegacyTransaction, SignedTransaction, SubmittedTransaction};

pub use token_abi::{self, Address, U256};
