//! ABI support for the TRAG token contract.
//!
//! This crate provides:
//! - 20-byte EVM addresses with EIP-55 checksums and public-key derivation
//! - The closed table of token contract functions, loadable from ABI JSON
//! - Call data encoding and return data decoding for those functions

pub mod abi;
pub mod address;
pub mod error;
pub mod function;

pub use abi::{AbiCodec, AbiValue};
pub use address::Address;
pub use error::AbiError;
pub use function::{AbiType, FunctionDescriptor, FunctionTable, StateMutability, TokenFunction};

// Re-export the integer type used for raw token amounts.
pub use alloy_primitives::U256;
