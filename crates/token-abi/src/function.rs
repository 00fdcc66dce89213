//! Function descriptors for the token contract and the closed table that
//! holds them.
//!
//! The table is resolved once, either from the canonical ERC-20 signatures
//! or from an ABI JSON document, and is never mutated afterwards.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

use crate::error::AbiError;

/// The full ABI of the TRAG token contract on BNB Smart Chain, including its
/// events and custom errors.
pub const TRAG_ABI_JSON: &str = include_str!("../abi/trag_token.json");

/// A static or dynamic ABI type supported by this codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AbiType {
    Address,
    Bool,
    /// Unsigned integer of the given bit width (8..=256, multiple of 8).
    Uint(u16),
    /// UTF-8 string, encoded in the dynamic tail.
    String,
}

impl AbiType {
    pub fn is_dynamic(&self) -> bool {
        matches!(self, AbiType::String)
    }
}

impl fmt::Display for AbiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbiType::Address => f.write_str("address"),
            AbiType::Bool => f.write_str("bool"),
            AbiType::Uint(bits) => write!(f, "uint{bits}"),
            AbiType::String => f.write_str("string"),
        }
    }
}

impl FromStr for AbiType {
    type Err = AbiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "address" => Ok(AbiType::Address),
            "bool" => Ok(AbiType::Bool),
            "string" => Ok(AbiType::String),
            // `uint` is an alias for `uint256`.
            "uint" => Ok(AbiType::Uint(256)),
            _ => {
                let bits = s
                    .strip_prefix("uint")
                    .and_then(|b| b.parse::<u16>().ok())
                    .filter(|b| *b >= 8 && *b <= 256 && b % 8 == 0)
                    .ok_or_else(|| AbiError::InvalidSchema(format!("unsupported type {s:?}")))?;
                Ok(AbiType::Uint(bits))
            }
        }
    }
}

/// Declared state mutability of a contract function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateMutability {
    Pure,
    View,
    Nonpayable,
    Payable,
}

impl StateMutability {
    /// Whether calls to the function leave chain state untouched.
    pub fn is_read_only(&self) -> bool {
        matches!(self, StateMutability::Pure | StateMutability::View)
    }
}

/// A named, typed function parameter or return value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub kind: AbiType,
}

impl Param {
    fn new(name: &str, kind: AbiType) -> Self {
        Self {
            name: name.to_string(),
            kind,
        }
    }
}

/// Immutable description of one contract function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDescriptor {
    pub name: String,
    pub inputs: Vec<Param>,
    pub outputs: Vec<Param>,
    pub mutability: StateMutability,
}

impl FunctionDescriptor {
    /// Canonical textual signature, e.g. `transfer(address,uint256)`.
    pub fn signature(&self) -> String {
        let types: Vec<String> = self.inputs.iter().map(|p| p.kind.to_string()).collect();
        format!("{}({})", self.name, types.join(","))
    }

    /// First four bytes of the Keccak-256 hash of the signature.
    pub fn selector(&self) -> [u8; 4] {
        let hash = Keccak256::digest(self.signature().as_bytes());
        let mut selector = [0u8; 4];
        selector.copy_from_slice(&hash[..4]);
        selector
    }

    pub fn input_types(&self) -> Vec<AbiType> {
        self.inputs.iter().map(|p| p.kind).collect()
    }

    pub fn output_types(&self) -> Vec<AbiType> {
        self.outputs.iter().map(|p| p.kind).collect()
    }
}

/// The closed set of token contract functions this client speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TokenFunction {
    Name,
    Symbol,
    Decimals,
    TotalSupply,
    BalanceOf,
    Allowance,
    Transfer,
    Approve,
}

impl TokenFunction {
    pub const ALL: [TokenFunction; 8] = [
        TokenFunction::Name,
        TokenFunction::Symbol,
        TokenFunction::Decimals,
        TokenFunction::TotalSupply,
        TokenFunction::BalanceOf,
        TokenFunction::Allowance,
        TokenFunction::Transfer,
        TokenFunction::Approve,
    ];

    /// The function's name as it appears in the contract ABI.
    pub fn name(&self) -> &'static str {
        match self {
            TokenFunction::Name => "name",
            TokenFunction::Symbol => "symbol",
            TokenFunction::Decimals => "decimals",
            TokenFunction::TotalSupply => "totalSupply",
            TokenFunction::BalanceOf => "balanceOf",
            TokenFunction::Allowance => "allowance",
            TokenFunction::Transfer => "transfer",
            TokenFunction::Approve => "approve",
        }
    }

    /// The canonical ERC-20 descriptor for this function.
    pub fn descriptor(&self) -> FunctionDescriptor {
        use AbiType::*;

        let (inputs, outputs, mutability) = match self {
            TokenFunction::Name | TokenFunction::Symbol => (
                vec![],
                vec![Param::new("", String)],
                StateMutability::View,
            ),
            TokenFunction::Decimals => (vec![], vec![Param::new("", Uint(8))], StateMutability::View),
            TokenFunction::TotalSupply => {
                (vec![], vec![Param::new("", Uint(256))], StateMutability::View)
            }
            TokenFunction::BalanceOf => (
                vec![Param::new("account", Address)],
                vec![Param::new("", Uint(256))],
                StateMutability::View,
            ),
            TokenFunction::Allowance => (
                vec![Param::new("owner", Address), Param::new("spender", Address)],
                vec![Param::new("", Uint(256))],
                StateMutability::View,
            ),
            TokenFunction::Transfer => (
                vec![Param::new("recipient", Address), Param::new("amount", Uint(256))],
                vec![Param::new("", Bool)],
                StateMutability::Nonpayable,
            ),
            TokenFunction::Approve => (
                vec![Param::new("spender", Address), Param::new("amount", Uint(256))],
                vec![Param::new("", Bool)],
                StateMutability::Nonpayable,
            ),
        };

        FunctionDescriptor {
            name: self.name().to_string(),
            inputs,
            outputs,
            mutability,
        }
    }
}

impl fmt::Display for TokenFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TokenFunction {
    type Err = AbiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TokenFunction::ALL
            .into_iter()
            .find(|f| f.name() == s)
            .ok_or_else(|| AbiError::UnknownFunction(s.to_string()))
    }
}

/// Lookup table from [`TokenFunction`] to its descriptor.
#[derive(Debug, Clone)]
pub struct FunctionTable {
    functions: HashMap<TokenFunction, FunctionDescriptor>,
}

impl FunctionTable {
    /// Builds the table from the canonical ERC-20 signatures.
    pub fn erc20() -> Self {
        let functions = TokenFunction::ALL
            .into_iter()
            .map(|f| (f, f.descriptor()))
            .collect();
        Self { functions }
    }

    /// Builds the table from the embedded TRAG contract ABI.
    pub fn trag() -> Result<Self, AbiError> {
        Self::from_abi_json(TRAG_ABI_JSON)
    }

    /// Builds the table from a standard ABI JSON document.
    ///
    /// Events, errors, constructors, and functions outside the token set are
    /// skipped. Every [`TokenFunction`] must be present with its canonical
    /// input and output types.
    pub fn from_abi_json(json: &str) -> Result<Self, AbiError> {
        let entries: Vec<AbiEntry> = serde_json::from_str(json)
            .map_err(|e| AbiError::InvalidSchema(format!("malformed ABI JSON: {e}")))?;

        let mut functions = HashMap::new();
        for entry in entries.into_iter().filter(|e| e.kind == "function") {
            let Ok(function) = entry.name.parse::<TokenFunction>() else {
                continue;
            };
            let descriptor = entry.into_descriptor()?;
            check_against_canonical(function, &descriptor)?;
            functions.insert(function, descriptor);
        }

        if let Some(missing) = TokenFunction::ALL
            .into_iter()
            .find(|f| !functions.contains_key(f))
        {
            return Err(AbiError::InvalidSchema(format!("missing function {missing}")));
        }

        Ok(Self { functions })
    }

    pub fn get(&self, function: TokenFunction) -> &FunctionDescriptor {
        // Both constructors populate every variant.
        &self.functions[&function]
    }

    /// Resolves a descriptor by its ABI name.
    pub fn resolve(&self, name: &str) -> Result<&FunctionDescriptor, AbiError> {
        let function: TokenFunction = name.parse()?;
        self.functions
            .get(&function)
            .ok_or_else(|| AbiError::UnknownFunction(name.to_string()))
    }
}

fn check_against_canonical(
    function: TokenFunction,
    descriptor: &FunctionDescriptor,
) -> Result<(), AbiError> {
    let canonical = function.descriptor();

    if descriptor.input_types() != canonical.input_types()
        || descriptor.output_types() != canonical.output_types()
    {
        return Err(AbiError::InvalidSchema(format!(
            "{} does not match {}",
            descriptor.signature(),
            canonical.signature()
        )));
    }

    if descriptor.mutability.is_read_only() != canonical.mutability.is_read_only() {
        return Err(AbiError::InvalidSchema(format!(
            "{} has unexpected mutability {:?}",
            descriptor.signature(),
            descriptor.mutability
        )));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// ABI JSON entries
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct AbiEntry {
    #[serde(rename = "type", default = "default_entry_kind")]
    kind: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    inputs: Vec<AbiEntryParam>,
    #[serde(default)]
    outputs: Vec<AbiEntryParam>,
    #[serde(rename = "stateMutability")]
    state_mutability: Option<StateMutability>,
}

#[derive(Debug, Deserialize)]
struct AbiEntryParam {
    #[serde(default)]
    name: String,
    #[serde(rename = "type")]
    kind: String,
}

fn default_entry_kind() -> String {
    "function".to_string()
}

impl AbiEntry {
    fn into_descriptor(self) -> Result<FunctionDescriptor, AbiError> {
        let convert = |params: Vec<AbiEntryParam>| -> Result<Vec<Param>, AbiError> {
            params
                .into_iter()
                .map(|p| {
                    Ok(Param {
                        kind: p.kind.parse()?,
                        name: p.name,
                    })
                })
                .collect()
        };

        let mutability = self.state_mutability.ok_or_else(|| {
            AbiError::InvalidSchema(format!("{} has no stateMutability", self.name))
        })?;

        Ok(FunctionDescriptor {
            inputs: convert(self.inputs)?,
            outputs: convert(self.outputs)?,
            name: self.name,
            mutability,
        })
    }
}
