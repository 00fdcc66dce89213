//! ABI encoding and decoding for token contract calls.
//!
//! Call data is `selector || head || tail`. Static values (addresses,
//! unsigned integers, bools) occupy one 32-byte head word each; a string
//! occupies an offset word in the head and a length word plus right-padded
//! bytes in the tail. Return data carries no selector.

use std::fmt;

use alloy_primitives::U256;

use crate::address::Address;
use crate::error::AbiError;
use crate::function::{AbiType, FunctionDescriptor, FunctionTable, TokenFunction};

const WORD: usize = 32;

/// A single ABI value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiValue {
    Address(Address),
    Uint(U256),
    Bool(bool),
    String(String),
}

impl AbiValue {
    /// Short name of the value's kind, used in mismatch errors.
    pub fn kind_name(&self) -> &'static str {
        match self {
            AbiValue::Address(_) => "address",
            AbiValue::Uint(_) => "uint",
            AbiValue::Bool(_) => "bool",
            AbiValue::String(_) => "string",
        }
    }

    pub fn as_address(&self) -> Option<Address> {
        match self {
            AbiValue::Address(a) => Some(*a),
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<U256> {
        match self {
            AbiValue::Uint(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AbiValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AbiValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for AbiValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbiValue::Address(a) => write!(f, "{a}"),
            AbiValue::Uint(v) => write!(f, "{v}"),
            AbiValue::Bool(b) => write!(f, "{b}"),
            AbiValue::String(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<Address> for AbiValue {
    fn from(address: Address) -> Self {
        AbiValue::Address(address)
    }
}

impl From<U256> for AbiValue {
    fn from(value: U256) -> Self {
        AbiValue::Uint(value)
    }
}

impl From<bool> for AbiValue {
    fn from(value: bool) -> Self {
        AbiValue::Bool(value)
    }
}

impl From<String> for AbiValue {
    fn from(value: String) -> Self {
        AbiValue::String(value)
    }
}

impl From<&str> for AbiValue {
    fn from(value: &str) -> Self {
        AbiValue::String(value.to_string())
    }
}

/// Encoder/decoder bound to a fixed [`FunctionTable`].
#[derive(Debug, Clone)]
pub struct AbiCodec {
    table: FunctionTable,
}

impl Default for AbiCodec {
    fn default() -> Self {
        Self::new(FunctionTable::erc20())
    }
}

impl AbiCodec {
    pub fn new(table: FunctionTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &FunctionTable {
        &self.table
    }

    pub fn descriptor(&self, function: TokenFunction) -> &FunctionDescriptor {
        self.table.get(function)
    }

    /// Encodes a call to `function` with `args` as `selector || params`.
    pub fn encode(&self, function: &str, args: &[AbiValue]) -> Result<Vec<u8>, AbiError> {
        let descriptor = self.table.resolve(function)?;
        encode_call(descriptor, args)
    }

    /// Decodes the return data of `function` into its output values.
    pub fn decode(&self, function: &str, data: &[u8]) -> Result<Vec<AbiValue>, AbiError> {
        let descriptor = self.table.resolve(function)?;
        decode_params(&descriptor.name, &descriptor.output_types(), data)
    }

    /// Decodes call data produced by [`AbiCodec::encode`] back into its
    /// arguments, checking the selector first.
    pub fn decode_call(&self, function: &str, calldata: &[u8]) -> Result<Vec<AbiValue>, AbiError> {
        let descriptor = self.table.resolve(function)?;

        if calldata.len() < 4 {
            return Err(AbiError::DecodeLength {
                function: descriptor.name.clone(),
                expected: 4,
                actual: calldata.len(),
            });
        }
        if calldata[..4] != descriptor.selector() {
            return Err(AbiError::DecodeType {
                function: descriptor.name.clone(),
                index: 0,
                reason: format!("selector 0x{} does not match", hex::encode(&calldata[..4])),
            });
        }

        decode_params(&descriptor.name, &descriptor.input_types(), &calldata[4..])
    }
}

/// Encodes a function call for `descriptor`, checking argument count and
/// types.
pub fn encode_call(descriptor: &FunctionDescriptor, args: &[AbiValue]) -> Result<Vec<u8>, AbiError> {
    if args.len() != descriptor.inputs.len() {
        return Err(AbiError::ArgumentCountMismatch {
            function: descriptor.name.clone(),
            expected: descriptor.inputs.len(),
            actual: args.len(),
        });
    }

    let types = descriptor.input_types();
    for (index, (kind, value)) in types.iter().zip(args).enumerate() {
        check_argument(&descriptor.name, index, *kind, value)?;
    }

    let params = encode_params(args);
    let mut data = Vec::with_capacity(4 + params.len());
    data.extend_from_slice(&descriptor.selector());
    data.extend_from_slice(&params);
    Ok(data)
}

fn check_argument(function: &str, index: usize, kind: AbiType, value: &AbiValue) -> Result<(), AbiError> {
    let mismatch = |actual: String| AbiError::ArgumentTypeMismatch {
        function: function.to_string(),
        index,
        expected: kind.to_string(),
        actual,
    };

    match (kind, value) {
        (AbiType::Address, AbiValue::Address(_))
        | (AbiType::Bool, AbiValue::Bool(_))
        | (AbiType::String, AbiValue::String(_)) => Ok(()),
        (AbiType::Uint(bits), AbiValue::Uint(v)) => {
            if v.bit_len() > bits as usize {
                Err(mismatch(format!("uint value {v} wider than {bits} bits")))
            } else {
                Ok(())
            }
        }
        (_, other) => Err(mismatch(other.kind_name().to_string())),
    }
}

/// Encodes values with the standard head/tail layout (no selector).
pub fn encode_params(values: &[AbiValue]) -> Vec<u8> {
    let head_len = values.len() * WORD;
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for value in values {
        match value {
            AbiValue::Address(address) => {
                // Left-pad: 12 zero bytes + 20 address bytes.
                let mut word = [0u8; WORD];
                word[12..].copy_from_slice(address.as_bytes());
                head.extend_from_slice(&word);
            }
            AbiValue::Uint(v) => head.extend_from_slice(&v.to_be_bytes::<WORD>()),
            AbiValue::Bool(b) => head.extend_from_slice(&U256::from(*b as u8).to_be_bytes::<WORD>()),
            AbiValue::String(s) => {
                let offset = head_len + tail.len();
                head.extend_from_slice(&U256::from(offset).to_be_bytes::<WORD>());

                let bytes = s.as_bytes();
                tail.extend_from_slice(&U256::from(bytes.len()).to_be_bytes::<WORD>());
                tail.extend_from_slice(bytes);
                let padding = (WORD - bytes.len() % WORD) % WORD;
                tail.resize(tail.len() + padding, 0);
            }
        }
    }

    head.extend_from_slice(&tail);
    head
}

/// Decodes `data` as a sequence of `types` (no selector expected).
///
/// `function` is used only for error context.
pub fn decode_params(function: &str, types: &[AbiType], data: &[u8]) -> Result<Vec<AbiValue>, AbiError> {
    let head_len = types.len() * WORD;
    if data.len() < head_len {
        return Err(AbiError::DecodeLength {
            function: function.to_string(),
            expected: head_len,
            actual: data.len(),
        });
    }

    types
        .iter()
        .enumerate()
        .map(|(index, kind)| {
            let word = &data[index * WORD..(index + 1) * WORD];
            decode_word(function, index, *kind, word, data)
        })
        .collect()
}

fn decode_word(
    function: &str,
    index: usize,
    kind: AbiType,
    word: &[u8],
    data: &[u8],
) -> Result<AbiValue, AbiError> {
    let type_error = |reason: String| AbiError::DecodeType {
        function: function.to_string(),
        index,
        reason,
    };

    match kind {
        AbiType::Address => {
            if word[..12].iter().any(|b| *b != 0) {
                return Err(type_error("address word has non-zero high bytes".into()));
            }
            let mut bytes = [0u8; 20];
            bytes.copy_from_slice(&word[12..]);
            Ok(AbiValue::Address(Address::new(bytes)))
        }
        AbiType::Uint(bits) => {
            let value = U256::from_be_slice(word);
            if value.bit_len() > bits as usize {
                return Err(type_error(format!("value {value} does not fit uint{bits}")));
            }
            Ok(AbiValue::Uint(value))
        }
        AbiType::Bool => match U256::from_be_slice(word) {
            v if v.is_zero() => Ok(AbiValue::Bool(false)),
            v if v == U256::from(1u8) => Ok(AbiValue::Bool(true)),
            _ => Err(type_error("bool word is not 0 or 1".into())),
        },
        AbiType::String => {
            let length_error = |expected: usize| AbiError::DecodeLength {
                function: function.to_string(),
                expected,
                actual: data.len(),
            };

            let offset = word_to_usize(word).ok_or_else(|| length_error(usize::MAX))?;
            let len_end = offset.checked_add(WORD).ok_or_else(|| length_error(usize::MAX))?;
            if data.len() < len_end {
                return Err(length_error(len_end));
            }

            let len = word_to_usize(&data[offset..len_end]).ok_or_else(|| length_error(usize::MAX))?;
            let end = len_end.checked_add(len).ok_or_else(|| length_error(usize::MAX))?;
            if data.len() < end {
                return Err(length_error(end));
            }

            let s = std::str::from_utf8(&data[len_end..end])
                .map_err(|e| type_error(format!("string is not UTF-8: {e}")))?;
            Ok(AbiValue::String(s.to_string()))
        }
    }
}

/// Interprets a 32-byte word as an offset or length, if it fits `usize`.
fn word_to_usize(word: &[u8]) -> Option<usize> {
    let value = U256::from_be_slice(word);
    if value.bit_len() > 64 {
        return None;
    }
    usize::try_from(value.as_limbs()[0]).ok()
}
