//! Fixed-point scaling between raw on-chain token units and human decimal
//! amounts.
//!
//! All arithmetic is arbitrary-precision; no value ever passes through a
//! binary float.

use std::fmt;
use std::str::FromStr;

use alloy_primitives::U256;
use num_bigint::{BigInt, BigUint, Sign};
use num_integer::Integer;
use num_traits::{Signed, Zero};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TokenError;

/// An exact decimal number: `mantissa * 10^-scale`.
///
/// Values are kept normalized (no trailing zeros after the decimal point),
/// so equality is equality of value: `"100.0" == "100"`.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct DecimalAmount {
    mantissa: BigInt,
    scale: u32,
}

impl DecimalAmount {
    pub fn new(mantissa: impl Into<BigInt>, scale: u32) -> Self {
        let mut amount = Self {
            mantissa: mantissa.into(),
            scale,
        };
        amount.normalize();
        amount
    }

    pub fn zero() -> Self {
        Self::default()
    }

    pub fn mantissa(&self) -> &BigInt {
        &self.mantissa
    }

    /// Number of digits after the decimal point.
    pub fn scale(&self) -> u32 {
        self.scale
    }

    pub fn is_negative(&self) -> bool {
        self.mantissa.is_negative()
    }

    pub fn is_zero(&self) -> bool {
        self.mantissa.is_zero()
    }

    /// Strips trailing fractional zeros with a single division.
    fn normalize(&mut self) {
        let Some(twos) = self.mantissa.trailing_zeros() else {
            self.scale = 0;
            return;
        };

        // 10^k divides the mantissa only if 2^k does.
        let ten = BigInt::from(10u8);
        let (mut low, mut high) = (0, u32::try_from(twos).unwrap_or(u32::MAX).min(self.scale));
        while low < high {
            let mid = low + (high - low + 1) / 2;
            if (&self.mantissa % ten.pow(mid)).is_zero() {
                low = mid;
            } else {
                high = mid - 1;
            }
        }

        if low > 0 {
            self.mantissa /= ten.pow(low);
            self.scale -= low;
        }
    }
}

impl From<u64> for DecimalAmount {
    fn from(value: u64) -> Self {
        Self::new(value, 0)
    }
}

impl FromStr for DecimalAmount {
    type Err = TokenError;

    /// Parses plain decimal notation: an optional sign, integer digits, and
    /// an optional fractional part (`"100"`, `"-0.5"`, `"1.250"`, `".5"`).
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| TokenError::InvalidAmount {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let s = input.trim();
        let (negative, unsigned) = match s.as_bytes().first() {
            Some(b'-') => (true, &s[1..]),
            Some(b'+') => (false, &s[1..]),
            _ => (false, s),
        };

        let (int_part, frac_part) = match unsigned.split_once('.') {
            Some((i, f)) => (i, f),
            None => (unsigned, ""),
        };

        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid("no digits"));
        }
        if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid("expected digits with an optional decimal point"));
        }

        let frac_part = frac_part.trim_end_matches('0');
        let digits = format!("{int_part}{frac_part}");
        let magnitude = if digits.is_empty() {
            BigUint::zero()
        } else {
            BigUint::parse_bytes(digits.as_bytes(), 10)
                .ok_or_else(|| invalid("expected digits with an optional decimal point"))?
        };
        let sign = if negative { Sign::Minus } else { Sign::Plus };
        let scale = u32::try_from(frac_part.len()).map_err(|_| invalid("too many fractional digits"))?;

        Ok(Self::new(BigInt::from_biguint(sign, magnitude), scale))
    }
}

impl fmt::Display for DecimalAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.mantissa.abs().to_str_radix(10);
        let scale = self.scale as usize;

        let rendered = if scale == 0 {
            digits
        } else {
            let padded = format!("{digits:0>width$}", width = scale + 1);
            let (whole, fraction) = padded.split_at(padded.len() - scale);
            format!("{whole}.{fraction}")
        };

        f.pad_integral(!self.mantissa.is_negative(), "", &rendered)
    }
}

impl fmt::Debug for DecimalAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DecimalAmount({self})")
    }
}

impl Serialize for DecimalAmount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DecimalAmount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A token quantity in both representations. `raw` is authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenAmount {
    pub raw: U256,
    pub decimal: DecimalAmount,
}

impl TokenAmount {
    pub fn from_raw(raw: U256, decimals: u8) -> Self {
        Self {
            raw,
            decimal: to_decimal(raw, decimals),
        }
    }
}

#[derive(Deserialize)]
struct TokenAmountFields {
    raw: U256,
    decimal: DecimalAmount,
}

impl<'de> Deserialize<'de> for TokenAmount {
    /// Accepts only pairs where `decimal` is `raw` scaled by some `u8`
    /// decimals value.
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let TokenAmountFields { raw, decimal } = TokenAmountFields::deserialize(deserializer)?;
        if (0..=u8::MAX).any(|decimals| to_decimal(raw, decimals) == decimal) {
            Ok(Self { raw, decimal })
        } else {
            Err(serde::de::Error::custom(format!(
                "decimal {decimal} is not raw {raw} at any decimals"
            )))
        }
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.decimal, f)
    }
}

/// Scales a human amount to raw units: `amount * 10^decimals`, truncating
/// any digits finer than one raw unit.
pub fn to_raw(amount: &DecimalAmount, decimals: u8) -> Result<U256, TokenError> {
    if amount.is_negative() {
        return Err(TokenError::NegativeAmount(amount.to_string()));
    }

    let decimals = u32::from(decimals);
    let scaled = if amount.scale <= decimals {
        &amount.mantissa * BigInt::from(10u8).pow(decimals - amount.scale)
    } else {
        // Integer division of a non-negative value truncates toward zero.
        &amount.mantissa / BigInt::from(10u8).pow(amount.scale - decimals)
    };

    let magnitude = scaled
        .to_biguint()
        .ok_or_else(|| TokenError::NegativeAmount(amount.to_string()))?;
    U256::try_from_be_slice(&magnitude.to_bytes_be()).ok_or_else(|| {
        TokenError::Precision(format!(
            "{amount} with {decimals} decimals exceeds the uint256 range"
        ))
    })
}

/// Scales raw units to an exact human amount: `raw / 10^decimals`.
pub fn to_decimal(raw: U256, decimals: u8) -> DecimalAmount {
    let magnitude = BigUint::from_bytes_be(&raw.to_be_bytes::<32>());
    DecimalAmount::new(BigInt::from(magnitude), u32::from(decimals))
}
