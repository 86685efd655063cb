//! Fixed-point arithmetic and mathematical utilities.
//!
//! Two number systems live here: the 1e8 integer scale used for prices and
//! ratios (plain `u128` with checked `mul_div`), and the binary UQ112x112
//! format used by AMM price accumulators, held in a 256-bit word.

use ethnum::U256;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::error::{Error, Result};
use crate::utils::constants::{PRICE_PRECISION, UQ112_RESOLUTION};

// ═══════════════════════════════════════════════════════════════════════════════
// SAFE ARITHMETIC
// ═══════════════════════════════════════════════════════════════════════════════

/// Checked addition
pub fn safe_add(a: u128, b: u128) -> Result<u128> {
    a.checked_add(b)
        .ok_or_else(|| Error::overflow(&format!("{} + {}", a, b)))
}

/// Checked subtraction
pub fn safe_sub(a: u128, b: u128) -> Result<u128> {
    a.checked_sub(b)
        .ok_or_else(|| Error::overflow(&format!("{} - {}", a, b)))
}

/// Checked multiplication
pub fn safe_mul(a: u128, b: u128) -> Result<u128> {
    a.checked_mul(b)
        .ok_or_else(|| Error::overflow(&format!("{} * {}", a, b)))
}

/// Computes `a * b / c` rounding down, with a 256-bit intermediate product
pub fn safe_mul_div(a: u128, b: u128, c: u128) -> Result<u128> {
    if c == 0 {
        return Err(Error::division_by_zero(&format!("({} * {}) / 0", a, b)));
    }
    let result = U256::from(a) * U256::from(b) / U256::from(c);
    to_u128(result, &format!("({} * {}) / {}", a, b, c))
}

/// Computes `a * b / c` rounding up
pub fn safe_mul_div_up(a: u128, b: u128, c: u128) -> Result<u128> {
    if c == 0 {
        return Err(Error::division_by_zero(&format!("ceil(({} * {}) / 0)", a, b)));
    }
    let divisor = U256::from(c);
    let numerator = U256::from(a) * U256::from(b);
    let result = (numerator + divisor - U256::ONE) / divisor;
    to_u128(result, &format!("ceil(({} * {}) / {})", a, b, c))
}

/// Narrows a 256-bit value, failing when the high word is set
pub fn to_u128(value: U256, operation: &str) -> Result<u128> {
    let (hi, lo) = value.into_words();
    if hi != 0 {
        return Err(Error::overflow(operation));
    }
    Ok(lo)
}

/// `10^decimals` as u128
pub fn pow10(decimals: u8) -> Result<u128> {
    10u128
        .checked_pow(decimals as u32)
        .ok_or_else(|| Error::overflow(&format!("10^{}", decimals)))
}

/// Rescales an amount between decimal bases, rounding down
pub fn rescale(amount: u128, from_decimals: u8, to_decimals: u8) -> Result<u128> {
    if from_decimals == to_decimals {
        return Ok(amount);
    }
    if from_decimals > to_decimals {
        Ok(amount / pow10(from_decimals - to_decimals)?)
    } else {
        safe_mul(amount, pow10(to_decimals - from_decimals)?)
    }
}

/// Applies a fee on the 1e8 scale, returning the amount left after the fee
pub fn amount_after_fee(amount: u128, fee: u64) -> Result<u128> {
    let kept = PRICE_PRECISION
        .checked_sub(fee as u128)
        .ok_or_else(|| Error::invalid_parameter("fee", "fee exceeds 100%"))?;
    safe_mul_div(amount, kept, PRICE_PRECISION)
}

/// Renders a 1e8-scaled integer as a decimal (e.g. `100_250_000` -> `1.0025`)
pub fn to_decimal(value: u128) -> Decimal {
    i128::try_from(value)
        .ok()
        .and_then(|v| Decimal::try_from_i128_with_scale(v, 8).ok())
        .map(|d| d.normalize())
        .unwrap_or(Decimal::MAX)
}

/// Renders a base-unit amount with the given decimals
pub fn format_units(amount: u128, decimals: u8) -> String {
    match i128::try_from(amount) {
        Ok(v) if decimals <= 28 => {
            Decimal::try_from_i128_with_scale(v, decimals as u32)
                .map(|d| d.normalize().to_string())
                .unwrap_or_else(|_| amount.to_string())
        }
        _ => amount.to_string(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// UQ112x112
// ═══════════════════════════════════════════════════════════════════════════════

/// Unsigned binary fixed-point number with 112 fractional bits
///
/// Reserves are bounded to 112 bits, so `reserve1 << 112 / reserve0` always
/// fits in 224 bits. Accumulated sums of these values wrap modulo 2^256.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct UQ112x112(U256);

impl UQ112x112 {
    /// Zero value
    pub const ZERO: Self = Self(U256::ZERO);

    /// Largest integer part representable (2^112 - 1)
    pub const MAX_INTEGER: u128 = (1u128 << UQ112_RESOLUTION) - 1;

    /// Wraps a raw 256-bit value
    pub const fn from_raw(raw: U256) -> Self {
        Self(raw)
    }

    /// Raw 256-bit value
    pub fn raw(&self) -> U256 {
        self.0
    }

    /// Encodes an integer as UQ112x112
    pub fn encode(value: u128) -> Result<Self> {
        if value > Self::MAX_INTEGER {
            return Err(Error::overflow("UQ112x112 encode"));
        }
        Ok(Self(U256::from(value) << UQ112_RESOLUTION))
    }

    /// `numerator / denominator` as UQ112x112
    pub fn fraction(numerator: u128, denominator: u128) -> Result<Self> {
        if denominator == 0 {
            return Err(Error::division_by_zero("UQ112x112 fraction"));
        }
        Ok(Self(Self::encode(numerator)?.0 / U256::from(denominator)))
    }

    /// Multiplies by an integer and truncates the fractional bits
    pub fn mul_decode(&self, amount: u128) -> Result<u128> {
        let product = self
            .0
            .checked_mul(U256::from(amount))
            .ok_or_else(|| Error::overflow("UQ112x112 mul"))?;
        to_u128(product >> UQ112_RESOLUTION, "UQ112x112 decode")
    }

    /// Returns true if the value is zero
    pub fn is_zero(&self) -> bool {
        self.0 == U256::ZERO
    }
}

impl fmt::Display for UQ112x112 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for UQ112x112 {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        u256_decimal::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for UQ112x112 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        u256_decimal::deserialize(deserializer).map(Self)
    }
}

/// Average of a wrapping cumulative price over `elapsed` seconds
pub fn cumulative_average(current: U256, last: U256, elapsed: u64) -> Result<UQ112x112> {
    if elapsed == 0 {
        return Err(Error::division_by_zero("cumulative average"));
    }
    Ok(UQ112x112::from_raw(
        current.wrapping_sub(last) / U256::from(elapsed as u128),
    ))
}

/// Serde helper storing a `U256` as a decimal string
pub mod u256_decimal {
    use ethnum::U256;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize as a decimal string
    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    /// Deserialize from a decimal string
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let s = String::deserialize(deserializer)?;
        U256::from_str_radix(&s, 10).map_err(serde::de::Error::custom)
    }
}
