//! Input validation utilities.
//!
//! Validators run before any state is touched so a rejected call leaves
//! the engine exactly as it was.

use crate::error::{Error, Result};
use crate::utils::address::Address;
use crate::utils::constants::{MAX_COLLATERAL_RATIO, PRICE_PRECISION};

// ═══════════════════════════════════════════════════════════════════════════════
// ADDRESS VALIDATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Reject the zero address
pub fn validate_non_zero_address(address: &Address) -> Result<()> {
    if address.is_zero() {
        return Err(Error::ZeroAddress);
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// AMOUNT VALIDATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Validate that an amount is non-zero
pub fn validate_non_zero(amount: u128) -> Result<()> {
    if amount == 0 {
        return Err(Error::ZeroAmount);
    }
    Ok(())
}

/// Validate a fee on the 1e8 scale (at most 100%)
pub fn validate_fee(fee: u64, name: &str) -> Result<()> {
    if fee as u128 > PRICE_PRECISION {
        return Err(Error::invalid_parameter(
            name,
            format!("{} exceeds 100% ({})", fee, PRICE_PRECISION),
        ));
    }
    Ok(())
}

/// Validate a collateral-ratio step
pub fn validate_step(step: u64) -> Result<()> {
    if step > MAX_COLLATERAL_RATIO {
        return Err(Error::invalid_parameter(
            "brax_step",
            format!("{} exceeds maximum ratio {}", step, MAX_COLLATERAL_RATIO),
        ));
    }
    Ok(())
}

/// Validate a positive price
pub fn validate_price(price: u128, name: &str) -> Result<()> {
    if price == 0 {
        return Err(Error::invalid_parameter(name, "price must be positive"));
    }
    Ok(())
}

/// Validate a positive duration
pub fn validate_duration(secs: u64, name: &str) -> Result<()> {
    if secs == 0 {
        return Err(Error::invalid_parameter(name, "duration must be positive"));
    }
    Ok(())
}
