//! Reference constant-product pair.
//!
//! Models the AMM the oracles read from: reserves bounded to 112 bits, a
//! 0.3% swap fee and price accumulators advanced on every reserve change.

use ethnum::U256;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::oracle::twap::CumulativePriceSource;
use crate::utils::address::Address;
use crate::utils::constants::{AMM_FEE_BPS, BPS_DIVISOR};
use crate::utils::math::{safe_add, safe_mul, safe_mul_div, u256_decimal, UQ112x112};
use crate::utils::validation::{validate_non_zero, validate_non_zero_address};

/// Constant-product pair with Uniswap-V2 style accumulators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstantProductPair {
    /// Pair address
    pub address: Address,
    token0: Address,
    token1: Address,
    decimals0: u8,
    decimals1: u8,
    reserve0: u128,
    reserve1: u128,
    block_timestamp_last: u64,
    #[serde(with = "u256_decimal")]
    price0_cumulative_last: U256,
    #[serde(with = "u256_decimal")]
    price1_cumulative_last: U256,
}

impl ConstantProductPair {
    /// Create an empty pair; tokens are stored in ascending address order
    pub fn new(
        address: Address,
        token_a: Address,
        decimals_a: u8,
        token_b: Address,
        decimals_b: u8,
    ) -> Result<Self> {
        validate_non_zero_address(&address)?;
        validate_non_zero_address(&token_a)?;
        validate_non_zero_address(&token_b)?;
        if token_a == token_b {
            return Err(Error::invalid_parameter("token_b", "identical tokens"));
        }
        let ((token0, decimals0), (token1, decimals1)) = if token_a < token_b {
            ((token_a, decimals_a), (token_b, decimals_b))
        } else {
            ((token_b, decimals_b), (token_a, decimals_a))
        };
        Ok(Self {
            address,
            token0,
            token1,
            decimals0,
            decimals1,
            reserve0: 0,
            reserve1: 0,
            block_timestamp_last: 0,
            price0_cumulative_last: U256::ZERO,
            price1_cumulative_last: U256::ZERO,
        })
    }

    /// True if `token` is one side of the pair
    pub fn contains(&self, token: &Address) -> bool {
        *token == self.token0 || *token == self.token1
    }

    /// Reserve held of `token`
    pub fn reserve_of(&self, token: &Address) -> Result<u128> {
        if *token == self.token0 {
            Ok(self.reserve0)
        } else if *token == self.token1 {
            Ok(self.reserve1)
        } else {
            Err(Error::InvalidToken(token.to_hex()))
        }
    }

    /// Deposit `amount_a` of `token_a` and `amount_b` of the other token
    pub fn add_liquidity(
        &mut self,
        token_a: &Address,
        amount_a: u128,
        amount_b: u128,
        now: u64,
    ) -> Result<()> {
        validate_non_zero(amount_a)?;
        validate_non_zero(amount_b)?;
        let (amount0, amount1) = self.order(token_a, amount_a, amount_b)?;
        let reserve0 = safe_add(self.reserve0, amount0)?;
        let reserve1 = safe_add(self.reserve1, amount1)?;
        self.sync_reserves(reserve0, reserve1, now)
    }

    /// Output for `amount_in` against the given reserves, after the swap fee
    pub fn get_amount_out(amount_in: u128, reserve_in: u128, reserve_out: u128) -> Result<u128> {
        validate_non_zero(amount_in)?;
        if reserve_in == 0 || reserve_out == 0 {
            return Err(Error::NoReserves);
        }
        let amount_in_with_fee = safe_mul(amount_in, BPS_DIVISOR - AMM_FEE_BPS)?;
        let denominator = safe_add(safe_mul(reserve_in, BPS_DIVISOR)?, amount_in_with_fee)?;
        safe_mul_div(amount_in_with_fee, reserve_out, denominator)
    }

    /// Quote for swapping `amount_in` of `token_in`
    pub fn quote(&self, token_in: &Address, amount_in: u128) -> Result<u128> {
        let reserve_in = self.reserve_of(token_in)?;
        let reserve_out = if *token_in == self.token0 {
            self.reserve1
        } else {
            self.reserve0
        };
        Self::get_amount_out(amount_in, reserve_in, reserve_out)
    }

    /// Swap an exact input, returning the output of the other token
    pub fn swap_exact_in(
        &mut self,
        token_in: &Address,
        amount_in: u128,
        min_out: u128,
        now: u64,
    ) -> Result<u128> {
        let amount_out = self.quote(token_in, amount_in)?;
        if amount_out < min_out {
            return Err(Error::Slippage("Swap output".into()));
        }
        let (reserve0, reserve1) = if *token_in == self.token0 {
            (safe_add(self.reserve0, amount_in)?, self.reserve1 - amount_out)
        } else {
            (self.reserve0 - amount_out, safe_add(self.reserve1, amount_in)?)
        };
        self.sync_reserves(reserve0, reserve1, now)?;
        debug!(pair = %self.address.short(), amount_in, amount_out, "swap");
        Ok(amount_out)
    }

    /// Spot price of `token` in units of the other token, as UQ112x112
    pub fn spot_price(&self, token: &Address) -> Result<UQ112x112> {
        if *token == self.token0 {
            UQ112x112::fraction(self.reserve1, self.reserve0)
        } else if *token == self.token1 {
            UQ112x112::fraction(self.reserve0, self.reserve1)
        } else {
            Err(Error::InvalidToken(token.to_hex()))
        }
    }

    fn order(&self, token_a: &Address, amount_a: u128, amount_b: u128) -> Result<(u128, u128)> {
        if *token_a == self.token0 {
            Ok((amount_a, amount_b))
        } else if *token_a == self.token1 {
            Ok((amount_b, amount_a))
        } else {
            Err(Error::InvalidToken(token_a.to_hex()))
        }
    }

    /// Accrue the accumulators at the old reserves, then store the new ones
    fn sync_reserves(&mut self, reserve0: u128, reserve1: u128, now: u64) -> Result<()> {
        if reserve0 > UQ112x112::MAX_INTEGER || reserve1 > UQ112x112::MAX_INTEGER {
            return Err(Error::overflow("pair reserves"));
        }
        let (price0, price1, timestamp) = self.current_cumulative_prices(now)?;
        self.price0_cumulative_last = price0;
        self.price1_cumulative_last = price1;
        self.block_timestamp_last = timestamp;
        self.reserve0 = reserve0;
        self.reserve1 = reserve1;
        Ok(())
    }
}

impl CumulativePriceSource for ConstantProductPair {
    fn address(&self) -> Address {
        self.address
    }

    fn tokens(&self) -> (Address, Address) {
        (self.token0, self.token1)
    }

    fn token_decimals(&self) -> (u8, u8) {
        (self.decimals0, self.decimals1)
    }

    fn reserves(&self) -> (u128, u128, u64) {
        (self.reserve0, self.reserve1, self.block_timestamp_last)
    }

    fn price_cumulative_last(&self) -> (U256, U256) {
        (self.price0_cumulative_last, self.price1_cumulative_last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: u64 = 1_700_000_000;

    fn make_pair() -> ConstantProductPair {
        let mut pair = ConstantProductPair::new(
            Address::from_label("pair"),
            Address::from_label("bxs"),
            18,
            Address::from_label("wbtc"),
            8,
        )
        .unwrap();
        pair.add_liquidity(
            &Address::from_label("wbtc"),
            1_000_000_000,
            100_000_000_000_000_000_000,
            T0,
        )
        .unwrap();
        pair
    }

    #[test]
    fn test_tokens_sorted() {
        let pair = make_pair();
        let (t0, t1) = pair.tokens();
        assert!(t0 < t1);
        assert_eq!(pair.reserve_of(&Address::from_label("wbtc")).unwrap(), 1_000_000_000);
    }

    #[test]
    fn test_identical_tokens_rejected() {
        let a = Address::from_label("a");
        assert!(ConstantProductPair::new(Address::from_label("p"), a, 18, a, 18).is_err());
    }

    #[test]
    fn test_swap_keeps_invariant() {
        let mut pair = make_pair();
        let wbtc = Address::from_label("wbtc");
        let bxs = Address::from_label("bxs");
        let k_before = pair.reserve_of(&wbtc).unwrap() * (pair.reserve_of(&bxs).unwrap() / 1_000_000_000);

        let out = pair.swap_exact_in(&wbtc, 10_000_000, 0, T0 + 10).unwrap();
        assert!(out > 0);
        assert!(out < 1_000_000_000_000_000_000);

        let k_after = pair.reserve_of(&wbtc).unwrap() * (pair.reserve_of(&bxs).unwrap() / 1_000_000_000);
        assert!(k_after >= k_before);
    }

    #[test]
    fn test_swap_min_out() {
        let mut pair = make_pair();
        let wbtc = Address::from_label("wbtc");
        let err = pair
            .swap_exact_in(&wbtc, 10_000_000, u128::MAX, T0 + 10)
            .unwrap_err();
        assert!(matches!(err, Error::Slippage(_)));
    }

    #[test]
    fn test_accumulators_advance_with_time() {
        let mut pair = make_pair();
        let (c0, _) = pair.price_cumulative_last();
        assert_eq!(c0, U256::ZERO);

        let (p0, _, ts) = pair.current_cumulative_prices(T0 + 100).unwrap();
        assert_eq!(ts, T0 + 100);
        let (t0, _) = pair.tokens();
        let spot = pair.spot_price(&t0).unwrap();
        assert_eq!(p0, spot.raw() * U256::from(100u128));

        pair.swap_exact_in(&Address::from_label("wbtc"), 1_000, 0, T0 + 100)
            .unwrap();
        assert_eq!(pair.price_cumulative_last().0, p0);
    }

    #[test]
    fn test_time_cannot_go_backwards() {
        let pair = make_pair();
        assert!(pair.current_cumulative_prices(T0 - 1).is_err());
    }
}
