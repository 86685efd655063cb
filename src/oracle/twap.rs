//! Fixed-window TWAP oracle over a constant-product pair.
//!
//! The oracle stores the pair's cumulative price accumulators at its last
//! update. A new update is accepted only after a full period, and the average
//! price across that window is the accumulator delta divided by the elapsed
//! time. Consults multiply that average by the input amount.

use ethnum::U256;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::utils::address::Address;
use crate::utils::constants::{DEFAULT_CONSULT_LENIENCY_SECS, DEFAULT_TWAP_PERIOD_SECS};
use crate::utils::math::{cumulative_average, u256_decimal, UQ112x112};
use crate::utils::validation::{validate_duration, validate_non_zero_address};

// ═══════════════════════════════════════════════════════════════════════════════
// PRICE SOURCE
// ═══════════════════════════════════════════════════════════════════════════════

/// A pair that exposes Uniswap-V2 style cumulative price accumulators
pub trait CumulativePriceSource {
    /// Pair address
    fn address(&self) -> Address;

    /// `(token0, token1)` in pair order
    fn tokens(&self) -> (Address, Address);

    /// Decimals of `(token0, token1)`
    fn token_decimals(&self) -> (u8, u8);

    /// `(reserve0, reserve1, block_timestamp_last)`
    fn reserves(&self) -> (u128, u128, u64);

    /// Stored `(price0_cumulative_last, price1_cumulative_last)`
    fn price_cumulative_last(&self) -> (U256, U256);

    /// Accumulators as they would read at `now`, without mutating the pair
    fn current_cumulative_prices(&self, now: u64) -> Result<(U256, U256, u64)> {
        let (mut price0, mut price1) = self.price_cumulative_last();
        let (reserve0, reserve1, last) = self.reserves();
        if now < last {
            return Err(Error::invalid_parameter(
                "timestamp",
                format!("{} precedes pair timestamp {}", now, last),
            ));
        }
        let elapsed = now - last;
        if elapsed > 0 && reserve0 != 0 && reserve1 != 0 {
            let elapsed = U256::from(elapsed as u128);
            price0 = price0.wrapping_add(
                UQ112x112::fraction(reserve1, reserve0)?
                    .raw()
                    .wrapping_mul(elapsed),
            );
            price1 = price1.wrapping_add(
                UQ112x112::fraction(reserve0, reserve1)?
                    .raw()
                    .wrapping_mul(elapsed),
            );
        }
        Ok((price0, price1, now))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TWAP ORACLE
// ═══════════════════════════════════════════════════════════════════════════════

/// Fixed-window time-weighted average price oracle bound to one pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TwapOracle {
    /// Oracle address
    pub address: Address,
    /// Pair this oracle reads
    pub pair: Address,
    /// Pair token0
    pub token0: Address,
    /// Pair token1
    pub token1: Address,
    /// Decimals of token0
    pub decimals0: u8,
    /// Decimals of token1
    pub decimals1: u8,
    #[serde(with = "u256_decimal")]
    price0_cumulative_last: U256,
    #[serde(with = "u256_decimal")]
    price1_cumulative_last: U256,
    block_timestamp_last: u64,
    price0_average: UQ112x112,
    price1_average: UQ112x112,
    period: u64,
    consult_leniency: u64,
    allow_stale_consults: bool,
    owner: Address,
    timelock: Address,
}

impl TwapOracle {
    /// Bind a new oracle to `source`, snapshotting its stored accumulators
    pub fn new(
        address: Address,
        source: &impl CumulativePriceSource,
        owner: Address,
        timelock: Address,
    ) -> Result<Self> {
        validate_non_zero_address(&address)?;
        validate_non_zero_address(&owner)?;
        let (reserve0, reserve1, block_timestamp_last) = source.reserves();
        if reserve0 == 0 || reserve1 == 0 {
            return Err(Error::NoReserves);
        }
        let (token0, token1) = source.tokens();
        let (decimals0, decimals1) = source.token_decimals();
        let (price0_cumulative_last, price1_cumulative_last) = source.price_cumulative_last();

        Ok(Self {
            address,
            pair: source.address(),
            token0,
            token1,
            decimals0,
            decimals1,
            price0_cumulative_last,
            price1_cumulative_last,
            block_timestamp_last,
            price0_average: UQ112x112::ZERO,
            price1_average: UQ112x112::ZERO,
            period: DEFAULT_TWAP_PERIOD_SECS,
            consult_leniency: DEFAULT_CONSULT_LENIENCY_SECS,
            allow_stale_consults: false,
            owner,
            timelock,
        })
    }

    /// Recompute the window averages from the pair's current accumulators
    pub fn update(&mut self, source: &impl CumulativePriceSource, now: u64) -> Result<()> {
        if source.address() != self.pair {
            return Err(Error::PairNotFound(source.address().to_hex()));
        }
        let (price0_cumulative, price1_cumulative, block_timestamp) =
            source.current_cumulative_prices(now)?;
        let elapsed = block_timestamp.saturating_sub(self.block_timestamp_last);
        if elapsed < self.period {
            return Err(Error::PeriodNotElapsed {
                elapsed,
                period: self.period,
            });
        }

        self.price0_average =
            cumulative_average(price0_cumulative, self.price0_cumulative_last, elapsed)?;
        self.price1_average =
            cumulative_average(price1_cumulative, self.price1_cumulative_last, elapsed)?;
        self.price0_cumulative_last = price0_cumulative;
        self.price1_cumulative_last = price1_cumulative;
        self.block_timestamp_last = block_timestamp;

        info!(
            oracle = %self.address.short(),
            elapsed,
            "TWAP window closed"
        );
        Ok(())
    }

    /// Amount of the other pair token worth `amount_in` of `token` at the window average
    pub fn consult(&self, token: &Address, amount_in: u128, now: u64) -> Result<u128> {
        let age = now.saturating_sub(self.block_timestamp_last);
        let max_age = self.period.saturating_add(self.consult_leniency);
        if !self.allow_stale_consults && age >= max_age {
            return Err(Error::StaleOracle { age, max_age });
        }

        let amount_out = if *token == self.token0 {
            self.price0_average.mul_decode(amount_in)?
        } else if *token == self.token1 {
            self.price1_average.mul_decode(amount_in)?
        } else {
            return Err(Error::InvalidToken(token.to_hex()));
        };
        debug!(oracle = %self.address.short(), amount_in, amount_out, "consult");
        Ok(amount_out)
    }

    /// True if `update` would pass the period gate at `now`
    pub fn can_update(&self, now: u64) -> bool {
        now.saturating_sub(self.block_timestamp_last) >= self.period
    }

    /// Decimals of `token`, if it belongs to the pair
    pub fn decimals_of(&self, token: &Address) -> Result<u8> {
        if *token == self.token0 {
            Ok(self.decimals0)
        } else if *token == self.token1 {
            Ok(self.decimals1)
        } else {
            Err(Error::InvalidToken(token.to_hex()))
        }
    }

    /// The pair token opposite `token`
    pub fn other_token(&self, token: &Address) -> Result<Address> {
        if *token == self.token0 {
            Ok(self.token1)
        } else if *token == self.token1 {
            Ok(self.token0)
        } else {
            Err(Error::InvalidToken(token.to_hex()))
        }
    }

    /// Timestamp of the last accepted update
    pub fn block_timestamp_last(&self) -> u64 {
        self.block_timestamp_last
    }

    /// Window length
    pub fn period(&self) -> u64 {
        self.period
    }

    /// Grace seconds past the period
    pub fn consult_leniency(&self) -> u64 {
        self.consult_leniency
    }

    /// Whether stale consults are served
    pub fn allow_stale_consults(&self) -> bool {
        self.allow_stale_consults
    }

    /// Oracle owner
    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Oracle timelock
    pub fn timelock(&self) -> Address {
        self.timelock
    }

    // ═══════════════════════════════════════════════════════════════════════
    // ADMIN
    // ═══════════════════════════════════════════════════════════════════════

    fn authorize(&self, caller: &Address) -> Result<()> {
        if *caller == self.owner || (!self.timelock.is_zero() && *caller == self.timelock) {
            Ok(())
        } else {
            Err(Error::NotOracleOwner)
        }
    }

    /// Change the window length
    pub fn set_period(&mut self, caller: &Address, period: u64) -> Result<()> {
        self.authorize(caller)?;
        validate_duration(period, "period")?;
        self.period = period;
        Ok(())
    }

    /// Change the grace seconds past the period
    pub fn set_consult_leniency(&mut self, caller: &Address, leniency: u64) -> Result<()> {
        self.authorize(caller)?;
        self.consult_leniency = leniency;
        Ok(())
    }

    /// Serve consults regardless of age
    pub fn set_allow_stale_consults(&mut self, caller: &Address, allow: bool) -> Result<()> {
        self.authorize(caller)?;
        self.allow_stale_consults = allow;
        Ok(())
    }

    /// Transfer ownership
    pub fn set_owner(&mut self, caller: &Address, owner: Address) -> Result<()> {
        self.authorize(caller)?;
        validate_non_zero_address(&owner)?;
        self.owner = owner;
        Ok(())
    }

    /// Change the governance timelock
    pub fn set_timelock(&mut self, caller: &Address, timelock: Address) -> Result<()> {
        self.authorize(caller)?;
        validate_non_zero_address(&timelock)?;
        self.timelock = timelock;
        Ok(())
    }
}
