//! External price feed adapter.
//!
//! Wraps a round-based feed (wBTC:BTC) and refuses to serve a round older
//! than the configured staleness window.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::utils::address::Address;
use crate::utils::constants::{
    DEFAULT_FEED_DECIMALS, DEFAULT_FEED_MAX_STALENESS_SECS, PRICE_PRECISION,
};
use crate::utils::math::safe_mul_div;
use crate::utils::validation::{validate_duration, validate_non_zero_address};

// ═══════════════════════════════════════════════════════════════════════════════
// ROUND DATA
// ═══════════════════════════════════════════════════════════════════════════════

/// One reported feed round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundData {
    /// Monotonic round number
    pub round_id: u64,
    /// Raw answer, scaled by the feed's decimals
    pub answer: i128,
    /// Unix timestamp of the round
    pub updated_at: u64,
}

/// A fresh feed price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedPrice {
    /// Price scaled by the feed's decimals
    pub price: u128,
    /// Unix timestamp of the round
    pub updated_at: u64,
}

/// Anything that can serve the collateral/peg price
pub trait PriceFeed {
    /// Decimals of the raw answer
    fn decimals(&self) -> u8;

    /// Latest price, or an error when absent or stale at `now`
    fn latest_price(&self, now: u64) -> Result<FeedPrice>;

    /// Latest price rescaled to `PRICE_PRECISION`
    fn normalized_price(&self, now: u64) -> Result<u128> {
        let feed = self.latest_price(now)?;
        let scale = crate::utils::math::pow10(self.decimals())?;
        safe_mul_div(feed.price, PRICE_PRECISION, scale)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ADAPTER
// ═══════════════════════════════════════════════════════════════════════════════

/// Adapter over a round-based external feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalPriceFeed {
    /// Feed address
    pub address: Address,
    decimals: u8,
    max_staleness_secs: u64,
    latest: Option<RoundData>,
}

impl ExternalPriceFeed {
    /// Create a feed adapter with default decimals and staleness window
    pub fn new(address: Address) -> Result<Self> {
        Self::with_params(address, DEFAULT_FEED_DECIMALS, DEFAULT_FEED_MAX_STALENESS_SECS)
    }

    /// Create a feed adapter with explicit parameters
    pub fn with_params(address: Address, decimals: u8, max_staleness_secs: u64) -> Result<Self> {
        validate_non_zero_address(&address)?;
        validate_duration(max_staleness_secs, "max_staleness_secs")?;
        Ok(Self {
            address,
            decimals,
            max_staleness_secs,
            latest: None,
        })
    }

    /// Record a new round from the feed
    pub fn report(&mut self, answer: i128, updated_at: u64) -> Result<RoundData> {
        if answer <= 0 {
            return Err(Error::InvalidPrice(format!("feed answer {}", answer)));
        }
        let round_id = match &self.latest {
            Some(prev) if updated_at < prev.updated_at => {
                return Err(Error::invalid_parameter(
                    "updated_at",
                    format!("{} precedes round at {}", updated_at, prev.updated_at),
                ));
            }
            Some(prev) => prev.round_id + 1,
            None => 1,
        };
        let round = RoundData {
            round_id,
            answer,
            updated_at,
        };
        self.latest = Some(round);
        debug!(feed = %self.address.short(), round_id, answer, "feed round");
        Ok(round)
    }

    /// Latest round regardless of age
    pub fn latest_round_data(&self) -> Option<RoundData> {
        self.latest
    }

    /// Maximum accepted round age
    pub fn max_staleness_secs(&self) -> u64 {
        self.max_staleness_secs
    }

    /// Change the staleness window
    pub fn set_max_staleness_secs(&mut self, secs: u64) -> Result<()> {
        validate_duration(secs, "max_staleness_secs")?;
        self.max_staleness_secs = secs;
        Ok(())
    }
}

impl PriceFeed for ExternalPriceFeed {
    fn decimals(&self) -> u8 {
        self.decimals
    }

    fn latest_price(&self, now: u64) -> Result<FeedPrice> {
        let round = self
            .latest
            .ok_or_else(|| Error::InvalidPrice("feed has no rounds".into()))?;
        let age = now.saturating_sub(round.updated_at);
        if age > self.max_staleness_secs {
            return Err(Error::StalePrice {
                age,
                max_age: self.max_staleness_secs,
            });
        }
        let price = u128::try_from(round.answer)
            .map_err(|_| Error::InvalidPrice(format!("feed answer {}", round.answer)))?;
        Ok(FeedPrice {
            price,
            updated_at: round.updated_at,
        })
    }
}
