//! Price consultation router.
//!
//! Turns an asset/collateral TWAP into a price against the peg unit:
//!
//! ```text
//! price_vs_collateral = consult(collateral, 1 whole collateral) rescaled to 1e8
//! price               = feed_price * 1e8 / price_vs_collateral
//! ```
//!
//! BRAX and BXS each get their own oracle assignment. The wBTC:BTC feed is
//! shared.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::info;

use crate::error::{Error, Result};
use crate::oracle::price_feed::{ExternalPriceFeed, PriceFeed};
use crate::oracle::twap::{CumulativePriceSource, TwapOracle};
use crate::utils::address::Address;
use crate::utils::constants::PRICE_PRECISION;
use crate::utils::math::{pow10, safe_mul_div};
use crate::utils::validation::validate_non_zero_address;

/// Asset priced through an oracle assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PricedAsset {
    /// The synthetic asset
    Brax,
    /// The share token
    Bxs,
}

impl fmt::Display for PricedAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PricedAsset::Brax => write!(f, "BRAX"),
            PricedAsset::Bxs => write!(f, "BXS"),
        }
    }
}

/// Which oracle prices an asset, and which side of its pair is the collateral
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleAssignment {
    /// Oracle address
    pub oracle: Address,
    /// Collateral token of the oracle's pair
    pub collateral_token: Address,
}

/// Oracle book plus per-asset assignments and the collateral feed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRouter {
    oracles: BTreeMap<Address, TwapOracle>,
    brax: Option<OracleAssignment>,
    bxs: Option<OracleAssignment>,
    collateral_feed: Option<ExternalPriceFeed>,
}

impl PriceRouter {
    /// Create an empty router
    pub fn new() -> Self {
        Self::default()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // ORACLE BOOK
    // ═══════════════════════════════════════════════════════════════════════

    /// Register a deployed oracle
    pub fn deploy_oracle(&mut self, oracle: TwapOracle) -> Result<()> {
        if self.oracles.contains_key(&oracle.address) {
            return Err(Error::invalid_parameter(
                "oracle",
                format!("{} already deployed", oracle.address),
            ));
        }
        info!(oracle = %oracle.address.short(), pair = %oracle.pair.short(), "oracle deployed");
        self.oracles.insert(oracle.address, oracle);
        Ok(())
    }

    /// Deployed oracle by address
    pub fn oracle(&self, address: &Address) -> Result<&TwapOracle> {
        self.oracles
            .get(address)
            .ok_or_else(|| Error::OracleNotFound(address.to_hex()))
    }

    /// Mutable deployed oracle by address
    pub fn oracle_mut(&mut self, address: &Address) -> Result<&mut TwapOracle> {
        self.oracles
            .get_mut(address)
            .ok_or_else(|| Error::OracleNotFound(address.to_hex()))
    }

    /// All deployed oracles
    pub fn oracles(&self) -> impl Iterator<Item = &TwapOracle> {
        self.oracles.values()
    }

    /// Close the TWAP window of one oracle
    pub fn update_oracle(
        &mut self,
        address: &Address,
        source: &impl CumulativePriceSource,
        now: u64,
    ) -> Result<()> {
        self.oracle_mut(address)?.update(source, now)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // ASSIGNMENTS
    // ═══════════════════════════════════════════════════════════════════════

    /// Point `asset` at `oracle`; the oracle need not be deployed yet
    pub fn assign(
        &mut self,
        asset: PricedAsset,
        oracle: Address,
        collateral_token: Address,
    ) -> Result<()> {
        validate_non_zero_address(&oracle)?;
        validate_non_zero_address(&collateral_token)?;
        let assignment = Some(OracleAssignment {
            oracle,
            collateral_token,
        });
        match asset {
            PricedAsset::Brax => self.brax = assignment,
            PricedAsset::Bxs => self.bxs = assignment,
        }
        info!(%asset, oracle = %oracle.short(), "oracle assigned");
        Ok(())
    }

    /// Current assignment of `asset`
    pub fn assignment(&self, asset: PricedAsset) -> Option<&OracleAssignment> {
        match asset {
            PricedAsset::Brax => self.brax.as_ref(),
            PricedAsset::Bxs => self.bxs.as_ref(),
        }
    }

    /// Install the collateral feed
    pub fn set_collateral_feed(&mut self, feed: ExternalPriceFeed) {
        info!(feed = %feed.address.short(), "collateral feed set");
        self.collateral_feed = Some(feed);
    }

    /// Collateral feed, if set
    pub fn collateral_feed(&self) -> Option<&ExternalPriceFeed> {
        self.collateral_feed.as_ref()
    }

    /// Mutable collateral feed
    pub fn collateral_feed_mut(&mut self) -> Result<&mut ExternalPriceFeed> {
        self.collateral_feed.as_mut().ok_or(Error::FeedNotSet)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // PRICES
    // ═══════════════════════════════════════════════════════════════════════

    /// Price of `asset` in the peg unit, on the 1e8 scale
    pub fn price(&self, asset: PricedAsset, now: u64) -> Result<u128> {
        let price_vs_collateral = self.price_vs_collateral(asset, now)?;
        let feed = self.collateral_feed.as_ref().ok_or(Error::FeedNotSet)?;
        let collateral_price = feed.normalized_price(now)?;
        safe_mul_div(collateral_price, PRICE_PRECISION, price_vs_collateral)
    }

    /// Units of `asset` per whole collateral unit, rescaled to 1e8
    pub fn price_vs_collateral(&self, asset: PricedAsset, now: u64) -> Result<u128> {
        let assignment = self
            .assignment(asset)
            .ok_or_else(|| Error::OracleNotSet(asset.to_string()))?;
        let oracle = self.oracle(&assignment.oracle)?;
        let collateral = &assignment.collateral_token;
        let collateral_decimals = oracle.decimals_of(collateral)?;
        let asset_decimals = oracle.decimals_of(&oracle.other_token(collateral)?)?;

        let amount_out = oracle.consult(collateral, pow10(collateral_decimals)?, now)?;
        let normalized = safe_mul_div(amount_out, PRICE_PRECISION, pow10(asset_decimals)?)?;
        if normalized == 0 {
            return Err(Error::InvalidPrice(format!("{} TWAP is zero", asset)));
        }
        Ok(normalized)
    }

    /// BRAX price in the peg unit
    pub fn brax_price(&self, now: u64) -> Result<u128> {
        self.price(PricedAsset::Brax, now)
    }

    /// BXS price in the peg unit
    pub fn bxs_price(&self, now: u64) -> Result<u128> {
        self.price(PricedAsset::Bxs, now)
    }
}
