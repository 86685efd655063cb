//! Standard deployment fixture.
//!
//! Wires a controller, a BXS ledger, a wBTC ledger, one wBTC pool and two
//! AMM pairs the way a fresh network deployment looks:
//!
//! - creator holds the genesis supplies and 1000 wBTC
//! - the pool is registered and wBTC is enabled
//! - creator mints 10 BRAX with 10 wBTC
//! - BRAX/wBTC is seeded 10:10 and BXS/wBTC 100:10
//!
//! Oracles are deployed separately by [`Deployment::deploy_oracles`].

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::amm::Market;
use crate::core::config::EngineConfig;
use crate::core::pool::{CollateralPool, MintRequest};
use crate::core::token::Token;
use crate::error::{Error, Result};
use crate::oracle::price_feed::{ExternalPriceFeed, PriceFeed};
use crate::oracle::twap::CumulativePriceSource;
use crate::protocol::controller::BraxController;
use crate::utils::address::Address;
use crate::utils::constants::{ASSET_DECIMALS, ONE_TOKEN, ONE_WBTC, WBTC_DECIMALS};
use crate::utils::math::pow10;

/// wBTC minted to the creator
pub const CREATOR_WBTC: u128 = 1_000 * ONE_WBTC;

/// Seconds waited between oracle deployment and the first update
pub const ORACLE_WARMUP_SECS: u64 = 3_800;

/// A complete simulated deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    /// Engine state
    pub controller: BraxController,
    /// AMM pairs
    pub market: Market,
    /// Deployer, genesis holder and liquidity provider
    pub creator: Address,
    /// Governance timelock
    pub timelock: Address,
    /// BXS token
    pub bxs: Address,
    /// wBTC token
    pub wbtc: Address,
    /// wBTC pool
    pub pool: Address,
    /// BRAX/wBTC pair
    pub brax_pair: Address,
    /// BXS/wBTC pair
    pub bxs_pair: Address,
    /// BRAX/wBTC TWAP oracle
    pub brax_oracle: Address,
    /// BXS/wBTC TWAP oracle
    pub bxs_oracle: Address,
    now: u64,
    feed_heartbeat: bool,
}

impl Deployment {
    /// Build the standard fixture at `start`
    pub fn standard(config: EngineConfig, start: u64) -> Result<Self> {
        let creator = Address::from_label("creator");
        let timelock = Address::from_label("timelock");
        let mut controller = BraxController::new("Brax", "BRAX", creator, timelock, &config)?;
        let brax = controller.brax_address();

        let bxs = Address::from_label("token:BXS");
        controller.register_token(
            &creator,
            Token::with_genesis(
                bxs,
                "Brax Share",
                "BXS",
                ASSET_DECIMALS,
                creator,
                config.genesis.bxs_supply,
            )?,
        )?;
        controller.set_bxs_address(&creator, bxs)?;

        let wbtc = Address::from_label("token:wBTC");
        controller.register_token(
            &creator,
            Token::with_genesis(wbtc, "Wrapped BTC", "wBTC", WBTC_DECIMALS, creator, CREATOR_WBTC)?,
        )?;

        let mut feed = ExternalPriceFeed::with_params(
            Address::from_label("feed:wBTC/BTC"),
            config.feed.decimals,
            config.feed.max_staleness_secs,
        )?;
        feed.report(feed_unit(config.feed.decimals)?, start)?;
        controller.set_wbtc_btc_feed(&creator, feed)?;

        let pool = Address::from_label("pool:wBTC");
        controller.deploy_pool(
            &creator,
            CollateralPool::new(
                pool,
                creator,
                creator,
                timelock,
                &[(wbtc, WBTC_DECIMALS)],
                &config.pool,
            )?,
        )?;
        controller.add_pool(&creator, pool)?;
        controller.pool_mut(&pool)?.toggle_collateral(&creator, 0)?;

        // Creator mints 10 BRAX with 10 wBTC
        controller.approve(&wbtc, &creator, &pool, 10 * ONE_WBTC)?;
        controller.mint_brax(
            &creator,
            &pool,
            MintRequest {
                col_idx: 0,
                brax_amount: 10 * ONE_TOKEN,
                brax_out_min: 0,
                max_collat_in: 10 * ONE_WBTC,
                max_bxs_in: 0,
                one_to_one_override: true,
            },
            start,
        )?;

        let mut market = Market::new();
        let brax_pair = market.create_pair(brax, ASSET_DECIMALS, wbtc, WBTC_DECIMALS)?;
        let bxs_pair = market.create_pair(bxs, ASSET_DECIMALS, wbtc, WBTC_DECIMALS)?;

        let mut deployment = Self {
            controller,
            market,
            creator,
            timelock,
            bxs,
            wbtc,
            pool,
            brax_pair,
            bxs_pair,
            brax_oracle: Address::from_label("oracle:BRAX/wBTC"),
            bxs_oracle: Address::from_label("oracle:BXS/wBTC"),
            now: start,
            feed_heartbeat: true,
        };
        deployment.seed_pair(brax_pair, brax, 10 * ONE_TOKEN, 10 * ONE_WBTC)?;
        deployment.seed_pair(bxs_pair, bxs, 100 * ONE_TOKEN, 10 * ONE_WBTC)?;

        info!(start, "standard deployment ready");
        Ok(deployment)
    }

    fn seed_pair(&mut self, pair: Address, token: Address, amount: u128, wbtc_amount: u128) -> Result<()> {
        self.controller.transfer(&token, &self.creator, &pair, amount)?;
        self.controller
            .transfer(&self.wbtc, &self.creator, &pair, wbtc_amount)?;
        self.market
            .pair_mut(&pair)?
            .add_liquidity(&token, amount, wbtc_amount, self.now)
    }

    /// Deploy both TWAP oracles, wait out the first window, update and assign them
    pub fn deploy_oracles(&mut self) -> Result<()> {
        self.controller
            .deploy_oracle(&self.creator, self.brax_oracle, self.market.pair(&self.brax_pair)?)?;
        self.controller
            .deploy_oracle(&self.creator, self.bxs_oracle, self.market.pair(&self.bxs_pair)?)?;

        self.advance(ORACLE_WARMUP_SECS)?;
        self.update_oracles()?;

        self.controller
            .set_brax_oracle(&self.creator, self.brax_oracle, self.wbtc)?;
        self.controller
            .set_bxs_oracle(&self.creator, self.bxs_oracle, self.wbtc)?;
        Ok(())
    }

    /// Close the window of both oracles
    pub fn update_oracles(&mut self) -> Result<()> {
        let now = self.now;
        self.controller
            .update_oracle(&self.brax_oracle, self.market.pair(&self.brax_pair)?, now)?;
        self.controller
            .update_oracle(&self.bxs_oracle, self.market.pair(&self.bxs_pair)?, now)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // CLOCK AND FEED
    // ═══════════════════════════════════════════════════════════════════════════

    /// Current simulated time
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Move the clock forward; the feed re-reports its last answer unless heartbeats are off
    pub fn advance(&mut self, secs: u64) -> Result<()> {
        self.now = self
            .now
            .checked_add(secs)
            .ok_or_else(|| Error::overflow("clock"))?;
        if self.feed_heartbeat {
            let now = self.now;
            let feed = self.controller.feed_mut()?;
            let answer = match feed.latest_round_data() {
                Some(round) => round.answer,
                None => feed_unit(feed.decimals())?,
            };
            feed.report(answer, now)?;
        }
        Ok(())
    }

    /// Turn feed heartbeats on or off
    pub fn set_feed_heartbeat(&mut self, enabled: bool) {
        self.feed_heartbeat = enabled;
    }

    /// Report a new wBTC:BTC answer at the current time
    pub fn report_feed(&mut self, answer: i128) -> Result<()> {
        let now = self.now;
        self.controller.feed_mut()?.report(answer, now).map(|_| ())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // MARKET
    // ═══════════════════════════════════════════════════════════════════════════

    /// Swap `amount_in` of `token_in` on `pair` for `trader`, returning the output
    pub fn swap(
        &mut self,
        trader: &Address,
        pair: &Address,
        token_in: &Address,
        amount_in: u128,
    ) -> Result<u128> {
        let pool = self.market.pair(pair)?;
        let amount_out = pool.quote(token_in, amount_in)?;
        let (token0, token1) = pool.tokens();
        let token_out = if *token_in == token0 { token1 } else { token0 };

        let available = self.controller.balance_of(token_in, trader)?;
        if available < amount_in {
            return Err(Error::InsufficientBalance {
                required: amount_in,
                available,
            });
        }

        let now = self.now;
        self.market
            .pair_mut(pair)?
            .swap_exact_in(token_in, amount_in, amount_out, now)?;
        self.controller.transfer(token_in, trader, pair, amount_in)?;
        self.controller.transfer(&token_out, pair, trader, amount_out)?;
        debug!(pair = %pair.short(), amount_in, amount_out, "simulated swap");
        Ok(amount_out)
    }

    /// Creator buys BRAX with `wbtc_in`
    pub fn buy_brax(&mut self, wbtc_in: u128) -> Result<u128> {
        let (creator, pair, wbtc) = (self.creator, self.brax_pair, self.wbtc);
        self.swap(&creator, &pair, &wbtc, wbtc_in)
    }

    /// Creator sells `brax_in` BRAX for wBTC
    pub fn sell_brax(&mut self, brax_in: u128) -> Result<u128> {
        let (creator, pair, brax) = (self.creator, self.brax_pair, self.controller.brax_address());
        self.swap(&creator, &pair, &brax, brax_in)
    }

    /// Give `to` some of the creator's `token`
    pub fn fund(&mut self, to: &Address, token: &Address, amount: u128) -> Result<()> {
        let creator = self.creator;
        self.controller.transfer(token, &creator, to, amount)
    }
}

fn feed_unit(decimals: u8) -> Result<i128> {
    i128::try_from(pow10(decimals)?).map_err(|_| Error::overflow("feed unit"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: u64 = 1_700_000_000;

    #[test]
    fn test_standard_fixture() {
        let d = Deployment::standard(EngineConfig::default(), T0).unwrap();
        let brax = d.controller.brax_address();
        assert!(d.controller.is_pool(&d.pool));
        assert_eq!(d.controller.balance_of(&d.wbtc, &d.pool), Ok(10 * ONE_WBTC));
        assert_eq!(d.controller.global_collateral_value(), Ok(10 * ONE_TOKEN));
        assert_eq!(d.controller.balance_of(&brax, &d.brax_pair), Ok(10 * ONE_TOKEN));
        assert_eq!(d.controller.balance_of(&d.wbtc, &d.creator), Ok(970 * ONE_WBTC));
        assert_eq!(d.market.pair(&d.bxs_pair).unwrap().reserve_of(&d.bxs), Ok(100 * ONE_TOKEN));
    }

    #[test]
    fn test_advance_heartbeats_feed() {
        let mut d = Deployment::standard(EngineConfig::default(), T0).unwrap();
        d.advance(7_200).unwrap();
        let round = d.controller.router().collateral_feed().unwrap().latest_round_data().unwrap();
        assert_eq!(round.updated_at, T0 + 7_200);
        assert_eq!(round.answer, 100_000_000);

        d.set_feed_heartbeat(false);
        d.advance(60).unwrap();
        let round = d.controller.router().collateral_feed().unwrap().latest_round_data().unwrap();
        assert_eq!(round.updated_at, T0 + 7_200);
    }

    #[test]
    fn test_swap_moves_ledgers() {
        let mut d = Deployment::standard(EngineConfig::default(), T0).unwrap();
        let brax = d.controller.brax_address();
        let before = d.controller.balance_of(&brax, &d.creator).unwrap();
        let out = d.buy_brax(ONE_WBTC / 10).unwrap();
        assert!(out > 0);
        assert_eq!(d.controller.balance_of(&brax, &d.creator), Ok(before + out));
        assert_eq!(
            d.market.pair(&d.brax_pair).unwrap().reserve_of(&brax),
            d.controller.balance_of(&brax, &d.brax_pair)
        );
    }

    #[test]
    fn test_swap_insufficient_balance() {
        let mut d = Deployment::standard(EngineConfig::default(), T0).unwrap();
        assert!(matches!(
            d.sell_brax(1_000 * ONE_TOKEN),
            Err(Error::InsufficientBalance { .. })
        ));
    }
}
