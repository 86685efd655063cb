//! Collateral pool.
//!
//! A pool holds collateral against minted BRAX. Quotes are computed here,
//! including every ceiling, threshold and slippage check. Token movement is
//! left to the controller, which owns the ledgers and only moves tokens once
//! a quote has passed.
//!
//! Redemptions are two-step: `redeem` credits the redeemer with unclaimed
//! collateral and BXS, `collect` pays them out after the redemption delay.
//! Unclaimed collateral still sits in the pool but no longer counts as free.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

use crate::core::config::PoolConfig;
use crate::error::{Error, Result};
use crate::utils::address::Address;
use crate::utils::constants::{ASSET_DECIMALS, MAX_COLLATERAL_RATIO, PRICE_PRECISION};
use crate::utils::math::{amount_after_fee, pow10, safe_add, safe_mul_div, safe_sub};
use crate::utils::validation::{
    validate_fee, validate_non_zero, validate_non_zero_address, validate_price,
};

// ═══════════════════════════════════════════════════════════════════════════════
// TYPES
// ═══════════════════════════════════════════════════════════════════════════════

/// Per-collateral settings and accounting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralInfo {
    /// Collateral token
    pub token: Address,
    /// `18 - collateral decimals`
    pub missing_decimals: u8,
    /// Collateral price in the peg unit (1e8 scale)
    pub price: u128,
    /// Maximum free collateral held
    pub pool_ceiling: u128,
    /// Whether the collateral is accepted
    pub enabled: bool,
    /// Minting paused
    pub mint_paused: bool,
    /// Redeeming paused
    pub redeem_paused: bool,
    /// Minting fee (1e8 scale)
    pub minting_fee: u64,
    /// Redemption fee (1e8 scale)
    pub redemption_fee: u64,
    /// Collateral owed to redeemers, not yet collected
    pub unclaimed: u128,
}

/// Arguments of a mint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintRequest {
    /// Collateral index
    pub col_idx: usize,
    /// BRAX to mint, before the fee
    pub brax_amount: u128,
    /// Minimum BRAX received
    pub brax_out_min: u128,
    /// Maximum collateral spent
    pub max_collat_in: u128,
    /// Maximum BXS burned
    pub max_bxs_in: u128,
    /// Mint 1:1 against collateral regardless of the GCR
    pub one_to_one_override: bool,
}

/// Result of a mint quote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintQuote {
    /// BRAX minted to the caller
    pub brax_out: u128,
    /// Collateral pulled from the caller
    pub collat_needed: u128,
    /// BXS burned from the caller
    pub bxs_needed: u128,
}

/// Arguments of a redemption
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedeemRequest {
    /// Collateral index
    pub col_idx: usize,
    /// BRAX burned
    pub brax_amount: u128,
    /// Minimum BXS owed
    pub bxs_out_min: u128,
    /// Minimum collateral owed
    pub col_out_min: u128,
}

/// Result of a redemption quote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedeemQuote {
    /// Collateral owed to the redeemer
    pub collat_out: u128,
    /// BXS owed to the redeemer
    pub bxs_out: u128,
}

/// Prices a quote is evaluated against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingContext {
    /// Current global collateral ratio
    pub global_collateral_ratio: u64,
    /// BRAX price, when BRAX has an oracle
    pub brax_price: Option<u128>,
    /// BXS price, when BXS has an oracle
    pub bxs_price: Option<u128>,
}

impl PricingContext {
    fn bxs_price(&self) -> Result<u128> {
        self.bxs_price
            .ok_or_else(|| Error::OracleNotSet("BXS".into()))
    }

    fn is_fully_collateralized(&self) -> bool {
        self.global_collateral_ratio >= MAX_COLLATERAL_RATIO
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// POOL
// ═══════════════════════════════════════════════════════════════════════════════

/// Multi-collateral BRAX pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralPool {
    /// Pool address
    pub address: Address,
    manager: Address,
    custodian: Address,
    timelock: Address,
    collaterals: Vec<CollateralInfo>,
    mint_price_threshold: u128,
    redeem_price_threshold: u128,
    redemption_delay_secs: u64,
    redeem_collateral_balances: BTreeMap<Address, BTreeMap<usize, u128>>,
    redeem_bxs_balances: BTreeMap<Address, u128>,
    unclaimed_bxs: u128,
    last_redeemed: BTreeMap<Address, u64>,
}

impl CollateralPool {
    /// Deploy a pool accepting `collaterals` as `(token, decimals)`; all start disabled
    pub fn new(
        address: Address,
        manager: Address,
        custodian: Address,
        timelock: Address,
        collaterals: &[(Address, u8)],
        config: &PoolConfig,
    ) -> Result<Self> {
        validate_non_zero_address(&address)?;
        validate_non_zero_address(&manager)?;
        validate_fee(config.minting_fee, "minting_fee")?;
        validate_fee(config.redemption_fee, "redemption_fee")?;

        let collaterals = collaterals
            .iter()
            .map(|(token, decimals)| {
                validate_non_zero_address(token)?;
                let missing_decimals = ASSET_DECIMALS.checked_sub(*decimals).ok_or_else(|| {
                    Error::invalid_parameter("collateral", "more than 18 decimals")
                })?;
                Ok(CollateralInfo {
                    token: *token,
                    missing_decimals,
                    price: PRICE_PRECISION,
                    pool_ceiling: config.pool_ceiling,
                    enabled: false,
                    mint_paused: false,
                    redeem_paused: false,
                    minting_fee: config.minting_fee,
                    redemption_fee: config.redemption_fee,
                    unclaimed: 0,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            address,
            manager,
            custodian,
            timelock,
            collaterals,
            mint_price_threshold: config.mint_price_threshold,
            redeem_price_threshold: config.redeem_price_threshold,
            redemption_delay_secs: config.redemption_delay_secs,
            redeem_collateral_balances: BTreeMap::new(),
            redeem_bxs_balances: BTreeMap::new(),
            unclaimed_bxs: 0,
            last_redeemed: BTreeMap::new(),
        })
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // QUERIES
    // ═══════════════════════════════════════════════════════════════════════════

    /// Collateral settings by index
    pub fn collateral(&self, col_idx: usize) -> Result<&CollateralInfo> {
        self.collaterals
            .get(col_idx)
            .ok_or(Error::InvalidCollateralIndex(col_idx))
    }

    /// All collaterals
    pub fn collaterals(&self) -> &[CollateralInfo] {
        &self.collaterals
    }

    /// Index of `token` in the collateral list
    pub fn collateral_index(&self, token: &Address) -> Option<usize> {
        self.collaterals.iter().position(|c| c.token == *token)
    }

    /// `(mint, redeem)` price thresholds
    pub fn price_thresholds(&self) -> (u128, u128) {
        (self.mint_price_threshold, self.redeem_price_threshold)
    }

    /// Collateral held minus collateral owed to redeemers
    pub fn free_collateral(&self, col_idx: usize, pool_balance: u128) -> Result<u128> {
        let info = self.collateral(col_idx)?;
        Ok(pool_balance.saturating_sub(info.unclaimed))
    }

    /// Peg-unit value of one collateral's free balance, 18 decimals
    pub fn collateral_dollar_balance(&self, col_idx: usize, pool_balance: u128) -> Result<u128> {
        let info = self.collateral(col_idx)?;
        let free = self.free_collateral(col_idx, pool_balance)?;
        let scaled = free
            .checked_mul(pow10(info.missing_decimals)?)
            .ok_or_else(|| Error::overflow("collateral scale"))?;
        safe_mul_div(scaled, info.price, PRICE_PRECISION)
    }

    /// Peg-unit value of all free collateral, given each token's pool balance
    pub fn collateral_value(&self, balance_of: impl Fn(&Address) -> u128) -> Result<u128> {
        self.collaterals
            .iter()
            .enumerate()
            .try_fold(0u128, |total, (idx, info)| {
                let value = self.collateral_dollar_balance(idx, balance_of(&info.token))?;
                safe_add(total, value)
            })
    }

    /// Collateral units worth `brax_amount` BRAX at the collateral's price
    pub fn brax_in_collateral(&self, col_idx: usize, brax_amount: u128) -> Result<u128> {
        let info = self.collateral(col_idx)?;
        let unscaled = safe_mul_div(brax_amount, PRICE_PRECISION, pow10(info.missing_decimals)?)?;
        safe_mul_div(unscaled, 1, info.price)
    }

    /// Unclaimed collateral owed to `redeemer`
    pub fn redeem_collateral_balance(&self, redeemer: &Address, col_idx: usize) -> u128 {
        self.redeem_collateral_balances
            .get(redeemer)
            .and_then(|m| m.get(&col_idx))
            .copied()
            .unwrap_or(0)
    }

    /// Unclaimed BXS owed to `redeemer`
    pub fn redeem_bxs_balance(&self, redeemer: &Address) -> u128 {
        self.redeem_bxs_balances.get(redeemer).copied().unwrap_or(0)
    }

    /// Total BXS owed to redeemers
    pub fn unclaimed_bxs(&self) -> u128 {
        self.unclaimed_bxs
    }

    /// Seconds between redemption and collection
    pub fn redemption_delay_secs(&self) -> u64 {
        self.redemption_delay_secs
    }

    /// Collateral custodian
    pub fn custodian(&self) -> Address {
        self.custodian
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // QUOTES
    // ═══════════════════════════════════════════════════════════════════════════

    /// Evaluate a mint against current prices and the pool's free collateral
    pub fn quote_mint(
        &self,
        request: &MintRequest,
        prices: &PricingContext,
        pool_balance: u128,
    ) -> Result<MintQuote> {
        let info = self.collateral(request.col_idx)?;
        if !info.enabled {
            return Err(Error::CollateralDisabled);
        }
        if info.mint_paused {
            return Err(Error::MintPaused);
        }
        validate_non_zero(request.brax_amount)?;
        match prices.brax_price {
            Some(price) if price < self.mint_price_threshold => {
                return Err(Error::MintPriceTooLow {
                    price,
                    threshold: self.mint_price_threshold,
                });
            }
            Some(_) => {}
            None => warn!(pool = %self.address.short(), "no BRAX oracle; mint threshold skipped"),
        }

        let brax_out = amount_after_fee(request.brax_amount, info.minting_fee)?;
        let gcr = prices.global_collateral_ratio as u128;
        let (collat_needed, bxs_needed) =
            if request.one_to_one_override || prices.is_fully_collateralized() {
                (self.brax_in_collateral(request.col_idx, request.brax_amount)?, 0)
            } else if gcr == 0 {
                let bxs = safe_mul_div(request.brax_amount, PRICE_PRECISION, prices.bxs_price()?)?;
                (0, bxs)
            } else {
                let brax_for_collat = safe_mul_div(request.brax_amount, gcr, PRICE_PRECISION)?;
                let brax_for_bxs = request.brax_amount - brax_for_collat;
                let collat = self.brax_in_collateral(request.col_idx, brax_for_collat)?;
                let bxs = safe_mul_div(brax_for_bxs, PRICE_PRECISION, prices.bxs_price()?)?;
                (collat, bxs)
            };

        let free_after = safe_add(self.free_collateral(request.col_idx, pool_balance)?, collat_needed)?;
        if free_after > info.pool_ceiling {
            return Err(Error::PoolCeiling {
                requested: free_after,
                ceiling: info.pool_ceiling,
            });
        }
        if brax_out < request.brax_out_min {
            return Err(Error::Slippage("BRAX".into()));
        }
        if collat_needed > request.max_collat_in {
            return Err(Error::Slippage("Collat".into()));
        }
        if bxs_needed > request.max_bxs_in {
            return Err(Error::Slippage("BXS".into()));
        }

        Ok(MintQuote {
            brax_out,
            collat_needed,
            bxs_needed,
        })
    }

    /// Evaluate a redemption against current prices and the pool's free collateral
    pub fn quote_redeem(
        &self,
        request: &RedeemRequest,
        prices: &PricingContext,
        pool_balance: u128,
    ) -> Result<RedeemQuote> {
        let info = self.collateral(request.col_idx)?;
        if !info.enabled {
            return Err(Error::CollateralDisabled);
        }
        if info.redeem_paused {
            return Err(Error::RedeemPaused);
        }
        validate_non_zero(request.brax_amount)?;
        match prices.brax_price {
            Some(price) if price > self.redeem_price_threshold => {
                return Err(Error::RedeemPriceTooHigh {
                    price,
                    threshold: self.redeem_price_threshold,
                });
            }
            Some(_) => {}
            None => warn!(pool = %self.address.short(), "no BRAX oracle; redeem threshold skipped"),
        }

        let brax_after_fee = amount_after_fee(request.brax_amount, info.redemption_fee)?;
        let gcr = prices.global_collateral_ratio as u128;
        let (collat_out, bxs_out) = if prices.is_fully_collateralized() {
            (self.brax_in_collateral(request.col_idx, brax_after_fee)?, 0)
        } else if gcr == 0 {
            (0, safe_mul_div(brax_after_fee, PRICE_PRECISION, prices.bxs_price()?)?)
        } else {
            let collat = safe_mul_div(
                self.brax_in_collateral(request.col_idx, brax_after_fee)?,
                gcr,
                PRICE_PRECISION,
            )?;
            let bxs = safe_mul_div(brax_after_fee, PRICE_PRECISION - gcr, prices.bxs_price()?)?;
            (collat, bxs)
        };

        let available = self.free_collateral(request.col_idx, pool_balance)?;
        if collat_out > available {
            return Err(Error::InsufficientPoolCollateral {
                required: collat_out,
                available,
            });
        }
        if collat_out < request.col_out_min {
            return Err(Error::Slippage("Collateral".into()));
        }
        if bxs_out < request.bxs_out_min {
            return Err(Error::Slippage("BXS".into()));
        }

        Ok(RedeemQuote {
            collat_out,
            bxs_out,
        })
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // REDEMPTION ACCOUNTING
    // ═══════════════════════════════════════════════════════════════════════════

    /// Credit a passed redemption quote to `redeemer`
    pub(crate) fn record_redemption(
        &mut self,
        redeemer: &Address,
        col_idx: usize,
        quote: &RedeemQuote,
        now: u64,
    ) -> Result<()> {
        let owed = safe_add(self.redeem_collateral_balance(redeemer, col_idx), quote.collat_out)?;
        let owed_bxs = safe_add(self.redeem_bxs_balance(redeemer), quote.bxs_out)?;
        let unclaimed = safe_add(self.collateral(col_idx)?.unclaimed, quote.collat_out)?;
        let unclaimed_bxs = safe_add(self.unclaimed_bxs, quote.bxs_out)?;

        self.redeem_collateral_balances
            .entry(*redeemer)
            .or_default()
            .insert(col_idx, owed);
        self.redeem_bxs_balances.insert(*redeemer, owed_bxs);
        self.collaterals[col_idx].unclaimed = unclaimed;
        self.unclaimed_bxs = unclaimed_bxs;
        self.last_redeemed.insert(*redeemer, now);
        Ok(())
    }

    /// Check the delay and return `(collateral, bxs)` owed, without clearing it
    pub fn pending_collection(
        &self,
        redeemer: &Address,
        col_idx: usize,
        now: u64,
    ) -> Result<(u128, u128)> {
        self.collateral(col_idx)?;
        let last = self.last_redeemed.get(redeemer).copied().unwrap_or(0);
        let ready_at = last.saturating_add(self.redemption_delay_secs);
        if now < ready_at {
            return Err(Error::RedemptionDelay {
                remaining: ready_at - now,
            });
        }
        Ok((
            self.redeem_collateral_balance(redeemer, col_idx),
            self.redeem_bxs_balance(redeemer),
        ))
    }

    /// Clear what `pending_collection` reported
    pub(crate) fn clear_collection(
        &mut self,
        redeemer: &Address,
        col_idx: usize,
        collat: u128,
        bxs: u128,
    ) -> Result<()> {
        let unclaimed = safe_sub(self.collateral(col_idx)?.unclaimed, collat)?;
        let unclaimed_bxs = safe_sub(self.unclaimed_bxs, bxs)?;
        if let Some(balances) = self.redeem_collateral_balances.get_mut(redeemer) {
            balances.remove(&col_idx);
        }
        self.redeem_bxs_balances.remove(redeemer);
        self.collaterals[col_idx].unclaimed = unclaimed;
        self.unclaimed_bxs = unclaimed_bxs;
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // ADMIN
    // ═══════════════════════════════════════════════════════════════════════════

    fn authorize(&self, caller: &Address) -> Result<()> {
        if *caller == self.manager || (!self.timelock.is_zero() && *caller == self.timelock) {
            Ok(())
        } else {
            Err(Error::NotPoolAdmin)
        }
    }

    fn collateral_mut(&mut self, col_idx: usize) -> Result<&mut CollateralInfo> {
        self.collaterals
            .get_mut(col_idx)
            .ok_or(Error::InvalidCollateralIndex(col_idx))
    }

    /// Enable or disable a collateral
    pub fn toggle_collateral(&mut self, caller: &Address, col_idx: usize) -> Result<bool> {
        self.authorize(caller)?;
        let info = self.collateral_mut(col_idx)?;
        info.enabled = !info.enabled;
        Ok(info.enabled)
    }

    /// Pause or resume minting for a collateral
    pub fn toggle_mint(&mut self, caller: &Address, col_idx: usize) -> Result<bool> {
        self.authorize(caller)?;
        let info = self.collateral_mut(col_idx)?;
        info.mint_paused = !info.mint_paused;
        Ok(info.mint_paused)
    }

    /// Pause or resume redeeming for a collateral
    pub fn toggle_redeem(&mut self, caller: &Address, col_idx: usize) -> Result<bool> {
        self.authorize(caller)?;
        let info = self.collateral_mut(col_idx)?;
        info.redeem_paused = !info.redeem_paused;
        Ok(info.redeem_paused)
    }

    /// Set the BRAX price bounds for minting and redeeming
    pub fn set_price_thresholds(&mut self, caller: &Address, mint: u128, redeem: u128) -> Result<()> {
        self.authorize(caller)?;
        self.mint_price_threshold = mint;
        self.redeem_price_threshold = redeem;
        Ok(())
    }

    /// Set a collateral's price in the peg unit
    pub fn set_collateral_price(&mut self, caller: &Address, col_idx: usize, price: u128) -> Result<()> {
        self.authorize(caller)?;
        validate_price(price, "collateral_price")?;
        self.collateral_mut(col_idx)?.price = price;
        Ok(())
    }

    /// Set a collateral's ceiling
    pub fn set_pool_ceiling(&mut self, caller: &Address, col_idx: usize, ceiling: u128) -> Result<()> {
        self.authorize(caller)?;
        self.collateral_mut(col_idx)?.pool_ceiling = ceiling;
        Ok(())
    }

    /// Set a collateral's mint and redeem fees
    pub fn set_fees(
        &mut self,
        caller: &Address,
        col_idx: usize,
        minting_fee: u64,
        redemption_fee: u64,
    ) -> Result<()> {
        self.authorize(caller)?;
        validate_fee(minting_fee, "minting_fee")?;
        validate_fee(redemption_fee, "redemption_fee")?;
        let info = self.collateral_mut(col_idx)?;
        info.minting_fee = minting_fee;
        info.redemption_fee = redemption_fee;
        Ok(())
    }

    /// Set the redemption delay
    pub fn set_redemption_delay(&mut self, caller: &Address, secs: u64) -> Result<()> {
        self.authorize(caller)?;
        self.redemption_delay_secs = secs;
        Ok(())
    }
}
