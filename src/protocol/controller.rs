//! BRAX controller.
//!
//! The controller is the single owner of engine state: token ledgers, the
//! oracle book, the rebalancer, the pool registry and the deployed pools.
//! Every entry point evaluates the access policy once, validates, and only
//! then mutates, so a failed call leaves the controller untouched.
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut controller = BraxController::new("Brax", "BRAX", creator, timelock, &config)?;
//! controller.add_pool(&creator, pool_address)?;
//! let adjustment = controller.refresh_collateral_ratio(now)?;
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::core::config::{EngineConfig, OracleConfig};
use crate::core::pool::{
    CollateralPool, MintQuote, MintRequest, PricingContext, RedeemQuote, RedeemRequest,
};
use crate::core::registry::PoolRegistry;
use crate::core::token::Token;
use crate::error::{Error, Result};
use crate::governance::access::{AccessPolicy, CallerRole, Permission, Role};
use crate::governance::parameters::ControllerParameter;
use crate::oracle::price_feed::ExternalPriceFeed;
use crate::oracle::router::{PriceRouter, PricedAsset};
use crate::oracle::twap::{CumulativePriceSource, TwapOracle};
use crate::protocol::events::{EventLog, ProtocolEvent};
use crate::protocol::rebalancer::{Adjustment, Rebalancer};
use crate::utils::address::Address;
use crate::utils::constants::{ASSET_DECIMALS, MAX_COLLATERAL_RATIO};
use crate::utils::math::safe_add;
use crate::utils::validation::validate_non_zero_address;

// ═══════════════════════════════════════════════════════════════════════════════
// TYPES
// ═══════════════════════════════════════════════════════════════════════════════

/// Headline figures, as reported by `brax_info`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BraxInfo {
    /// BRAX price (1e8 scale)
    pub brax_price: u128,
    /// BXS price (1e8 scale)
    pub bxs_price: u128,
    /// BRAX total supply
    pub total_supply: u128,
    /// Global collateral ratio
    pub global_collateral_ratio: u64,
    /// Value of all free pool collateral, 18 decimals
    pub global_collateral_value: u128,
    /// Advertised minting fee
    pub minting_fee: u64,
    /// Advertised redemption fee
    pub redemption_fee: u64,
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONTROLLER
// ═══════════════════════════════════════════════════════════════════════════════

/// Top-level engine context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BraxController {
    brax_address: Address,
    bxs_address: Address,
    tokens: BTreeMap<Address, Token>,
    pools: BTreeMap<Address, CollateralPool>,
    registry: PoolRegistry,
    router: PriceRouter,
    rebalancer: Rebalancer,
    policy: AccessPolicy,
    oracle_config: OracleConfig,
    minting_fee: u64,
    redemption_fee: u64,
    clock: u64,
    events: EventLog,
}

impl BraxController {
    /// Deploy BRAX, minting the genesis supply to `creator`
    pub fn new(
        name: &str,
        symbol: &str,
        creator: Address,
        timelock: Address,
        config: &EngineConfig,
    ) -> Result<Self> {
        config.validate()?;
        let policy = AccessPolicy::new(creator, timelock)?;
        let brax_address = Address::from_label(&format!("token:{}", symbol));
        let brax = Token::with_genesis(
            brax_address,
            name,
            symbol,
            ASSET_DECIMALS,
            creator,
            config.genesis.brax_supply,
        )?;

        let mut tokens = BTreeMap::new();
        tokens.insert(brax_address, brax);

        info!(
            token = %brax_address.short(),
            creator = %creator.short(),
            supply = config.genesis.brax_supply,
            "BRAX deployed"
        );

        Ok(Self {
            brax_address,
            bxs_address: Address::ZERO,
            tokens,
            pools: BTreeMap::new(),
            registry: PoolRegistry::new(),
            router: PriceRouter::new(),
            rebalancer: Rebalancer::new(&config.rebalancer),
            policy,
            oracle_config: config.oracle.clone(),
            minting_fee: config.pool.minting_fee,
            redemption_fee: config.pool.redemption_fee,
            clock: 0,
            events: EventLog::new(),
        })
    }

    fn authorize(&self, caller: &Address, permission: Permission) -> Result<CallerRole> {
        self.policy.authorize(caller, permission, &self.registry)
    }

    fn observe(&mut self, now: u64) {
        self.clock = self.clock.max(now);
    }

    fn record(&mut self, event: ProtocolEvent) {
        self.events.push(self.clock, event);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // ROLES
    // ═══════════════════════════════════════════════════════════════════════════

    /// True if `account` holds `role`
    pub fn has_role(&self, role: Role, account: &Address) -> bool {
        self.policy.has_role(role, account)
    }

    /// Number of holders of `role`
    pub fn role_member_count(&self, role: Role) -> usize {
        self.policy.role_member_count(role)
    }

    /// Grant `role`; admin only
    pub fn grant_role(&mut self, caller: &Address, role: Role, account: Address) -> Result<()> {
        self.policy.grant_role(caller, role, account)
    }

    /// Revoke `role`; admin only
    pub fn revoke_role(&mut self, caller: &Address, role: Role, account: &Address) -> Result<()> {
        self.policy.revoke_role(caller, role, account)
    }

    /// Deployer
    pub fn creator_address(&self) -> Address {
        self.policy.owner()
    }

    /// Governance timelock
    pub fn timelock_address(&self) -> Address {
        self.policy.timelock()
    }

    /// Controller, zero when unset
    pub fn controller_address(&self) -> Address {
        self.policy.controller()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // GOVERNANCE
    // ═══════════════════════════════════════════════════════════════════════════

    /// Current value of a numeric parameter
    pub fn parameter(&self, parameter: ControllerParameter) -> u64 {
        match parameter {
            ControllerParameter::MintingFee => self.minting_fee,
            ControllerParameter::RedemptionFee => self.redemption_fee,
            ControllerParameter::BraxStep => self.rebalancer.brax_step(),
            ControllerParameter::PriceTarget => self.rebalancer.price_target(),
            ControllerParameter::PriceBand => self.rebalancer.price_band(),
            ControllerParameter::RefreshCooldown => self.rebalancer.refresh_cooldown(),
        }
    }

    /// Set a numeric parameter
    pub fn set_parameter(
        &mut self,
        caller: &Address,
        parameter: ControllerParameter,
        value: u64,
    ) -> Result<()> {
        self.authorize(caller, Permission::Governance)?;
        parameter.validate(value)?;
        let (target, band) = match parameter {
            ControllerParameter::PriceTarget => (value, self.rebalancer.price_band()),
            ControllerParameter::PriceBand => (self.rebalancer.price_target(), value),
            _ => (self.rebalancer.price_target(), self.rebalancer.price_band()),
        };
        if band >= target {
            return Err(Error::invalid_parameter(
                parameter.name(),
                format!("price band {} must be below price target {}", band, target),
            ));
        }
        let old_value = self.parameter(parameter);

        match parameter {
            ControllerParameter::MintingFee => self.minting_fee = value,
            ControllerParameter::RedemptionFee => self.redemption_fee = value,
            ControllerParameter::BraxStep => self.rebalancer.set_brax_step(value),
            ControllerParameter::PriceTarget => self.rebalancer.set_price_target(value),
            ControllerParameter::PriceBand => self.rebalancer.set_price_band(value),
            ControllerParameter::RefreshCooldown => self.rebalancer.set_refresh_cooldown(value),
        }

        info!(%parameter, old_value, new_value = value, "parameter changed");
        self.record(ProtocolEvent::ParameterChanged {
            parameter,
            old_value,
            new_value: value,
        });
        Ok(())
    }

    /// Set the advertised redemption fee
    pub fn set_redemption_fee(&mut self, caller: &Address, fee: u64) -> Result<()> {
        self.set_parameter(caller, ControllerParameter::RedemptionFee, fee)
    }

    /// Set the advertised minting fee
    pub fn set_minting_fee(&mut self, caller: &Address, fee: u64) -> Result<()> {
        self.set_parameter(caller, ControllerParameter::MintingFee, fee)
    }

    /// Set the GCR step per refresh
    pub fn set_brax_step(&mut self, caller: &Address, step: u64) -> Result<()> {
        self.set_parameter(caller, ControllerParameter::BraxStep, step)
    }

    /// Set the peg target
    pub fn set_price_target(&mut self, caller: &Address, target: u64) -> Result<()> {
        self.set_parameter(caller, ControllerParameter::PriceTarget, target)
    }

    /// Set the dead band
    pub fn set_price_band(&mut self, caller: &Address, band: u64) -> Result<()> {
        self.set_parameter(caller, ControllerParameter::PriceBand, band)
    }

    /// Set the refresh cooldown
    pub fn set_refresh_cooldown(&mut self, caller: &Address, cooldown: u64) -> Result<()> {
        self.set_parameter(caller, ControllerParameter::RefreshCooldown, cooldown)
    }

    fn record_address(&mut self, setting: &str, address: Address) {
        info!(setting, address = %address.short(), "address changed");
        self.record(ProtocolEvent::AddressChanged {
            setting: setting.to_string(),
            address,
        });
    }

    /// Point the controller at the BXS ledger
    pub fn set_bxs_address(&mut self, caller: &Address, bxs: Address) -> Result<()> {
        self.authorize(caller, Permission::Governance)?;
        validate_non_zero_address(&bxs)?;
        self.bxs_address = bxs;
        self.record_address("bxs_address", bxs);
        Ok(())
    }

    /// Install the wBTC:BTC feed
    pub fn set_wbtc_btc_feed(&mut self, caller: &Address, feed: ExternalPriceFeed) -> Result<()> {
        self.authorize(caller, Permission::Governance)?;
        validate_non_zero_address(&feed.address)?;
        let address = feed.address;
        self.router.set_collateral_feed(feed);
        self.record_address("wbtc_btc_feed", address);
        Ok(())
    }

    /// Change the governance timelock; the old timelock keeps its pauser role
    pub fn set_timelock(&mut self, caller: &Address, timelock: Address) -> Result<()> {
        self.authorize(caller, Permission::Governance)?;
        self.policy.set_timelock(timelock)?;
        self.record_address("timelock", timelock);
        Ok(())
    }

    /// Change the controller address
    pub fn set_controller(&mut self, caller: &Address, controller: Address) -> Result<()> {
        self.authorize(caller, Permission::Governance)?;
        self.policy.set_controller(controller)?;
        self.record_address("controller", controller);
        Ok(())
    }

    fn set_oracle(
        &mut self,
        caller: &Address,
        asset: PricedAsset,
        oracle: Address,
        collateral_token: Address,
    ) -> Result<()> {
        self.authorize(caller, Permission::Governance)?;
        self.router.assign(asset, oracle, collateral_token)?;
        self.record(ProtocolEvent::OracleAssigned {
            asset,
            oracle,
            collateral_token,
        });
        Ok(())
    }

    /// Price BRAX through `oracle`, with `collateral_token` as the quote side
    pub fn set_brax_oracle(
        &mut self,
        caller: &Address,
        oracle: Address,
        collateral_token: Address,
    ) -> Result<()> {
        self.set_oracle(caller, PricedAsset::Brax, oracle, collateral_token)
    }

    /// Price BXS through `oracle`, with `collateral_token` as the quote side
    pub fn set_bxs_oracle(
        &mut self,
        caller: &Address,
        oracle: Address,
        collateral_token: Address,
    ) -> Result<()> {
        self.set_oracle(caller, PricedAsset::Bxs, oracle, collateral_token)
    }

    /// Register a pool
    pub fn add_pool(&mut self, caller: &Address, pool: Address) -> Result<()> {
        self.authorize(caller, Permission::Governance)?;
        self.registry.add(pool)?;
        self.record(ProtocolEvent::PoolAdded { pool });
        Ok(())
    }

    /// Deregister a pool
    pub fn remove_pool(&mut self, caller: &Address, pool: Address) -> Result<()> {
        self.authorize(caller, Permission::Governance)?;
        self.registry.remove(pool)?;
        self.record(ProtocolEvent::PoolRemoved { pool });
        Ok(())
    }

    /// Pause or resume collateral-ratio refreshes, returning the new state
    pub fn toggle_collateral_ratio(&mut self, caller: &Address) -> Result<bool> {
        self.authorize(caller, Permission::CollateralRatioPauser)?;
        let paused = self.rebalancer.toggle_paused();
        info!(paused, "collateral ratio toggled");
        self.record(ProtocolEvent::CollateralRatioToggled { paused });
        Ok(paused)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // LEDGERS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Add a ledger (BXS, a collateral token) to the controller's book
    pub fn register_token(&mut self, caller: &Address, token: Token) -> Result<()> {
        self.authorize(caller, Permission::Governance)?;
        if self.tokens.contains_key(&token.address) {
            return Err(Error::invalid_parameter(
                "token",
                format!("{} already registered", token.address),
            ));
        }
        info!(token = %token.address.short(), symbol = %token.symbol, "token registered");
        self.tokens.insert(token.address, token);
        Ok(())
    }

    /// Ledger by address
    pub fn token(&self, token: &Address) -> Result<&Token> {
        self.tokens
            .get(token)
            .ok_or_else(|| Error::UnknownToken(token.to_hex()))
    }

    fn token_mut(&mut self, token: &Address) -> Result<&mut Token> {
        self.tokens
            .get_mut(token)
            .ok_or_else(|| Error::UnknownToken(token.to_hex()))
    }

    /// All ledgers
    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.tokens.values()
    }

    /// BRAX token address
    pub fn brax_address(&self) -> Address {
        self.brax_address
    }

    /// BXS token address, zero when unset
    pub fn bxs_address(&self) -> Address {
        self.bxs_address
    }

    /// BRAX ledger
    pub fn brax(&self) -> Result<&Token> {
        self.token(&self.brax_address)
    }

    /// Move `amount` of `token` from `caller` to `to`
    pub fn transfer(
        &mut self,
        token: &Address,
        caller: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<()> {
        self.token_mut(token)?.transfer(caller, to, amount)
    }

    /// Set `spender`'s allowance over `caller`'s `token`
    pub fn approve(
        &mut self,
        token: &Address,
        caller: &Address,
        spender: &Address,
        amount: u128,
    ) -> Result<()> {
        self.token_mut(token)?.approve(caller, spender, amount)
    }

    /// Move `amount` of `from`'s `token` using `caller`'s allowance
    pub fn transfer_from(
        &mut self,
        token: &Address,
        caller: &Address,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<()> {
        self.token_mut(token)?.transfer_from(caller, from, to, amount)
    }

    /// Allowance of `spender` over `owner`'s `token`
    pub fn allowance(&self, token: &Address, owner: &Address, spender: &Address) -> Result<u128> {
        Ok(self.token(token)?.allowance(owner, spender))
    }

    /// Balance of `owner` in `token`
    pub fn balance_of(&self, token: &Address, owner: &Address) -> Result<u128> {
        Ok(self.token(token)?.balance_of(owner))
    }

    /// Total supply of `token`
    pub fn total_supply(&self, token: &Address) -> Result<u128> {
        Ok(self.token(token)?.total_supply())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // POOLS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Deploy a pool; it still has to be registered with `add_pool` to mint
    pub fn deploy_pool(&mut self, caller: &Address, pool: CollateralPool) -> Result<()> {
        self.authorize(caller, Permission::Governance)?;
        if self.pools.contains_key(&pool.address) {
            return Err(Error::invalid_parameter(
                "pool",
                format!("{} already deployed", pool.address),
            ));
        }
        for info in pool.collaterals() {
            self.token(&info.token)?;
        }
        info!(pool = %pool.address.short(), collaterals = pool.collaterals().len(), "pool deployed");
        self.pools.insert(pool.address, pool);
        Ok(())
    }

    /// Deployed pool by address
    pub fn pool(&self, pool: &Address) -> Result<&CollateralPool> {
        self.pools
            .get(pool)
            .ok_or_else(|| Error::PoolNotFound(pool.to_hex()))
    }

    /// Mutable deployed pool; admin setters check their own caller
    pub fn pool_mut(&mut self, pool: &Address) -> Result<&mut CollateralPool> {
        self.pools
            .get_mut(pool)
            .ok_or_else(|| Error::PoolNotFound(pool.to_hex()))
    }

    /// Registry slot `index`; zero for a removed pool
    pub fn pools_array(&self, index: usize) -> Result<Address> {
        self.registry.slot(index)
    }

    /// True if `pool` is registered
    pub fn is_pool(&self, pool: &Address) -> bool {
        self.registry.is_pool(pool)
    }

    /// Pool registry
    pub fn registry(&self) -> &PoolRegistry {
        &self.registry
    }

    /// Mint BRAX to `to`; registered pools only
    pub fn pool_mint(&mut self, caller: &Address, to: &Address, amount: u128) -> Result<()> {
        self.authorize(caller, Permission::Pool)?;
        let brax = self.brax_address;
        self.token_mut(&brax)?.mint(to, amount)
    }

    /// Burn `from`'s BRAX using the pool's allowance; registered pools only
    pub fn pool_burn_from(&mut self, caller: &Address, from: &Address, amount: u128) -> Result<()> {
        self.authorize(caller, Permission::Pool)?;
        let brax = self.brax_address;
        self.token_mut(&brax)?.burn_from(caller, from, amount)
    }

    fn pricing_context(&self, needs_bxs: bool, now: u64) -> Result<PricingContext> {
        let global_collateral_ratio = self.rebalancer.global_collateral_ratio();
        let brax_price = match self.router.assignment(PricedAsset::Brax) {
            Some(_) => Some(self.router.brax_price(now)?),
            None => None,
        };
        let bxs_price = if needs_bxs
            && global_collateral_ratio < MAX_COLLATERAL_RATIO
            && self.router.assignment(PricedAsset::Bxs).is_some()
        {
            Some(self.router.bxs_price(now)?)
        } else {
            None
        };
        Ok(PricingContext {
            global_collateral_ratio,
            brax_price,
            bxs_price,
        })
    }

    fn pool_balance(&self, pool: &Address, col_idx: usize) -> Result<(Address, u128)> {
        let collateral = self.pool(pool)?.collateral(col_idx)?.token;
        let balance = self.token(&collateral)?.balance_of(pool);
        Ok((collateral, balance))
    }

    /// Mint BRAX through `pool`, pulling collateral and burning BXS from `caller`
    pub fn mint_brax(
        &mut self,
        caller: &Address,
        pool: &Address,
        request: MintRequest,
        now: u64,
    ) -> Result<MintQuote> {
        validate_non_zero_address(caller)?;
        if !self.registry.is_pool(pool) {
            return Err(Error::NotPool);
        }
        let prices = self.pricing_context(!request.one_to_one_override, now)?;
        let (collateral, pool_balance) = self.pool_balance(pool, request.col_idx)?;
        let quote = self.pool(pool)?.quote_mint(&request, &prices, pool_balance)?;

        let brax = self.brax_address;
        let bxs = self.bxs_address;
        self.token(&collateral)?
            .ensure_spendable(caller, pool, quote.collat_needed)?;
        if quote.bxs_needed > 0 {
            self.token(&bxs)?
                .ensure_spendable(caller, pool, quote.bxs_needed)?;
        }
        self.token(&brax)?.ensure_mintable(quote.brax_out)?;

        self.observe(now);
        if quote.bxs_needed > 0 {
            self.token_mut(&bxs)?.burn_from(pool, caller, quote.bxs_needed)?;
        }
        if quote.collat_needed > 0 {
            self.token_mut(&collateral)?
                .transfer_from(pool, caller, pool, quote.collat_needed)?;
        }
        if quote.brax_out > 0 {
            self.token_mut(&brax)?.mint(caller, quote.brax_out)?;
        }

        info!(
            pool = %pool.short(),
            minter = %caller.short(),
            brax_out = quote.brax_out,
            collat_in = quote.collat_needed,
            bxs_in = quote.bxs_needed,
            "BRAX minted"
        );
        self.record(ProtocolEvent::BraxMinted {
            pool: *pool,
            minter: *caller,
            brax_out: quote.brax_out,
            collateral_in: quote.collat_needed,
            bxs_in: quote.bxs_needed,
        });
        Ok(quote)
    }

    /// Burn `caller`'s BRAX through `pool`, crediting collateral and BXS for collection
    pub fn redeem_brax(
        &mut self,
        caller: &Address,
        pool: &Address,
        request: RedeemRequest,
        now: u64,
    ) -> Result<RedeemQuote> {
        validate_non_zero_address(caller)?;
        if !self.registry.is_pool(pool) {
            return Err(Error::NotPool);
        }
        let prices = self.pricing_context(true, now)?;
        let (_, pool_balance) = self.pool_balance(pool, request.col_idx)?;
        let quote = self.pool(pool)?.quote_redeem(&request, &prices, pool_balance)?;

        let brax = self.brax_address;
        let bxs = self.bxs_address;
        self.token(&brax)?
            .ensure_spendable(caller, pool, request.brax_amount)?;
        if quote.bxs_out > 0 {
            self.token(&bxs)?.ensure_mintable(quote.bxs_out)?;
        }

        self.observe(now);
        self.pool_mut(pool)?
            .record_redemption(caller, request.col_idx, &quote, now)?;
        if quote.bxs_out > 0 {
            self.token_mut(&bxs)?.mint(pool, quote.bxs_out)?;
        }
        self.token_mut(&brax)?
            .burn_from(pool, caller, request.brax_amount)?;

        info!(
            pool = %pool.short(),
            redeemer = %caller.short(),
            brax_in = request.brax_amount,
            collat_out = quote.collat_out,
            bxs_out = quote.bxs_out,
            "BRAX redeemed"
        );
        self.record(ProtocolEvent::BraxRedeemed {
            pool: *pool,
            redeemer: *caller,
            brax_in: request.brax_amount,
            collateral_out: quote.collat_out,
            bxs_out: quote.bxs_out,
        });
        Ok(quote)
    }

    /// Pay out `caller`'s redeemed balances once the delay has passed
    pub fn collect_redemption(
        &mut self,
        caller: &Address,
        pool: &Address,
        col_idx: usize,
        now: u64,
    ) -> Result<(u128, u128)> {
        validate_non_zero_address(caller)?;
        let (collateral, pool_balance) = self.pool_balance(pool, col_idx)?;
        let (collat_out, bxs_out) = self.pool(pool)?.pending_collection(caller, col_idx, now)?;

        let bxs = self.bxs_address;
        if collat_out > pool_balance {
            return Err(Error::InsufficientPoolCollateral {
                required: collat_out,
                available: pool_balance,
            });
        }
        if bxs_out > 0 {
            let available = self.token(&bxs)?.balance_of(pool);
            if bxs_out > available {
                return Err(Error::InsufficientBalance {
                    required: bxs_out,
                    available,
                });
            }
        }

        self.observe(now);
        self.pool_mut(pool)?
            .clear_collection(caller, col_idx, collat_out, bxs_out)?;
        if collat_out > 0 {
            self.token_mut(&collateral)?.transfer(pool, caller, collat_out)?;
        }
        if bxs_out > 0 {
            self.token_mut(&bxs)?.transfer(pool, caller, bxs_out)?;
        }

        debug!(pool = %pool.short(), redeemer = %caller.short(), collat_out, bxs_out, "redemption collected");
        self.record(ProtocolEvent::RedemptionCollected {
            pool: *pool,
            redeemer: *caller,
            collateral: collat_out,
            bxs: bxs_out,
        });
        Ok((collat_out, bxs_out))
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // ORACLES
    // ═══════════════════════════════════════════════════════════════════════════

    /// Deploy a TWAP oracle on `source`, owned by `caller`
    pub fn deploy_oracle(
        &mut self,
        caller: &Address,
        address: Address,
        source: &impl CumulativePriceSource,
    ) -> Result<()> {
        self.authorize(caller, Permission::Public)?;
        let mut oracle = TwapOracle::new(address, source, *caller, self.policy.timelock())?;
        oracle.set_period(caller, self.oracle_config.period_secs)?;
        oracle.set_consult_leniency(caller, self.oracle_config.consult_leniency_secs)?;
        oracle.set_allow_stale_consults(caller, self.oracle_config.allow_stale_consults)?;
        let pair = oracle.pair;
        self.router.deploy_oracle(oracle)?;
        self.record(ProtocolEvent::OracleDeployed {
            oracle: address,
            pair,
        });
        Ok(())
    }

    /// Close an oracle's TWAP window; anyone may call
    pub fn update_oracle(
        &mut self,
        oracle: &Address,
        source: &impl CumulativePriceSource,
        now: u64,
    ) -> Result<()> {
        self.router.update_oracle(oracle, source, now)?;
        self.observe(now);
        self.record(ProtocolEvent::OracleUpdated { oracle: *oracle });
        Ok(())
    }

    /// Deployed oracle by address
    pub fn oracle(&self, oracle: &Address) -> Result<&TwapOracle> {
        self.router.oracle(oracle)
    }

    /// Mutable deployed oracle; its setters check their own caller
    pub fn oracle_mut(&mut self, oracle: &Address) -> Result<&mut TwapOracle> {
        self.router.oracle_mut(oracle)
    }

    /// All deployed oracles
    pub fn oracles(&self) -> impl Iterator<Item = &TwapOracle> {
        self.router.oracles()
    }

    /// Price router
    pub fn router(&self) -> &PriceRouter {
        &self.router
    }

    /// wBTC:BTC feed, for reporting new rounds
    pub fn feed_mut(&mut self) -> Result<&mut ExternalPriceFeed> {
        self.router.collateral_feed_mut()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // COLLATERAL RATIO
    // ═══════════════════════════════════════════════════════════════════════════

    /// Step the GCR against the current BRAX price; anyone may call
    pub fn refresh_collateral_ratio(&mut self, now: u64) -> Result<Adjustment> {
        self.rebalancer.check_ready(now)?;
        let brax_price = self.router.brax_price(now)?;
        let adjustment = self.rebalancer.apply(brax_price, now);
        self.observe(now);

        match adjustment {
            Adjustment::Unchanged { ratio } => {
                debug!(brax_price, ratio, "collateral ratio in band")
            }
            Adjustment::Decreased { from, to } | Adjustment::Increased { from, to } => {
                info!(brax_price, from, to, "collateral ratio refreshed")
            }
        }
        self.record(ProtocolEvent::CollateralRatioRefreshed {
            brax_price,
            adjustment,
        });
        Ok(adjustment)
    }

    /// Rebalancer state
    pub fn rebalancer(&self) -> &Rebalancer {
        &self.rebalancer
    }

    /// Current global collateral ratio
    pub fn global_collateral_ratio(&self) -> u64 {
        self.rebalancer.global_collateral_ratio()
    }

    /// Whether refreshes are paused
    pub fn collateral_ratio_paused(&self) -> bool {
        self.rebalancer.is_paused()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // PRICES AND VALUATION
    // ═══════════════════════════════════════════════════════════════════════════

    /// BRAX price in the peg unit (1e8 scale)
    pub fn brax_price(&self, now: u64) -> Result<u128> {
        self.router.brax_price(now)
    }

    /// BXS price in the peg unit (1e8 scale)
    pub fn bxs_price(&self, now: u64) -> Result<u128> {
        self.router.bxs_price(now)
    }

    /// Peg-unit value of free collateral across registered pools, recomputed per read
    pub fn global_collateral_value(&self) -> Result<u128> {
        self.registry
            .active()
            .try_fold(0u128, |total, address| {
                let pool = self.pool(address)?;
                let value = pool.collateral_value(|token| {
                    self.tokens
                        .get(token)
                        .map(|ledger| ledger.balance_of(address))
                        .unwrap_or(0)
                })?;
                safe_add(total, value)
            })
    }

    /// Headline figures
    pub fn brax_info(&self, now: u64) -> Result<BraxInfo> {
        Ok(BraxInfo {
            brax_price: self.brax_price(now)?,
            bxs_price: self.bxs_price(now)?,
            total_supply: self.brax()?.total_supply(),
            global_collateral_ratio: self.global_collateral_ratio(),
            global_collateral_value: self.global_collateral_value()?,
            minting_fee: self.minting_fee,
            redemption_fee: self.redemption_fee,
        })
    }

    /// Event log
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Latest time the controller has observed
    pub fn clock(&self) -> u64 {
        self.clock
    }
}
