//! Integration tests for the BRAX engine.
//!
//! These tests drive the standard deployment end to end: oracles over live
//! pairs, collateral-ratio refreshes, pool mint/redeem/collect and governance.

use brax::amm::ConstantProductPair;
use brax::core::config::{EngineConfig, PoolConfig};
use brax::core::pool::{CollateralPool, MintRequest, RedeemRequest};
use brax::error::Error;
use brax::governance::Role;
use brax::oracle::PricedAsset;
use brax::protocol::events::ProtocolEvent;
use brax::protocol::rebalancer::Adjustment;
use brax::sim::{Deployment, ORACLE_WARMUP_SECS};
use brax::storage::Snapshot;
use brax::utils::address::Address;
use brax::utils::constants::{MAX_COLLATERAL_RATIO, ONE_TOKEN, ONE_WBTC, PRICE_PRECISION};

const T0: u64 = 1_700_000_000;
const STEP: u64 = 250_000;
const BAND: u128 = 500_000;

// ═══════════════════════════════════════════════════════════════════════════════
// TEST HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

fn warmed_up() -> Deployment {
    let mut d = Deployment::standard(EngineConfig::default(), T0).unwrap();
    d.deploy_oracles().unwrap();
    d
}

/// Close one full TWAP window at the current reserves
fn next_window(d: &mut Deployment) {
    d.advance(3_600).unwrap();
    d.update_oracles().unwrap();
}

fn push_price_up(d: &mut Deployment) {
    d.buy_brax(ONE_WBTC).unwrap();
    next_window(d);
}

fn push_price_down(d: &mut Deployment, brax_in: u128) {
    d.sell_brax(brax_in).unwrap();
    next_window(d);
}

fn mint_request(brax_amount: u128) -> MintRequest {
    MintRequest {
        col_idx: 0,
        brax_amount,
        brax_out_min: 0,
        max_collat_in: u128::MAX,
        max_bxs_in: u128::MAX,
        one_to_one_override: false,
    }
}

fn redeem_request(brax_amount: u128) -> RedeemRequest {
    RedeemRequest {
        col_idx: 0,
        brax_amount,
        bxs_out_min: 0,
        col_out_min: 0,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ORACLE TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_oracles_price_seeded_pairs() {
    let d = warmed_up();
    let now = d.now();
    assert_eq!(now, T0 + ORACLE_WARMUP_SECS);

    let oracle = d.controller.oracle(&d.brax_oracle).unwrap();
    assert_eq!(oracle.pair, d.brax_pair);
    assert_eq!(oracle.block_timestamp_last(), now);
    assert!(!oracle.can_update(now));

    // 10 BRAX : 10 wBTC and 100 BXS : 10 wBTC
    assert_eq!(d.controller.brax_price(now).unwrap(), PRICE_PRECISION);
    assert_eq!(d.controller.bxs_price(now).unwrap(), PRICE_PRECISION / 10);

    let assignment = d.controller.router().assignment(PricedAsset::Brax).unwrap();
    assert_eq!(assignment.oracle, d.brax_oracle);
    assert_eq!(assignment.collateral_token, d.wbtc);
}

#[test]
fn test_oracle_update_needs_full_period() {
    let mut d = warmed_up();
    assert!(matches!(
        d.update_oracles(),
        Err(Error::PeriodNotElapsed { elapsed: 0, .. })
    ));

    d.advance(3_599).unwrap();
    assert!(matches!(
        d.update_oracles(),
        Err(Error::PeriodNotElapsed { elapsed: 3_599, .. })
    ));

    d.advance(1).unwrap();
    d.update_oracles().unwrap();
}

#[test]
fn test_twap_lags_spot_until_window_closes() {
    let mut d = warmed_up();
    d.buy_brax(ONE_WBTC).unwrap();

    // Spot moved, the closed window did not
    let now = d.now();
    assert_eq!(d.controller.brax_price(now).unwrap(), PRICE_PRECISION);

    next_window(&mut d);
    let price = d.controller.brax_price(d.now()).unwrap();
    assert!(price > PRICE_PRECISION + BAND, "price {}", price);
}

#[test]
fn test_reassigned_oracle_prices_immediately() {
    let mut d = warmed_up();
    let (creator, brax, wbtc) = (d.creator, d.controller.brax_address(), d.wbtc);

    // 10 BRAX : 5 wBTC prices BRAX at half a BTC
    let mut pair = ConstantProductPair::new(
        Address::from_label("pair:alt"),
        brax,
        18,
        wbtc,
        8,
    )
    .unwrap();
    pair.add_liquidity(&brax, 10 * ONE_TOKEN, 5 * ONE_WBTC, d.now()).unwrap();
    let alt_oracle = Address::from_label("oracle:alt");
    d.controller.deploy_oracle(&creator, alt_oracle, &pair).unwrap();

    next_window(&mut d);
    d.controller.update_oracle(&alt_oracle, &pair, d.now()).unwrap();
    let now = d.now();
    assert_eq!(d.controller.brax_price(now).unwrap(), PRICE_PRECISION);

    d.controller.set_brax_oracle(&creator, alt_oracle, wbtc).unwrap();
    assert_eq!(d.controller.brax_price(now).unwrap(), PRICE_PRECISION / 2);

    let brax_oracle = d.brax_oracle;
    d.controller.set_brax_oracle(&creator, brax_oracle, wbtc).unwrap();
    assert_eq!(d.controller.brax_price(now).unwrap(), PRICE_PRECISION);
}

#[test]
fn test_stale_oracle_rejected() {
    let mut d = warmed_up();
    // period 3600 + leniency 120
    d.advance(3_719).unwrap();
    assert!(d.controller.brax_price(d.now()).is_ok());

    d.advance(1).unwrap();
    assert!(matches!(
        d.controller.brax_price(d.now()),
        Err(Error::StaleOracle { age: 3_720, max_age: 3_720 })
    ));
    assert!(matches!(
        d.controller.refresh_collateral_ratio(d.now()),
        Err(Error::StaleOracle { .. })
    ));
}

#[test]
fn test_stale_feed_rejected() {
    let mut d = warmed_up();
    d.set_feed_heartbeat(false);
    d.advance(3_601).unwrap();
    assert!(matches!(
        d.controller.brax_price(d.now()),
        Err(Error::StalePrice { age: 3_601, max_age: 3_600 })
    ));

    d.report_feed(100_000_000).unwrap();
    assert!(d.controller.brax_price(d.now()).is_ok());
}

#[test]
fn test_feed_depeg_moves_both_prices() {
    let mut d = warmed_up();
    // wBTC trades at 0.98 BTC
    d.report_feed(98_000_000).unwrap();
    let now = d.now();
    assert_eq!(d.controller.brax_price(now).unwrap(), 98_000_000);
    assert_eq!(d.controller.bxs_price(now).unwrap(), 9_800_000);
}

#[test]
fn test_unassigned_and_undeployed_oracles() {
    let mut d = Deployment::standard(EngineConfig::default(), T0).unwrap();
    assert!(matches!(
        d.controller.brax_price(T0),
        Err(Error::OracleNotSet(_))
    ));

    let ghost = Address::from_label("oracle:ghost");
    let (creator, wbtc) = (d.creator, d.wbtc);
    d.controller.set_brax_oracle(&creator, ghost, wbtc).unwrap();
    assert!(matches!(
        d.controller.brax_price(T0),
        Err(Error::OracleNotFound(_))
    ));
}

// ═══════════════════════════════════════════════════════════════════════════════
// COLLATERAL RATIO TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_brax_info() {
    let d = warmed_up();
    let info = d.controller.brax_info(d.now()).unwrap();

    assert_eq!(info.brax_price, PRICE_PRECISION);
    assert_eq!(info.bxs_price, PRICE_PRECISION / 10);
    assert_eq!(info.global_collateral_ratio, MAX_COLLATERAL_RATIO);
    assert_eq!(info.global_collateral_value, 10 * ONE_TOKEN);
    // Genesis plus the fixture's 10 BRAX mint, net of the minting fee
    assert_eq!(info.total_supply, 2 * ONE_TOKEN + 9_999_700_000_000_000_000);
    assert_eq!(info.minting_fee, 3_000);
    assert_eq!(info.redemption_fee, 5_000);
}

#[test]
fn test_in_band_keeps_ratio() {
    let mut d = warmed_up();
    let now = d.now();
    let adjustment = d.controller.refresh_collateral_ratio(now).unwrap();
    assert_eq!(adjustment, Adjustment::Unchanged { ratio: MAX_COLLATERAL_RATIO });
    assert_eq!(d.controller.rebalancer().last_call_time(), Some(now));
}

#[test]
fn test_ratio_steps_down_above_band() {
    let mut d = warmed_up();
    push_price_up(&mut d);

    let adjustment = d.controller.refresh_collateral_ratio(d.now()).unwrap();
    assert_eq!(
        adjustment,
        Adjustment::Decreased {
            from: MAX_COLLATERAL_RATIO,
            to: MAX_COLLATERAL_RATIO - STEP,
        }
    );
    assert_eq!(d.controller.global_collateral_ratio(), 99_750_000);
}

#[test]
fn test_ratio_steps_up_below_band() {
    let mut d = warmed_up();
    push_price_up(&mut d);
    d.controller.refresh_collateral_ratio(d.now()).unwrap();

    push_price_down(&mut d, 2 * ONE_TOKEN);
    let price = d.controller.brax_price(d.now()).unwrap();
    assert!(price < PRICE_PRECISION - BAND, "price {}", price);

    let adjustment = d.controller.refresh_collateral_ratio(d.now()).unwrap();
    assert_eq!(
        adjustment,
        Adjustment::Increased {
            from: 99_750_000,
            to: MAX_COLLATERAL_RATIO,
        }
    );
}

#[test]
fn test_cooldown_between_refreshes() {
    let mut d = warmed_up();
    push_price_up(&mut d);
    let now = d.now();
    d.controller.refresh_collateral_ratio(now).unwrap();

    assert_eq!(
        d.controller.refresh_collateral_ratio(now + 100),
        Err(Error::RefreshCooldown { remaining: 3_500 })
    );
    assert_eq!(d.controller.global_collateral_ratio(), 99_750_000);

    // Next window keeps the price high
    next_window(&mut d);
    assert_eq!(
        d.controller.refresh_collateral_ratio(d.now()),
        Ok(Adjustment::Decreased { from: 99_750_000, to: 99_500_000 })
    );
}

#[test]
fn test_ratio_clamped_at_max() {
    let mut d = warmed_up();
    push_price_down(&mut d, ONE_TOKEN);

    let adjustment = d.controller.refresh_collateral_ratio(d.now()).unwrap();
    assert_eq!(
        adjustment,
        Adjustment::Increased {
            from: MAX_COLLATERAL_RATIO,
            to: MAX_COLLATERAL_RATIO,
        }
    );
}

#[test]
fn test_ratio_clamped_at_zero() {
    let mut d = warmed_up();
    let creator = d.creator;
    d.controller.set_brax_step(&creator, 60_000_000).unwrap();
    push_price_up(&mut d);

    assert_eq!(
        d.controller.refresh_collateral_ratio(d.now()),
        Ok(Adjustment::Decreased { from: MAX_COLLATERAL_RATIO, to: 40_000_000 })
    );
    next_window(&mut d);
    assert_eq!(
        d.controller.refresh_collateral_ratio(d.now()),
        Ok(Adjustment::Decreased { from: 40_000_000, to: 0 })
    );
}

#[test]
fn test_paused_refresh_rejected() {
    let mut d = warmed_up();
    let (creator, timelock) = (d.creator, d.timelock);
    push_price_up(&mut d);

    assert!(d.controller.toggle_collateral_ratio(&creator).unwrap());
    assert_eq!(
        d.controller.refresh_collateral_ratio(d.now()),
        Err(Error::CollateralRatioPaused)
    );
    assert_eq!(d.controller.global_collateral_ratio(), MAX_COLLATERAL_RATIO);

    // Timelock is a pauser too
    assert!(!d.controller.toggle_collateral_ratio(&timelock).unwrap());
    assert!(d.controller.refresh_collateral_ratio(d.now()).is_ok());
}

// ═══════════════════════════════════════════════════════════════════════════════
// POOL AND VALUATION TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_collateral_value_across_mint_and_redeem() {
    let mut d = warmed_up();
    let (creator, pool, wbtc) = (d.creator, d.pool, d.wbtc);
    let brax = d.controller.brax_address();
    assert_eq!(d.controller.global_collateral_value(), Ok(10 * ONE_TOKEN));

    d.controller
        .approve(&wbtc, &creator, &pool, 10 * ONE_WBTC)
        .unwrap();
    let quote = d
        .controller
        .mint_brax(&creator, &pool, mint_request(10 * ONE_TOKEN), d.now())
        .unwrap();
    assert_eq!(quote.collat_needed, 10 * ONE_WBTC);
    assert_eq!(quote.bxs_needed, 0);
    assert_eq!(quote.brax_out, 9_999_700_000_000_000_000);
    assert_eq!(d.controller.global_collateral_value(), Ok(20 * ONE_TOKEN));

    d.controller.approve(&brax, &creator, &pool, ONE_TOKEN).unwrap();
    let supply_before = d.controller.total_supply(&brax).unwrap();
    let quote = d
        .controller
        .redeem_brax(&creator, &pool, redeem_request(ONE_TOKEN), d.now())
        .unwrap();
    // 1 BRAX less the 0.005% redemption fee
    assert_eq!(quote.collat_out, 99_995_000);
    assert_eq!(quote.bxs_out, 0);
    assert_eq!(d.controller.total_supply(&brax).unwrap(), supply_before - ONE_TOKEN);

    // Owed collateral no longer counts
    assert_eq!(
        d.controller.global_collateral_value(),
        Ok(19_000_050_000_000_000_000)
    );
}

#[test]
fn test_redemption_collected_after_delay() {
    let mut d = warmed_up();
    let (creator, pool, wbtc) = (d.creator, d.pool, d.wbtc);
    let brax = d.controller.brax_address();

    d.controller.approve(&brax, &creator, &pool, ONE_TOKEN).unwrap();
    let now = d.now();
    d.controller
        .redeem_brax(&creator, &pool, redeem_request(ONE_TOKEN), now)
        .unwrap();
    assert_eq!(
        d.controller.pool(&pool).unwrap().redeem_collateral_balance(&creator, 0),
        99_995_000
    );

    assert_eq!(
        d.controller.collect_redemption(&creator, &pool, 0, now + 10),
        Err(Error::RedemptionDelay { remaining: 14 })
    );

    let wbtc_before = d.controller.balance_of(&wbtc, &creator).unwrap();
    let collected = d
        .controller
        .collect_redemption(&creator, &pool, 0, now + 24)
        .unwrap();
    assert_eq!(collected, (99_995_000, 0));
    assert_eq!(
        d.controller.balance_of(&wbtc, &creator).unwrap(),
        wbtc_before + 99_995_000
    );
    assert_eq!(d.controller.pool(&pool).unwrap().collaterals()[0].unclaimed, 0);
    assert_eq!(
        d.controller.global_collateral_value(),
        Ok(10 * ONE_TOKEN - 999_950_000_000_000_000)
    );

    // Nothing left to collect
    assert_eq!(
        d.controller.collect_redemption(&creator, &pool, 0, now + 48),
        Ok((0, 0))
    );
}

#[test]
fn test_fractional_mint_burns_bxs() {
    let mut d = warmed_up();
    let (creator, pool, wbtc, bxs) = (d.creator, d.pool, d.wbtc, d.bxs);
    push_price_up(&mut d);
    d.controller.refresh_collateral_ratio(d.now()).unwrap();
    assert_eq!(d.controller.global_collateral_ratio(), 99_750_000);

    d.controller.approve(&wbtc, &creator, &pool, ONE_WBTC).unwrap();
    d.controller.approve(&bxs, &creator, &pool, 100 * ONE_TOKEN).unwrap();
    let bxs_supply = d.controller.total_supply(&bxs).unwrap();

    let quote = d
        .controller
        .mint_brax(&creator, &pool, mint_request(ONE_TOKEN), d.now())
        .unwrap();
    // 99.75% from wBTC at 1:1, 0.25% from BXS at 0.1 BTC
    assert_eq!(quote.collat_needed, 99_750_000);
    assert_eq!(quote.bxs_needed, 25_000_000_000_000_000);
    assert_eq!(
        d.controller.total_supply(&bxs).unwrap(),
        bxs_supply - quote.bxs_needed
    );
}

#[test]
fn test_failed_mint_moves_nothing() {
    let mut d = warmed_up();
    let (creator, pool, wbtc) = (d.creator, d.pool, d.wbtc);
    let brax = d.controller.brax_address();
    let supply = d.controller.total_supply(&brax).unwrap();
    let wbtc_before = d.controller.balance_of(&wbtc, &creator).unwrap();

    // No allowance
    assert!(matches!(
        d.controller
            .mint_brax(&creator, &pool, mint_request(ONE_TOKEN), d.now()),
        Err(Error::InsufficientAllowance { .. })
    ));
    // Slippage
    d.controller.approve(&wbtc, &creator, &pool, ONE_WBTC).unwrap();
    let request = MintRequest {
        brax_out_min: ONE_TOKEN,
        ..mint_request(ONE_TOKEN)
    };
    assert_eq!(
        d.controller.mint_brax(&creator, &pool, request, d.now()),
        Err(Error::Slippage("BRAX".into()))
    );

    assert_eq!(d.controller.total_supply(&brax).unwrap(), supply);
    assert_eq!(d.controller.balance_of(&wbtc, &creator).unwrap(), wbtc_before);
}

#[test]
fn test_mint_and_redeem_price_thresholds() {
    let mut d = warmed_up();
    let (creator, pool, wbtc) = (d.creator, d.pool, d.wbtc);
    let brax = d.controller.brax_address();
    d.controller
        .pool_mut(&pool)
        .unwrap()
        .set_price_thresholds(&creator, 101_000_000, 99_000_000)
        .unwrap();
    d.controller.approve(&wbtc, &creator, &pool, ONE_WBTC).unwrap();
    d.controller.approve(&brax, &creator, &pool, ONE_TOKEN).unwrap();

    assert!(matches!(
        d.controller
            .mint_brax(&creator, &pool, mint_request(ONE_TOKEN), d.now()),
        Err(Error::MintPriceTooLow { .. })
    ));
    assert!(matches!(
        d.controller
            .redeem_brax(&creator, &pool, redeem_request(ONE_TOKEN), d.now()),
        Err(Error::RedeemPriceTooHigh { .. })
    ));
}

#[test]
fn test_registry_holes() {
    let mut d = warmed_up();
    let (creator, timelock, pool, wbtc) = (d.creator, d.timelock, d.pool, d.wbtc);

    let second = Address::from_label("pool:second");
    d.controller
        .deploy_pool(
            &creator,
            CollateralPool::new(second, creator, creator, timelock, &[(wbtc, 8)], &PoolConfig::default())
                .unwrap(),
        )
        .unwrap();
    d.controller.add_pool(&creator, second).unwrap();
    assert_eq!(
        d.controller.add_pool(&creator, second),
        Err(Error::PoolAlreadyExists(second.to_hex()))
    );

    d.controller.remove_pool(&creator, pool).unwrap();
    assert_eq!(d.controller.pools_array(0), Ok(Address::ZERO));
    assert_eq!(d.controller.pools_array(1), Ok(second));
    assert!(matches!(
        d.controller.pools_array(2),
        Err(Error::IndexOutOfRange { index: 2, len: 2 })
    ));
    assert!(!d.controller.is_pool(&pool));

    // Removed pool's collateral no longer counts, and it can no longer mint
    assert_eq!(d.controller.global_collateral_value(), Ok(0));
    d.controller.approve(&wbtc, &creator, &pool, ONE_WBTC).unwrap();
    assert_eq!(
        d.controller
            .mint_brax(&creator, &pool, mint_request(ONE_TOKEN), d.now()),
        Err(Error::NotPool)
    );
    assert_eq!(
        d.controller.remove_pool(&creator, pool),
        Err(Error::PoolNonexistent(pool.to_hex()))
    );
}

#[test]
fn test_pool_hooks_only_for_registered_pools() {
    let mut d = warmed_up();
    let (creator, pool) = (d.creator, d.pool);
    let brax = d.controller.brax_address();

    assert_eq!(
        d.controller.pool_mint(&creator, &creator, ONE_TOKEN),
        Err(Error::NotPool)
    );

    let supply = d.controller.total_supply(&brax).unwrap();
    d.controller.pool_mint(&pool, &creator, ONE_TOKEN).unwrap();
    assert_eq!(d.controller.total_supply(&brax).unwrap(), supply + ONE_TOKEN);

    d.controller.approve(&brax, &creator, &pool, ONE_TOKEN).unwrap();
    d.controller.pool_burn_from(&pool, &creator, ONE_TOKEN).unwrap();
    assert_eq!(d.controller.total_supply(&brax).unwrap(), supply);
}

// ═══════════════════════════════════════════════════════════════════════════════
// GOVERNANCE TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_setters_require_governance() {
    let mut d = warmed_up();
    let (creator, timelock) = (d.creator, d.timelock);
    let stranger = Address::from_label("stranger");

    assert_eq!(d.controller.set_brax_step(&stranger, 1), Err(Error::NotGovernance));
    assert_eq!(d.controller.set_price_band(&stranger, 1), Err(Error::NotGovernance));
    assert_eq!(
        d.controller.set_brax_oracle(&stranger, d.bxs_oracle, d.wbtc),
        Err(Error::NotGovernance)
    );
    assert_eq!(
        d.controller.toggle_collateral_ratio(&stranger),
        Err(Error::NotPauser)
    );

    d.controller.set_refresh_cooldown(&timelock, 60).unwrap();
    d.controller.set_price_target(&creator, 100_000_000).unwrap();
    assert_eq!(d.controller.rebalancer().refresh_cooldown(), 60);

    d.controller
        .grant_role(&creator, Role::CollateralRatioPauser, stranger)
        .unwrap();
    assert!(d.controller.toggle_collateral_ratio(&stranger).unwrap());
}

#[test]
fn test_admin_role_cannot_govern() {
    let mut d = warmed_up();
    let (creator, pool) = (d.creator, d.pool);
    let admin = Address::from_label("admin");
    d.controller
        .grant_role(&creator, Role::DefaultAdmin, admin)
        .unwrap();

    assert_eq!(d.controller.set_price_band(&admin, 7), Err(Error::NotGovernance));
    assert_eq!(d.controller.remove_pool(&admin, pool), Err(Error::NotGovernance));
    assert!(d.controller.is_pool(&pool));
    assert_eq!(d.controller.rebalancer().price_band() as u128, BAND);

    // Role administration still works
    d.controller
        .grant_role(&admin, Role::CollateralRatioPauser, admin)
        .unwrap();
    assert!(d.controller.has_role(Role::CollateralRatioPauser, &admin));
}

#[test]
fn test_price_band_stays_below_target() {
    let mut d = warmed_up();
    let creator = d.creator;
    let target = PRICE_PRECISION as u64;

    assert!(matches!(
        d.controller.set_price_band(&creator, 2 * target),
        Err(Error::InvalidParameter { .. })
    ));
    assert!(matches!(
        d.controller.set_price_band(&creator, target),
        Err(Error::InvalidParameter { .. })
    ));
    assert!(matches!(
        d.controller.set_price_target(&creator, BAND as u64),
        Err(Error::InvalidParameter { .. })
    ));
    assert_eq!(d.controller.rebalancer().price_band() as u128, BAND);
    assert_eq!(d.controller.rebalancer().price_target(), target);

    d.controller.set_price_band(&creator, target - 1).unwrap();
    d.controller.set_price_target(&creator, 2 * target).unwrap();
    assert_eq!(d.controller.rebalancer().price_target(), 2 * target);
}

#[test]
fn test_parameter_bounds_enforced() {
    let mut d = warmed_up();
    let creator = d.creator;
    assert!(matches!(
        d.controller.set_brax_step(&creator, MAX_COLLATERAL_RATIO + 1),
        Err(Error::InvalidParameter { .. })
    ));
    assert!(matches!(
        d.controller.set_price_target(&creator, 0),
        Err(Error::InvalidParameter { .. })
    ));
    assert_eq!(d.controller.rebalancer().brax_step(), STEP);
}

#[test]
fn test_governance_moves_are_logged() {
    let mut d = warmed_up();
    let creator = d.creator;
    d.controller.set_minting_fee(&creator, 4_000).unwrap();
    push_price_up(&mut d);
    d.controller.refresh_collateral_ratio(d.now()).unwrap();

    let events = d.controller.events();
    assert_eq!(events.filter_by_type("ParameterChanged").len(), 1);
    assert_eq!(events.filter_by_type("OracleDeployed").len(), 2);
    assert_eq!(events.filter_by_type("OracleAssigned").len(), 2);
    let last = events.last().unwrap();
    assert_eq!(last.timestamp, d.now());
    assert!(matches!(
        last.event,
        ProtocolEvent::CollateralRatioRefreshed {
            adjustment: Adjustment::Decreased { .. },
            ..
        }
    ));
}

// ═══════════════════════════════════════════════════════════════════════════════
// SNAPSHOT TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_snapshot_restores_engine() {
    let mut d = warmed_up();
    push_price_up(&mut d);
    d.controller.refresh_collateral_ratio(d.now()).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("brax.json");
    Snapshot::capture(&d).save(&path).unwrap();

    let mut restored = Snapshot::load(&path).unwrap().deployment;
    assert_eq!(restored, d);
    assert_eq!(restored.controller.global_collateral_ratio(), 99_750_000);

    // Restored engine keeps running from where it stopped
    next_window(&mut restored);
    next_window(&mut d);
    assert_eq!(
        restored.controller.refresh_collateral_ratio(restored.now()),
        d.controller.refresh_collateral_ratio(d.now())
    );
}
