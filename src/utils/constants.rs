//! Protocol constants and magic numbers.
//!
//! All engine-wide constants are defined here for easy auditing and modification.

// ═══════════════════════════════════════════════════════════════════════════════
// PRECISION
// ═══════════════════════════════════════════════════════════════════════════════

/// Fixed-point scale for prices, ratios and fees (1e8 = 1.0)
pub const PRICE_PRECISION: u128 = 100_000_000;

/// Global collateral ratio ceiling (100%)
pub const MAX_COLLATERAL_RATIO: u64 = 100_000_000;

/// Decimals of BRAX and BXS
pub const ASSET_DECIMALS: u8 = 18;

/// Decimals of wBTC collateral
pub const WBTC_DECIMALS: u8 = 8;

/// One whole BRAX / BXS in base units
pub const ONE_TOKEN: u128 = 1_000_000_000_000_000_000;

/// One whole wBTC in satoshis
pub const ONE_WBTC: u128 = 100_000_000;

/// Fractional bits of a UQ112x112 value
pub const UQ112_RESOLUTION: u32 = 112;

// ═══════════════════════════════════════════════════════════════════════════════
// REBALANCER DEFAULTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Initial global collateral ratio (100%)
pub const DEFAULT_GLOBAL_COLLATERAL_RATIO: u64 = MAX_COLLATERAL_RATIO;

/// Step applied per refresh - 0.25%
pub const DEFAULT_BRAX_STEP: u64 = 250_000;

/// Peg target - 1 BTC
pub const DEFAULT_PRICE_TARGET: u64 = 100_000_000;

/// Dead band around the target - 0.5%
pub const DEFAULT_PRICE_BAND: u64 = 500_000;

/// Minimum seconds between refreshes
pub const DEFAULT_REFRESH_COOLDOWN_SECS: u64 = 3600;

// ═══════════════════════════════════════════════════════════════════════════════
// ORACLE DEFAULTS
// ═══════════════════════════════════════════════════════════════════════════════

/// TWAP window length in seconds
pub const DEFAULT_TWAP_PERIOD_SECS: u64 = 3600;

/// Extra seconds past the period during which a consult is still served
pub const DEFAULT_CONSULT_LENIENCY_SECS: u64 = 120;

/// Maximum age of an external feed round
pub const DEFAULT_FEED_MAX_STALENESS_SECS: u64 = 3600;

/// Decimals of the wBTC:BTC feed
pub const DEFAULT_FEED_DECIMALS: u8 = 8;

/// AMM swap fee in basis points
pub const AMM_FEE_BPS: u128 = 30;

/// Basis point divisor
pub const BPS_DIVISOR: u128 = 10_000;

// ═══════════════════════════════════════════════════════════════════════════════
// POOL DEFAULTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Per-collateral pool ceiling, in collateral units
pub const DEFAULT_POOL_CEILING: u128 = 2_100_000_000_000_000;

/// Minting fee on the 1e8 scale
pub const DEFAULT_MINTING_FEE: u64 = 3000;

/// Redemption fee on the 1e8 scale
pub const DEFAULT_REDEMPTION_FEE: u64 = 5000;

/// Mint allowed only when BRAX is at or above this price
pub const DEFAULT_MINT_PRICE_THRESHOLD: u128 = 0;

/// Redeem allowed only when BRAX is at or below this price
pub const DEFAULT_REDEEM_PRICE_THRESHOLD: u128 = 10_000_000_000;

/// Seconds between a redemption and its collection
pub const DEFAULT_REDEMPTION_DELAY_SECS: u64 = 24;

// ═══════════════════════════════════════════════════════════════════════════════
// GENESIS
// ═══════════════════════════════════════════════════════════════════════════════

/// BRAX minted to the creator at deployment - 2 BRAX
pub const BRAX_GENESIS_SUPPLY: u128 = 2 * ONE_TOKEN;

/// BXS minted to the creator at deployment - 100M BXS
pub const BXS_GENESIS_SUPPLY: u128 = 100_000_000 * ONE_TOKEN;

// ═══════════════════════════════════════════════════════════════════════════════
// ENGINE LIMITS
// ═══════════════════════════════════════════════════════════════════════════════

/// Maximum events retained by the in-memory event log
pub const MAX_EVENT_LOG: usize = 10_000;

/// Snapshot format version
pub const SNAPSHOT_VERSION: u32 = 1;
