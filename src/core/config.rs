//! Engine configuration.
//!
//! Every tunable of the engine lives in [`EngineConfig`]. Defaults mirror the
//! deployed parameters; files are JSON and may omit any section.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::utils::constants::*;

// ═══════════════════════════════════════════════════════════════════════════════
// SECTIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Collateral-ratio rebalancer parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RebalancerConfig {
    /// GCR at deployment
    pub initial_collateral_ratio: u64,
    /// Step applied per refresh
    pub brax_step: u64,
    /// Peg target
    pub price_target: u64,
    /// Dead band around the target
    pub price_band: u64,
    /// Minimum seconds between refreshes
    pub refresh_cooldown_secs: u64,
    /// Whether an in-band refresh still starts a new cooldown
    pub in_band_resets_cooldown: bool,
}

impl Default for RebalancerConfig {
    fn default() -> Self {
        Self {
            initial_collateral_ratio: DEFAULT_GLOBAL_COLLATERAL_RATIO,
            brax_step: DEFAULT_BRAX_STEP,
            price_target: DEFAULT_PRICE_TARGET,
            price_band: DEFAULT_PRICE_BAND,
            refresh_cooldown_secs: DEFAULT_REFRESH_COOLDOWN_SECS,
            in_band_resets_cooldown: true,
        }
    }
}

/// TWAP oracle parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Window length
    pub period_secs: u64,
    /// Grace seconds past the window
    pub consult_leniency_secs: u64,
    /// Serve consults regardless of age
    pub allow_stale_consults: bool,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            period_secs: DEFAULT_TWAP_PERIOD_SECS,
            consult_leniency_secs: DEFAULT_CONSULT_LENIENCY_SECS,
            allow_stale_consults: false,
        }
    }
}

/// External feed parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Decimals of the raw answer
    pub decimals: u8,
    /// Maximum accepted round age
    pub max_staleness_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            decimals: DEFAULT_FEED_DECIMALS,
            max_staleness_secs: DEFAULT_FEED_MAX_STALENESS_SECS,
        }
    }
}

/// Defaults for newly deployed pools, and the controller's advertised fees
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Minting fee (1e8 scale)
    pub minting_fee: u64,
    /// Redemption fee (1e8 scale)
    pub redemption_fee: u64,
    /// Per-collateral ceiling, collateral units
    pub pool_ceiling: u128,
    /// Minimum BRAX price for minting
    pub mint_price_threshold: u128,
    /// Maximum BRAX price for redeeming
    pub redeem_price_threshold: u128,
    /// Seconds between redemption and collection
    pub redemption_delay_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            minting_fee: DEFAULT_MINTING_FEE,
            redemption_fee: DEFAULT_REDEMPTION_FEE,
            pool_ceiling: DEFAULT_POOL_CEILING,
            mint_price_threshold: DEFAULT_MINT_PRICE_THRESHOLD,
            redeem_price_threshold: DEFAULT_REDEEM_PRICE_THRESHOLD,
            redemption_delay_secs: DEFAULT_REDEMPTION_DELAY_SECS,
        }
    }
}

/// Supplies minted to the creator at deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenesisConfig {
    /// BRAX genesis supply
    pub brax_supply: u128,
    /// BXS genesis supply
    pub bxs_supply: u128,
}

impl Default for GenesisConfig {
    fn default() -> Self {
        Self {
            brax_supply: BRAX_GENESIS_SUPPLY,
            bxs_supply: BXS_GENESIS_SUPPLY,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENGINE CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Complete engine configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Rebalancer section
    pub rebalancer: RebalancerConfig,
    /// TWAP section
    pub oracle: OracleConfig,
    /// Feed section
    pub feed: FeedConfig,
    /// Pool section
    pub pool: PoolConfig,
    /// Genesis section
    pub genesis: GenesisConfig,
}

impl EngineConfig {
    /// Load from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        let config: Self =
            serde_json::from_str(&content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Defaults overridden by `BRAX_*` environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Apply `BRAX_*` environment overrides in place
    pub fn apply_env(&mut self) {
        if let Some(v) = env_u64("BRAX_REFRESH_COOLDOWN") {
            self.rebalancer.refresh_cooldown_secs = v;
        }
        if let Some(v) = env_u64("BRAX_PRICE_BAND") {
            self.rebalancer.price_band = v;
        }
        if let Some(v) = env_u64("BRAX_STEP") {
            self.rebalancer.brax_step = v;
        }
        if let Some(v) = env_u64("BRAX_FEED_MAX_STALENESS") {
            self.feed.max_staleness_secs = v;
        }
        if let Some(v) = env_u64("BRAX_TWAP_PERIOD") {
            self.oracle.period_secs = v;
        }
    }

    /// Get default config file path
    pub fn default_path() -> PathBuf {
        std::env::var("BRAX_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(".brax"))
            .join("config.json")
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let r = &self.rebalancer;
        if r.initial_collateral_ratio > MAX_COLLATERAL_RATIO {
            return Err(Error::Config(format!(
                "initial collateral ratio {} exceeds {}",
                r.initial_collateral_ratio, MAX_COLLATERAL_RATIO
            )));
        }
        if r.brax_step > MAX_COLLATERAL_RATIO {
            return Err(Error::Config("brax_step exceeds 100%".into()));
        }
        if r.price_target == 0 {
            return Err(Error::Config("price_target must be positive".into()));
        }
        if r.price_band >= r.price_target {
            return Err(Error::Config("price_band must be below price_target".into()));
        }
        if self.oracle.period_secs == 0 {
            return Err(Error::Config("TWAP period must be greater than 0".into()));
        }
        if self.feed.max_staleness_secs == 0 {
            return Err(Error::Config("feed staleness must be greater than 0".into()));
        }
        if self.pool.minting_fee as u128 > PRICE_PRECISION
            || self.pool.redemption_fee as u128 > PRICE_PRECISION
        {
            return Err(Error::Config("fees must not exceed 100%".into()));
        }
        Ok(())
    }
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
