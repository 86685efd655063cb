//! Global collateral ratio rebalancer.
//!
//! Once per cooldown the GCR moves one step against the BRAX price:
//! above `target + band` it steps down (less collateral needed to mint),
//! below `target - band` it steps up. The ratio is clamped to `[0, 1e8]`.

use serde::{Deserialize, Serialize};

use crate::core::config::RebalancerConfig;
use crate::error::{Error, Result};
use crate::utils::constants::MAX_COLLATERAL_RATIO;

/// Outcome of a refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Adjustment {
    /// Price above the band, ratio lowered
    Decreased {
        /// Ratio before
        from: u64,
        /// Ratio after
        to: u64,
    },
    /// Price below the band, ratio raised
    Increased {
        /// Ratio before
        from: u64,
        /// Ratio after
        to: u64,
    },
    /// Price inside the band
    Unchanged {
        /// Current ratio
        ratio: u64,
    },
}

impl Adjustment {
    /// Ratio after the refresh
    pub fn ratio(&self) -> u64 {
        match *self {
            Adjustment::Decreased { to, .. } | Adjustment::Increased { to, .. } => to,
            Adjustment::Unchanged { ratio } => ratio,
        }
    }
}

/// Rebalancer state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rebalancer {
    global_collateral_ratio: u64,
    brax_step: u64,
    price_target: u64,
    price_band: u64,
    refresh_cooldown: u64,
    in_band_resets_cooldown: bool,
    last_call_time: Option<u64>,
    paused: bool,
}

impl Rebalancer {
    /// Create from configuration
    pub fn new(config: &RebalancerConfig) -> Self {
        Self {
            global_collateral_ratio: config.initial_collateral_ratio.min(MAX_COLLATERAL_RATIO),
            brax_step: config.brax_step,
            price_target: config.price_target,
            price_band: config.price_band,
            refresh_cooldown: config.refresh_cooldown_secs,
            in_band_resets_cooldown: config.in_band_resets_cooldown,
            last_call_time: None,
            paused: false,
        }
    }

    /// Fail unless a refresh is allowed at `now`
    pub fn check_ready(&self, now: u64) -> Result<()> {
        if self.paused {
            return Err(Error::CollateralRatioPaused);
        }
        if let Some(last) = self.last_call_time {
            let ready_at = last.saturating_add(self.refresh_cooldown);
            if now < ready_at {
                return Err(Error::RefreshCooldown {
                    remaining: ready_at - now,
                });
            }
        }
        Ok(())
    }

    /// Move the ratio one step against `price`; gates are not checked here
    pub fn apply(&mut self, price: u128, now: u64) -> Adjustment {
        let target = self.price_target as u128;
        let band = self.price_band as u128;
        let from = self.global_collateral_ratio;

        if price > target + band {
            let to = from.saturating_sub(self.brax_step);
            self.global_collateral_ratio = to;
            self.last_call_time = Some(now);
            Adjustment::Decreased { from, to }
        } else if price < target.saturating_sub(band) {
            let to = from.saturating_add(self.brax_step).min(MAX_COLLATERAL_RATIO);
            self.global_collateral_ratio = to;
            self.last_call_time = Some(now);
            Adjustment::Increased { from, to }
        } else {
            if self.in_band_resets_cooldown {
                self.last_call_time = Some(now);
            }
            Adjustment::Unchanged { ratio: from }
        }
    }

    /// `check_ready` then `apply`
    pub fn refresh(&mut self, price: u128, now: u64) -> Result<Adjustment> {
        self.check_ready(now)?;
        Ok(self.apply(price, now))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // ACCESSORS
    // ═══════════════════════════════════════════════════════════════════════

    /// Current global collateral ratio
    pub fn global_collateral_ratio(&self) -> u64 {
        self.global_collateral_ratio
    }

    /// Step per refresh
    pub fn brax_step(&self) -> u64 {
        self.brax_step
    }

    /// Peg target
    pub fn price_target(&self) -> u64 {
        self.price_target
    }

    /// Dead band
    pub fn price_band(&self) -> u64 {
        self.price_band
    }

    /// Cooldown seconds
    pub fn refresh_cooldown(&self) -> u64 {
        self.refresh_cooldown
    }

    /// Time of the last counted refresh
    pub fn last_call_time(&self) -> Option<u64> {
        self.last_call_time
    }

    /// Whether refreshes are paused
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub(crate) fn set_brax_step(&mut self, step: u64) {
        self.brax_step = step;
    }

    pub(crate) fn set_price_target(&mut self, target: u64) {
        self.price_target = target;
    }

    pub(crate) fn set_price_band(&mut self, band: u64) {
        self.price_band = band;
    }

    pub(crate) fn set_refresh_cooldown(&mut self, cooldown: u64) {
        self.refresh_cooldown = cooldown;
    }

    /// Flip the pause flag, returning the new value
    pub(crate) fn toggle_paused(&mut self) -> bool {
        self.paused = !self.paused;
        self.paused
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: u64 = 1_700_000_000;

    fn make_rebalancer() -> Rebalancer {
        Rebalancer::new(&RebalancerConfig::default())
    }

    #[test]
    fn test_starts_fully_collateralized() {
        let r = make_rebalancer();
        assert_eq!(r.global_collateral_ratio(), MAX_COLLATERAL_RATIO);
        assert!(r.check_ready(0).is_ok());
    }

    #[test]
    fn test_step_down_above_band() {
        let mut r = make_rebalancer();
        let adj = r.refresh(100_500_001, T0).unwrap();
        assert_eq!(
            adj,
            Adjustment::Decreased {
                from: 100_000_000,
                to: 99_750_000
            }
        );
    }

    #[test]
    fn test_band_edges_are_inside() {
        let mut r = make_rebalancer();
        assert!(matches!(r.apply(100_500_000, T0), Adjustment::Unchanged { .. }));
        assert!(matches!(r.apply(99_500_000, T0), Adjustment::Unchanged { .. }));
    }

    #[test]
    fn test_step_up_clamped() {
        let mut r = make_rebalancer();
        let adj = r.refresh(90_000_000, T0).unwrap();
        assert_eq!(adj.ratio(), MAX_COLLATERAL_RATIO);
    }

    #[test]
    fn test_step_down_clamped_to_zero() {
        let mut r = make_rebalancer();
        r.set_brax_step(100_000_000);
        assert_eq!(r.apply(200_000_000, T0).ratio(), 0);
        assert_eq!(r.apply(200_000_000, T0).ratio(), 0);
    }

    #[test]
    fn test_cooldown() {
        let mut r = make_rebalancer();
        r.refresh(110_000_000, T0).unwrap();
        assert_eq!(
            r.refresh(110_000_000, T0 + 1000),
            Err(Error::RefreshCooldown { remaining: 2600 })
        );
        assert_eq!(r.global_collateral_ratio(), 99_750_000);
        assert!(r.refresh(110_000_000, T0 + 3600).is_ok());
    }

    #[test]
    fn test_in_band_cooldown_flag() {
        let mut r = make_rebalancer();
        r.refresh(100_000_000, T0).unwrap();
        assert_eq!(r.last_call_time(), Some(T0));

        let mut config = RebalancerConfig::default();
        config.in_band_resets_cooldown = false;
        let mut r = Rebalancer::new(&config);
        r.refresh(100_000_000, T0).unwrap();
        assert_eq!(r.last_call_time(), None);
        assert!(r.check_ready(T0 + 1).is_ok());
    }

    #[test]
    fn test_paused() {
        let mut r = make_rebalancer();
        assert!(r.toggle_paused());
        assert_eq!(r.refresh(110_000_000, T0), Err(Error::CollateralRatioPaused));
        assert_eq!(r.global_collateral_ratio(), MAX_COLLATERAL_RATIO);
        assert!(!r.toggle_paused());
        assert!(r.refresh(110_000_000, T0).is_ok());
    }
}
