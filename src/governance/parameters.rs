//! Controller parameters that can be changed by governance.
//!
//! Each numeric setter on the controller maps to one [`ControllerParameter`]
//! which carries its display name and accepted bounds.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};
use crate::utils::constants::MAX_COLLATERAL_RATIO;

// ═══════════════════════════════════════════════════════════════════════════════
// CONTROLLER PARAMETERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Numeric parameters settable by owner, controller or timelock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControllerParameter {
    /// Advertised minting fee (1e8 scale)
    MintingFee,
    /// Advertised redemption fee (1e8 scale)
    RedemptionFee,
    /// GCR change per refresh (1e8 scale)
    BraxStep,
    /// Peg target (1e8 scale)
    PriceTarget,
    /// Dead band around the target (1e8 scale)
    PriceBand,
    /// Seconds between refreshes
    RefreshCooldown,
}

impl ControllerParameter {
    /// All parameters, in display order
    pub const ALL: [ControllerParameter; 6] = [
        Self::MintingFee,
        Self::RedemptionFee,
        Self::BraxStep,
        Self::PriceTarget,
        Self::PriceBand,
        Self::RefreshCooldown,
    ];

    /// Get human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::MintingFee => "Minting Fee",
            Self::RedemptionFee => "Redemption Fee",
            Self::BraxStep => "BRAX Step",
            Self::PriceTarget => "Price Target",
            Self::PriceBand => "Price Band",
            Self::RefreshCooldown => "Refresh Cooldown",
        }
    }

    /// Get validation bounds (min, max)
    pub fn bounds(&self) -> (u64, u64) {
        match self {
            Self::MintingFee | Self::RedemptionFee => (0, MAX_COLLATERAL_RATIO),
            Self::BraxStep => (0, MAX_COLLATERAL_RATIO),
            Self::PriceTarget => (1, u64::MAX),
            Self::PriceBand => (0, u64::MAX),
            Self::RefreshCooldown => (0, u64::MAX),
        }
    }

    /// Validate a value for this parameter
    pub fn validate(&self, value: u64) -> Result<()> {
        let (min, max) = self.bounds();
        if value < min || value > max {
            return Err(Error::InvalidParameter {
                name: self.name().into(),
                reason: format!("value {} outside bounds [{}, {}]", value, min, max),
            });
        }
        Ok(())
    }

    /// Parameters that move the GCR directly
    pub fn affects_rebalancing(&self) -> bool {
        matches!(
            self,
            Self::BraxStep | Self::PriceTarget | Self::PriceBand | Self::RefreshCooldown
        )
    }
}

impl fmt::Display for ControllerParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds() {
        assert!(ControllerParameter::BraxStep.validate(MAX_COLLATERAL_RATIO).is_ok());
        assert!(ControllerParameter::BraxStep
            .validate(MAX_COLLATERAL_RATIO + 1)
            .is_err());
        assert!(ControllerParameter::PriceTarget.validate(0).is_err());
        assert!(ControllerParameter::PriceTarget.validate(5000).is_ok());
        assert!(ControllerParameter::RefreshCooldown.validate(0).is_ok());
    }

    #[test]
    fn test_names_unique() {
        let mut names: Vec<_> = ControllerParameter::ALL.iter().map(|p| p.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), ControllerParameter::ALL.len());
    }

    #[test]
    fn test_affects_rebalancing() {
        assert!(ControllerParameter::PriceBand.affects_rebalancing());
        assert!(!ControllerParameter::MintingFee.affects_rebalancing());
    }
}
