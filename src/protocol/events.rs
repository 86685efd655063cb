//! Protocol events for state change notifications.
//!
//! The controller appends one event per successful mutation. The log is
//! bounded; the oldest events are dropped first.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::governance::parameters::ControllerParameter;
use crate::oracle::router::PricedAsset;
use crate::protocol::rebalancer::Adjustment;
use crate::utils::address::{sha256_hex, Address};
use crate::utils::constants::MAX_EVENT_LOG;

// ═══════════════════════════════════════════════════════════════════════════════
// EVENT TYPES
// ═══════════════════════════════════════════════════════════════════════════════

/// All protocol event types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtocolEvent {
    // Rebalancer
    /// Collateral ratio refreshed
    CollateralRatioRefreshed {
        /// BRAX price used
        brax_price: u128,
        /// Outcome
        adjustment: Adjustment,
    },
    /// Collateral ratio pause flipped
    CollateralRatioToggled {
        /// New pause state
        paused: bool,
    },

    // Registry
    /// Pool registered
    PoolAdded {
        /// Pool address
        pool: Address,
    },
    /// Pool deregistered
    PoolRemoved {
        /// Pool address
        pool: Address,
    },

    // Governance
    /// Numeric parameter changed
    ParameterChanged {
        /// Parameter
        parameter: ControllerParameter,
        /// Previous value
        old_value: u64,
        /// New value
        new_value: u64,
    },
    /// Address setting changed
    AddressChanged {
        /// Setting name
        setting: String,
        /// New address
        address: Address,
    },

    // Oracles
    /// TWAP oracle deployed
    OracleDeployed {
        /// Oracle address
        oracle: Address,
        /// Pair it samples
        pair: Address,
    },
    /// Oracle assigned to an asset
    OracleAssigned {
        /// Asset
        asset: PricedAsset,
        /// Oracle address
        oracle: Address,
        /// Collateral token
        collateral_token: Address,
    },
    /// TWAP window closed
    OracleUpdated {
        /// Oracle address
        oracle: Address,
    },

    // Pools
    /// BRAX minted through a pool
    BraxMinted {
        /// Pool
        pool: Address,
        /// Minter
        minter: Address,
        /// BRAX received
        brax_out: u128,
        /// Collateral deposited
        collateral_in: u128,
        /// BXS burned
        bxs_in: u128,
    },
    /// BRAX redeemed through a pool
    BraxRedeemed {
        /// Pool
        pool: Address,
        /// Redeemer
        redeemer: Address,
        /// BRAX burned
        brax_in: u128,
        /// Collateral owed
        collateral_out: u128,
        /// BXS owed
        bxs_out: u128,
    },
    /// Redemption collected
    RedemptionCollected {
        /// Pool
        pool: Address,
        /// Redeemer
        redeemer: Address,
        /// Collateral paid
        collateral: u128,
        /// BXS paid
        bxs: u128,
    },
}

impl ProtocolEvent {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::CollateralRatioRefreshed { .. } => "CollateralRatioRefreshed",
            Self::CollateralRatioToggled { .. } => "CollateralRatioToggled",
            Self::PoolAdded { .. } => "PoolAdded",
            Self::PoolRemoved { .. } => "PoolRemoved",
            Self::ParameterChanged { .. } => "ParameterChanged",
            Self::AddressChanged { .. } => "AddressChanged",
            Self::OracleDeployed { .. } => "OracleDeployed",
            Self::OracleAssigned { .. } => "OracleAssigned",
            Self::OracleUpdated { .. } => "OracleUpdated",
            Self::BraxMinted { .. } => "BraxMinted",
            Self::BraxRedeemed { .. } => "BraxRedeemed",
            Self::RedemptionCollected { .. } => "RedemptionCollected",
        }
    }
}

/// An event with the time it was recorded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedEvent {
    /// Unix timestamp
    pub timestamp: u64,
    /// Event
    pub event: ProtocolEvent,
}

// ═══════════════════════════════════════════════════════════════════════════════
// EVENT LOG
// ═══════════════════════════════════════════════════════════════════════════════

/// Bounded in-memory event log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    events: VecDeque<RecordedEvent>,
    capacity: usize,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::with_capacity(MAX_EVENT_LOG)
    }
}

impl EventLog {
    /// Create a log with the default capacity
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a log holding at most `capacity` events
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Append an event, evicting the oldest when full
    pub fn push(&mut self, timestamp: u64, event: ProtocolEvent) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(RecordedEvent { timestamp, event });
    }

    /// Iterate events oldest first
    pub fn iter(&self) -> impl Iterator<Item = &RecordedEvent> {
        self.events.iter()
    }

    /// Most recent event
    pub fn last(&self) -> Option<&RecordedEvent> {
        self.events.back()
    }

    /// Events of one type
    pub fn filter_by_type(&self, event_type: &str) -> Vec<&RecordedEvent> {
        self.events
            .iter()
            .filter(|e| e.event.event_type() == event_type)
            .collect()
    }

    /// Number of retained events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True if no events are retained
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Drop all events
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// SHA-256 over the serialized log
    pub fn digest(&self) -> String {
        let bytes = serde_json::to_vec(&self.events).unwrap_or_default();
        sha256_hex(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_filter() {
        let mut log = EventLog::new();
        log.push(1, ProtocolEvent::PoolAdded { pool: Address::from_label("p") });
        log.push(2, ProtocolEvent::CollateralRatioToggled { paused: true });
        assert_eq!(log.len(), 2);
        assert_eq!(log.filter_by_type("PoolAdded").len(), 1);
        assert_eq!(log.last().unwrap().timestamp, 2);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut log = EventLog::with_capacity(2);
        for t in 0..3 {
            log.push(t, ProtocolEvent::OracleUpdated { oracle: Address::from_label("o") });
        }
        assert_eq!(log.len(), 2);
        assert_eq!(log.iter().next().unwrap().timestamp, 1);
    }

    #[test]
    fn test_digest_changes() {
        let mut log = EventLog::new();
        let empty = log.digest();
        log.push(1, ProtocolEvent::PoolRemoved { pool: Address::from_label("p") });
        assert_ne!(empty, log.digest());
        assert_eq!(log.digest().len(), 64);
    }
}
