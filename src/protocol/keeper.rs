//! Keeper: periodic oracle updates and collateral-ratio refreshes.
//!
//! A tick updates every deployed oracle whose window has closed, then tries
//! one refresh. Gate failures (period, cooldown, pause, stale feed) are
//! expected in steady state and end up in the [`KeeperReport`] instead of
//! aborting the tick.
//!
//! With the `keeper` feature, [`KeeperService`] drives ticks in the
//! background over a shared [`Deployment`](crate::sim::Deployment).

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

#[cfg(feature = "keeper")]
use std::sync::Arc;
#[cfg(feature = "keeper")]
use tokio::sync::{broadcast, RwLock};
#[cfg(feature = "keeper")]
use tokio::time::{interval, Duration};

use crate::amm::Market;
use crate::error::Error;
use crate::protocol::controller::BraxController;
use crate::protocol::rebalancer::Adjustment;
use crate::utils::address::Address;
#[cfg(feature = "keeper")]
use crate::sim::Deployment;

// ═══════════════════════════════════════════════════════════════════════════════
// CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Keeper configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeeperConfig {
    /// Wall-clock seconds between ticks of the background service
    pub tick_interval_secs: u64,
    /// Simulated seconds to advance before each background tick; 0 leaves the clock alone
    pub advance_secs: u64,
    /// Attempt a collateral-ratio refresh on each tick
    pub refresh: bool,
}

impl Default for KeeperConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: 1,
            advance_secs: 0,
            refresh: true,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// REPORT
// ═══════════════════════════════════════════════════════════════════════════════

/// What happened to the refresh attempt of a tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Refresh ran
    Applied(Adjustment),
    /// Refresh was rejected
    Rejected(Error),
    /// Refresh disabled in the configuration
    Disabled,
}

/// Result of one keeper tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeeperReport {
    /// Simulated time of the tick
    pub timestamp: u64,
    /// Oracles whose window was closed
    pub oracles_updated: Vec<Address>,
    /// Oracles that were due but failed to update
    pub oracle_failures: Vec<(Address, Error)>,
    /// Refresh attempt
    pub refresh: RefreshOutcome,
}

impl KeeperReport {
    /// Adjustment applied this tick, if any
    pub fn adjustment(&self) -> Option<Adjustment> {
        match &self.refresh {
            RefreshOutcome::Applied(adjustment) => Some(*adjustment),
            _ => None,
        }
    }
}

/// Running totals
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeeperStats {
    /// Ticks run
    pub ticks: u64,
    /// Oracle updates applied
    pub oracle_updates: u64,
    /// Refreshes that changed the ratio
    pub adjustments: u64,
    /// Refreshes inside the band
    pub in_band: u64,
    /// Rejected refreshes and failed oracle updates
    pub failures: u64,
}

// ═══════════════════════════════════════════════════════════════════════════════
// KEEPER
// ═══════════════════════════════════════════════════════════════════════════════

/// Synchronous keeper
#[derive(Debug, Clone, Default)]
pub struct Keeper {
    config: KeeperConfig,
    stats: KeeperStats,
}

impl Keeper {
    /// Create a keeper
    pub fn new(config: KeeperConfig) -> Self {
        Self {
            config,
            stats: KeeperStats::default(),
        }
    }

    /// Configuration
    pub fn config(&self) -> &KeeperConfig {
        &self.config
    }

    /// Totals so far
    pub fn stats(&self) -> &KeeperStats {
        &self.stats
    }

    /// Update due oracles, then try one refresh
    pub fn tick(&mut self, controller: &mut BraxController, market: &Market, now: u64) -> KeeperReport {
        self.stats.ticks += 1;

        let due: Vec<(Address, Address)> = controller
            .oracles()
            .filter(|oracle| oracle.can_update(now))
            .map(|oracle| (oracle.address, oracle.pair))
            .collect();

        let mut oracles_updated = Vec::new();
        let mut oracle_failures = Vec::new();
        for (oracle, pair) in due {
            let result = market
                .pair(&pair)
                .and_then(|source| controller.update_oracle(&oracle, source, now));
            match result {
                Ok(()) => {
                    self.stats.oracle_updates += 1;
                    oracles_updated.push(oracle);
                }
                Err(e) => {
                    warn!(oracle = %oracle.short(), error = %e, "oracle update failed");
                    self.stats.failures += 1;
                    oracle_failures.push((oracle, e));
                }
            }
        }

        let refresh = if self.config.refresh {
            match controller.refresh_collateral_ratio(now) {
                Ok(adjustment) => {
                    match adjustment {
                        Adjustment::Unchanged { .. } => self.stats.in_band += 1,
                        _ => self.stats.adjustments += 1,
                    }
                    RefreshOutcome::Applied(adjustment)
                }
                Err(e) => {
                    if e.is_retryable() {
                        debug!(error = %e, "refresh skipped");
                    } else {
                        warn!(error = %e, "refresh rejected");
                    }
                    self.stats.failures += 1;
                    RefreshOutcome::Rejected(e)
                }
            }
        } else {
            RefreshOutcome::Disabled
        };

        KeeperReport {
            timestamp: now,
            oracles_updated,
            oracle_failures,
            refresh,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// BACKGROUND SERVICE
// ═══════════════════════════════════════════════════════════════════════════════

/// Background keeper over a shared deployment
#[cfg(feature = "keeper")]
pub struct KeeperService {
    keeper: Arc<RwLock<Keeper>>,
    deployment: Arc<RwLock<Deployment>>,
    tx: broadcast::Sender<KeeperReport>,
    shutdown: Arc<RwLock<bool>>,
}

#[cfg(feature = "keeper")]
impl KeeperService {
    /// Create a service; nothing runs until `start`
    pub fn new(config: KeeperConfig, deployment: Arc<RwLock<Deployment>>) -> Self {
        let (tx, _) = broadcast::channel(100);
        Self {
            keeper: Arc::new(RwLock::new(Keeper::new(config))),
            deployment,
            tx,
            shutdown: Arc::new(RwLock::new(false)),
        }
    }

    /// Subscribe to tick reports
    pub fn subscribe(&self) -> broadcast::Receiver<KeeperReport> {
        self.tx.subscribe()
    }

    /// Totals so far
    pub async fn stats(&self) -> KeeperStats {
        self.keeper.read().await.stats().clone()
    }

    /// Start ticking in the background
    pub fn start(&self) -> tokio::task::JoinHandle<()> {
        let keeper = Arc::clone(&self.keeper);
        let deployment = Arc::clone(&self.deployment);
        let tx = self.tx.clone();
        let shutdown = Arc::clone(&self.shutdown);

        tokio::spawn(async move {
            let (period, advance) = {
                let k = keeper.read().await;
                (k.config().tick_interval_secs.max(1), k.config().advance_secs)
            };
            let mut ticker = interval(Duration::from_secs(period));
            info!(period, advance, "keeper started");

            loop {
                ticker.tick().await;
                if *shutdown.read().await {
                    break;
                }

                let report = {
                    let mut guard = deployment.write().await;
                    let deployment = &mut *guard;
                    if advance > 0 {
                        if let Err(e) = deployment.advance(advance) {
                            warn!(error = %e, "advance failed");
                        }
                    }
                    let now = deployment.now();
                    keeper
                        .write()
                        .await
                        .tick(&mut deployment.controller, &deployment.market, now)
                };

                // No subscribers is fine
                let _ = tx.send(report);
            }

            info!("keeper stopped");
        })
    }

    /// Ask the background task to stop after its current tick
    pub async fn stop(&self) {
        *self.shutdown.write().await = true;
    }
}
