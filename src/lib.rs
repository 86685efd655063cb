//! # BRAX Engine
//!
//! Collateral-ratio rebalancing and dual-oracle pricing for BRAX, a
//! fractional-algorithmic stablecoin pegged to 1 BTC and backed by wBTC plus
//! its share token BXS.
//!
//! ## Architecture
//!
//! - **Oracle**: fixed-window TWAP oracles over AMM pairs, an external
//!   wBTC:BTC feed, and a router combining both into BRAX and BXS prices
//! - **Protocol**: the controller (token ledgers, governance, pool hooks),
//!   the global collateral ratio rebalancer, the keeper, and the event log
//! - **Core**: configuration, token ledgers, the pool registry and the
//!   collateral pool
//! - **AMM**: simulated constant-product pairs that feed the oracles
//! - **Sim / Storage**: a standard deployment, seeded simulations and
//!   snapshots of both
//!
//! ## Example
//!
//! ```rust,ignore
//! use brax::prelude::*;
//!
//! let mut deployment = Deployment::standard(EngineConfig::default(), 1_700_000_000)?;
//! deployment.deploy_oracles()?;
//!
//! let now = deployment.now();
//! let adjustment = deployment.controller.refresh_collateral_ratio(now)?;
//! let info = deployment.controller.brax_info(now)?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    trivial_casts,
    unused_lifetimes,
    unused_qualifications
)]

pub mod amm;
pub mod core;
pub mod error;
pub mod governance;
pub mod oracle;
pub mod protocol;
pub mod sim;
pub mod storage;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::amm::{ConstantProductPair, Market};
    pub use crate::core::{
        config::EngineConfig,
        pool::{CollateralPool, MintQuote, MintRequest, RedeemQuote, RedeemRequest},
        registry::PoolRegistry,
        token::Token,
    };
    pub use crate::error::{Error, Result};
    pub use crate::governance::{ControllerParameter, Role};
    pub use crate::oracle::{
        price_feed::{ExternalPriceFeed, PriceFeed},
        router::{PriceRouter, PricedAsset},
        twap::TwapOracle,
    };
    pub use crate::protocol::{
        controller::{BraxController, BraxInfo},
        events::ProtocolEvent,
        keeper::{Keeper, KeeperConfig},
        rebalancer::{Adjustment, Rebalancer},
    };
    pub use crate::sim::{Deployment, Simulation, SimulationParams};
    pub use crate::storage::Snapshot;
    pub use crate::utils::{
        address::Address,
        constants::{MAX_COLLATERAL_RATIO, ONE_TOKEN, ONE_WBTC, PRICE_PRECISION},
    };
}

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Protocol name
pub const PROTOCOL_NAME: &str = "BRAX";
