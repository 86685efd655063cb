//! Dual-oracle pricing.
//!
//! - `twap`: fixed-window TWAP oracle over AMM accumulators
//! - `price_feed`: external wBTC:BTC feed with a staleness window
//! - `router`: combines both into BRAX and BXS prices

pub mod price_feed;
pub mod router;
pub mod twap;

pub use price_feed::{ExternalPriceFeed, FeedPrice, PriceFeed, RoundData};
pub use router::{OracleAssignment, PriceRouter, PricedAsset};
pub use twap::{CumulativePriceSource, TwapOracle};
