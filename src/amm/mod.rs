//! Simulated constant-product AMM.
//!
//! The engine never prices off spot reserves; pairs here exist to feed
//! cumulative accumulators to the TWAP oracles and to let simulations move
//! the market.

pub mod market;
pub mod pair;

pub use market::Market;
pub use pair::ConstantProductPair;
