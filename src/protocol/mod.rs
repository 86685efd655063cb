//! Protocol orchestration.
//!
//! - `controller`: the single owner of engine state and its entry points
//! - `rebalancer`: the global collateral ratio state machine
//! - `keeper`: periodic oracle updates and refreshes
//! - `events`: typed log of state changes

pub mod controller;
pub mod events;
pub mod keeper;
pub mod rebalancer;

pub use controller::*;
pub use events::*;
pub use keeper::*;
pub use rebalancer::*;
