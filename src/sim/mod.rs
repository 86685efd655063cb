//! Simulation harness.
//!
//! A standard deployment plus a seeded random walk over it, used by the
//! CLI, the integration tests and the benches.

pub mod deployment;
pub mod simulation;

pub use deployment::{Deployment, CREATOR_WBTC, ORACLE_WARMUP_SECS};
pub use simulation::{SimStep, Simulation, SimulationParams};
