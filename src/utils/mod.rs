//! Utility modules for the BRAX engine.
//!
//! This module contains shared utilities used across the engine:
//! - Addresses
//! - Fixed-point arithmetic (1e8 scale and UQ112x112)
//! - Validation helpers
//! - Constants

pub mod address;
pub mod constants;
pub mod math;
pub mod validation;

pub use address::*;
pub use constants::*;
pub use math::*;
pub use validation::*;
