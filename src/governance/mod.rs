//! Governance for the BRAX controller.
//!
//! Setters are gated by a single [`AccessPolicy`] evaluated once per entry
//! point. Numeric settings are described by [`ControllerParameter`], which
//! carries each setting's bounds.

pub mod access;
pub mod parameters;

pub use access::*;
pub use parameters::*;
