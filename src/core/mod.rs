//! Core building blocks.
//!
//! - `config`: engine configuration
//! - `token`: ERC-20 style ledgers for BRAX, BXS and collateral
//! - `registry`: authorized pool set with stable slot indices
//! - `pool`: collateral pool quoting and redemption accounting

pub mod config;
pub mod pool;
pub mod registry;
pub mod token;

pub use config::*;
pub use pool::*;
pub use registry::*;
pub use token::*;
