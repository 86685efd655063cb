//! Pair book for the simulated AMM.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

use crate::amm::pair::ConstantProductPair;
use crate::error::{Error, Result};
use crate::utils::address::Address;

/// All pairs of the simulated AMM, keyed by pair address
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Market {
    pairs: BTreeMap<Address, ConstantProductPair>,
}

impl Market {
    /// Create an empty market
    pub fn new() -> Self {
        Self::default()
    }

    /// Deterministic pair address for two tokens, independent of argument order
    pub fn pair_address(token_a: &Address, token_b: &Address) -> Address {
        let (t0, t1) = if token_a < token_b {
            (token_a, token_b)
        } else {
            (token_b, token_a)
        };
        Address::from_label(&format!("pair:{}:{}", t0, t1))
    }

    /// Create a pair, failing if one already exists for the tokens
    pub fn create_pair(
        &mut self,
        token_a: Address,
        decimals_a: u8,
        token_b: Address,
        decimals_b: u8,
    ) -> Result<Address> {
        let address = Self::pair_address(&token_a, &token_b);
        if self.pairs.contains_key(&address) {
            return Err(Error::invalid_parameter("pair", "PAIR_EXISTS"));
        }
        let pair = ConstantProductPair::new(address, token_a, decimals_a, token_b, decimals_b)?;
        self.pairs.insert(address, pair);
        info!(pair = %address.short(), "pair created");
        Ok(address)
    }

    /// Pair by address
    pub fn pair(&self, address: &Address) -> Result<&ConstantProductPair> {
        self.pairs
            .get(address)
            .ok_or_else(|| Error::PairNotFound(address.to_hex()))
    }

    /// Mutable pair by address
    pub fn pair_mut(&mut self, address: &Address) -> Result<&mut ConstantProductPair> {
        self.pairs
            .get_mut(address)
            .ok_or_else(|| Error::PairNotFound(address.to_hex()))
    }

    /// Pair trading `token_a` against `token_b`
    pub fn pair_for(&self, token_a: &Address, token_b: &Address) -> Result<&ConstantProductPair> {
        self.pair(&Self::pair_address(token_a, token_b))
    }

    /// Iterate all pairs
    pub fn pairs(&self) -> impl Iterator<Item = &ConstantProductPair> {
        self.pairs.values()
    }
}
