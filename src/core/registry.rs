//! Pool registry.
//!
//! Membership is a set; enumeration is an append-only slot array. Removing a
//! pool overwrites its slot with the zero address, so indices of the other
//! pools never move.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::info;

use crate::error::{Error, Result};
use crate::utils::address::Address;
use crate::utils::validation::validate_non_zero_address;

/// Authorized collateral pools
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolRegistry {
    members: BTreeSet<Address>,
    slots: Vec<Address>,
}

impl PoolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pool
    pub fn add(&mut self, pool: Address) -> Result<()> {
        validate_non_zero_address(&pool)?;
        if self.members.contains(&pool) {
            return Err(Error::PoolAlreadyExists(pool.to_hex()));
        }
        self.members.insert(pool);
        self.slots.push(pool);
        info!(pool = %pool.short(), slot = self.slots.len() - 1, "pool added");
        Ok(())
    }

    /// Deregister a pool, tombstoning its slot
    pub fn remove(&mut self, pool: Address) -> Result<()> {
        validate_non_zero_address(&pool)?;
        if !self.members.remove(&pool) {
            return Err(Error::PoolNonexistent(pool.to_hex()));
        }
        if let Some(slot) = self.slots.iter_mut().find(|slot| **slot == pool) {
            *slot = Address::ZERO;
        }
        info!(pool = %pool.short(), "pool removed");
        Ok(())
    }

    /// True if `pool` is registered
    pub fn is_pool(&self, pool: &Address) -> bool {
        self.members.contains(pool)
    }

    /// Address in slot `index`; zero for a removed pool
    pub fn slot(&self, index: usize) -> Result<Address> {
        self.slots.get(index).copied().ok_or(Error::IndexOutOfRange {
            index,
            len: self.slots.len(),
        })
    }

    /// Number of slots ever assigned, tombstones included
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Number of registered pools
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// True if no pool is registered
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Registered pools in slot order
    pub fn active(&self) -> impl Iterator<Item = &Address> {
        self.slots.iter().filter(|slot| !slot.is_zero())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_lookup() {
        let mut registry = PoolRegistry::new();
        let pool = Address::from_label("pool");
        registry.add(pool).unwrap();
        assert!(registry.is_pool(&pool));
        assert_eq!(registry.slot(0).unwrap(), pool);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_add_rejects_zero_and_duplicates() {
        let mut registry = PoolRegistry::new();
        assert_eq!(registry.add(Address::ZERO), Err(Error::ZeroAddress));
        let pool = Address::from_label("pool");
        registry.add(pool).unwrap();
        assert!(matches!(registry.add(pool), Err(Error::PoolAlreadyExists(_))));
        assert_eq!(registry.slot_count(), 1);
    }

    #[test]
    fn test_remove_tombstones_slot() {
        let mut registry = PoolRegistry::new();
        let a = Address::from_label("a");
        let b = Address::from_label("b");
        registry.add(a).unwrap();
        registry.add(b).unwrap();
        registry.remove(a).unwrap();

        assert!(!registry.is_pool(&a));
        assert_eq!(registry.slot(0).unwrap(), Address::ZERO);
        assert_eq!(registry.slot(1).unwrap(), b);
        assert_eq!(registry.active().collect::<Vec<_>>(), vec![&b]);

        // Re-adding appends a new slot
        registry.add(a).unwrap();
        assert_eq!(registry.slot(2).unwrap(), a);
    }

    #[test]
    fn test_remove_unknown() {
        let mut registry = PoolRegistry::new();
        assert!(matches!(
            registry.remove(Address::from_label("x")),
            Err(Error::PoolNonexistent(_))
        ));
        assert_eq!(registry.remove(Address::ZERO), Err(Error::ZeroAddress));
    }

    #[test]
    fn test_slot_out_of_range() {
        let registry = PoolRegistry::new();
        assert_eq!(
            registry.slot(0),
            Err(Error::IndexOutOfRange { index: 0, len: 0 })
        );
    }
}
