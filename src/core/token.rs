//! Fungible token ledger.
//!
//! One ledger type backs BRAX, BXS and the collateral tokens:
//! - Balance tracking
//! - Allowances
//! - Minting and burning (restricted by the controller)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::utils::address::Address;
use crate::utils::math::{format_units, safe_add};
use crate::utils::validation::{validate_non_zero, validate_non_zero_address};

// ═══════════════════════════════════════════════════════════════════════════════
// TOKEN OPERATIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Type of ledger operation, for event logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenOperation {
    /// New supply
    Mint,
    /// Destroyed supply
    Burn,
    /// Transfer between accounts
    Transfer,
}

// ═══════════════════════════════════════════════════════════════════════════════
// TOKEN
// ═══════════════════════════════════════════════════════════════════════════════

/// ERC-20 style ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Token address
    pub address: Address,
    /// Token name
    pub name: String,
    /// Token symbol
    pub symbol: String,
    /// Decimal places
    pub decimals: u8,
    total_supply: u128,
    balances: BTreeMap<Address, u128>,
    allowances: BTreeMap<Address, BTreeMap<Address, u128>>,
}

impl Token {
    /// Create an empty ledger
    pub fn new(address: Address, name: &str, symbol: &str, decimals: u8) -> Result<Self> {
        validate_non_zero_address(&address)?;
        Ok(Self {
            address,
            name: name.to_string(),
            symbol: symbol.to_string(),
            decimals,
            total_supply: 0,
            balances: BTreeMap::new(),
            allowances: BTreeMap::new(),
        })
    }

    /// Create a ledger with `supply` minted to `holder`
    pub fn with_genesis(
        address: Address,
        name: &str,
        symbol: &str,
        decimals: u8,
        holder: Address,
        supply: u128,
    ) -> Result<Self> {
        let mut token = Self::new(address, name, symbol, decimals)?;
        if supply > 0 {
            token.mint(&holder, supply)?;
        }
        Ok(token)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // QUERIES
    // ═══════════════════════════════════════════════════════════════════════════

    /// Get total supply
    pub fn total_supply(&self) -> u128 {
        self.total_supply
    }

    /// Get balance of an address
    pub fn balance_of(&self, owner: &Address) -> u128 {
        self.balances.get(owner).copied().unwrap_or(0)
    }

    /// Amount `spender` may move on behalf of `owner`
    pub fn allowance(&self, owner: &Address, spender: &Address) -> u128 {
        self.allowances
            .get(owner)
            .and_then(|m| m.get(spender))
            .copied()
            .unwrap_or(0)
    }

    /// Render an amount in whole units
    pub fn format(&self, amount: u128) -> String {
        format!("{} {}", format_units(amount, self.decimals), self.symbol)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // TRANSFERS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Move `amount` from `from` to `to`
    pub fn transfer(&mut self, from: &Address, to: &Address, amount: u128) -> Result<()> {
        validate_non_zero_address(to)?;
        let available = self.balance_of(from);
        if available < amount {
            return Err(Error::InsufficientBalance {
                required: amount,
                available,
            });
        }
        if from == to {
            return Ok(());
        }
        let credited = safe_add(self.balance_of(to), amount)?;
        self.set_balance(from, available - amount);
        self.set_balance(to, credited);
        Ok(())
    }

    /// Set `spender`'s allowance over `owner`'s balance
    pub fn approve(&mut self, owner: &Address, spender: &Address, amount: u128) -> Result<()> {
        validate_non_zero_address(spender)?;
        self.allowances
            .entry(*owner)
            .or_default()
            .insert(*spender, amount);
        Ok(())
    }

    /// Transfer using an allowance
    pub fn transfer_from(
        &mut self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<()> {
        let allowed = self.check_allowance(from, spender, amount)?;
        self.transfer(from, to, amount)?;
        self.set_allowance(from, spender, allowed - amount);
        Ok(())
    }

    /// Fail unless `spender` could move `amount` of `owner`'s balance
    pub fn ensure_spendable(&self, owner: &Address, spender: &Address, amount: u128) -> Result<()> {
        self.check_allowance(owner, spender, amount)?;
        let available = self.balance_of(owner);
        if available < amount {
            return Err(Error::InsufficientBalance {
                required: amount,
                available,
            });
        }
        Ok(())
    }

    /// Fail unless `amount` could be minted without overflowing supply
    pub fn ensure_mintable(&self, amount: u128) -> Result<()> {
        safe_add(self.total_supply, amount).map(|_| ())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // SUPPLY MANAGEMENT
    // ═══════════════════════════════════════════════════════════════════════════

    /// Mint new tokens; callers gate who may reach this
    pub(crate) fn mint(&mut self, to: &Address, amount: u128) -> Result<()> {
        validate_non_zero_address(to)?;
        validate_non_zero(amount)?;
        let supply = safe_add(self.total_supply, amount)?;
        let balance = safe_add(self.balance_of(to), amount)?;
        self.total_supply = supply;
        self.set_balance(to, balance);
        Ok(())
    }

    /// Burn from the holder's own balance
    pub(crate) fn burn(&mut self, from: &Address, amount: u128) -> Result<()> {
        validate_non_zero(amount)?;
        let available = self.balance_of(from);
        if available < amount {
            return Err(Error::InsufficientBalance {
                required: amount,
                available,
            });
        }
        self.set_balance(from, available - amount);
        self.total_supply -= amount;
        Ok(())
    }

    /// Burn using `spender`'s allowance over `from`
    pub(crate) fn burn_from(&mut self, spender: &Address, from: &Address, amount: u128) -> Result<()> {
        let allowed = self.check_allowance(from, spender, amount)?;
        self.burn(from, amount)?;
        self.set_allowance(from, spender, allowed - amount);
        Ok(())
    }

    fn check_allowance(&self, owner: &Address, spender: &Address, amount: u128) -> Result<u128> {
        let allowed = self.allowance(owner, spender);
        if allowed < amount {
            return Err(Error::InsufficientAllowance {
                required: amount,
                available: allowed,
            });
        }
        Ok(allowed)
    }

    fn set_balance(&mut self, owner: &Address, amount: u128) {
        if amount == 0 {
            self.balances.remove(owner);
        } else {
            self.balances.insert(*owner, amount);
        }
    }

    fn set_allowance(&mut self, owner: &Address, spender: &Address, amount: u128) {
        if let Some(spenders) = self.allowances.get_mut(owner) {
            spenders.insert(*spender, amount);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_token() -> (Token, Address) {
        let holder = Address::from_label("holder");
        let token = Token::with_genesis(
            Address::from_label("brax"),
            "BRAX",
            "BRAX",
            18,
            holder,
            1_000,
        )
        .unwrap();
        (token, holder)
    }

    #[test]
    fn test_genesis() {
        let (token, holder) = make_token();
        assert_eq!(token.total_supply(), 1_000);
        assert_eq!(token.balance_of(&holder), 1_000);
    }

    #[test]
    fn test_transfer() {
        let (mut token, holder) = make_token();
        let to = Address::from_label("to");
        token.transfer(&holder, &to, 400).unwrap();
        assert_eq!(token.balance_of(&holder), 600);
        assert_eq!(token.balance_of(&to), 400);
        assert!(matches!(
            token.transfer(&to, &holder, 401),
            Err(Error::InsufficientBalance { required: 401, available: 400 })
        ));
        assert_eq!(token.transfer(&holder, &Address::ZERO, 1), Err(Error::ZeroAddress));
    }

    #[test]
    fn test_self_transfer_keeps_balance() {
        let (mut token, holder) = make_token();
        token.transfer(&holder, &holder, 300).unwrap();
        assert_eq!(token.balance_of(&holder), 1_000);
    }

    #[test]
    fn test_transfer_from_consumes_allowance() {
        let (mut token, holder) = make_token();
        let spender = Address::from_label("pool");
        token.approve(&holder, &spender, 500).unwrap();
        token.transfer_from(&spender, &holder, &spender, 200).unwrap();
        assert_eq!(token.allowance(&holder, &spender), 300);
        assert!(matches!(
            token.transfer_from(&spender, &holder, &spender, 301),
            Err(Error::InsufficientAllowance { .. })
        ));
    }

    #[test]
    fn test_mint_and_burn() {
        let (mut token, holder) = make_token();
        token.mint(&holder, 10).unwrap();
        assert_eq!(token.total_supply(), 1_010);
        token.burn(&holder, 1_010).unwrap();
        assert_eq!(token.total_supply(), 0);
        assert!(token.burn(&holder, 1).is_err());
        assert_eq!(token.mint(&holder, 0), Err(Error::ZeroAmount));
    }

    #[test]
    fn test_ensure_spendable() {
        let (mut token, holder) = make_token();
        let pool = Address::from_label("pool");
        assert!(matches!(
            token.ensure_spendable(&holder, &pool, 1),
            Err(Error::InsufficientAllowance { .. })
        ));
        token.approve(&holder, &pool, 5_000).unwrap();
        assert!(matches!(
            token.ensure_spendable(&holder, &pool, 2_000),
            Err(Error::InsufficientBalance { .. })
        ));
        assert!(token.ensure_spendable(&holder, &pool, 1_000).is_ok());
        assert!(token.ensure_mintable(u128::MAX).is_err());
    }

    #[test]
    fn test_burn_from_requires_allowance() {
        let (mut token, holder) = make_token();
        let pool = Address::from_label("pool");
        assert!(token.burn_from(&pool, &holder, 1).is_err());
        token.approve(&holder, &pool, 100).unwrap();
        token.burn_from(&pool, &holder, 100).unwrap();
        assert_eq!(token.total_supply(), 900);
        assert_eq!(token.allowance(&holder, &pool), 0);
    }
}
