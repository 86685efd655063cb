//! Authorization policy.
//!
//! Every controller entry point names one [`Permission`] and evaluates it
//! once against the caller before touching state. Callers are classified into
//! a [`CallerRole`]; named roles (admin, pauser) are explicit member sets.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::info;

use crate::core::registry::PoolRegistry;
use crate::error::{Error, Result};
use crate::utils::address::Address;
use crate::utils::validation::validate_non_zero_address;

// ═══════════════════════════════════════════════════════════════════════════════
// ROLES
// ═══════════════════════════════════════════════════════════════════════════════

/// How a caller relates to the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallerRole {
    /// Deployer or holder of the admin role
    Owner,
    /// Designated controller address
    Controller,
    /// Governance timelock
    GovernanceTimelock,
    /// Registered collateral pool
    Pool,
    /// Anyone else
    Public,
}

impl fmt::Display for CallerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CallerRole::Owner => "owner",
            CallerRole::Controller => "controller",
            CallerRole::GovernanceTimelock => "timelock",
            CallerRole::Pool => "pool",
            CallerRole::Public => "public",
        };
        f.write_str(name)
    }
}

/// Named roles with explicit membership
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    /// May grant and revoke roles
    DefaultAdmin,
    /// May pause and resume collateral-ratio refreshes
    CollateralRatioPauser,
}

/// What an entry point requires of its caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    /// Owner, controller or timelock
    Governance,
    /// Member of [`Role::CollateralRatioPauser`]
    CollateralRatioPauser,
    /// Registered pool
    Pool,
    /// Anyone
    Public,
}

// ═══════════════════════════════════════════════════════════════════════════════
// POLICY
// ═══════════════════════════════════════════════════════════════════════════════

/// Addresses and role memberships that decide who may call what
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPolicy {
    owner: Address,
    timelock: Address,
    controller: Address,
    roles: BTreeMap<Role, BTreeSet<Address>>,
}

impl AccessPolicy {
    /// Admin to `owner`; pauser to `owner` and `timelock`
    pub fn new(owner: Address, timelock: Address) -> Result<Self> {
        validate_non_zero_address(&owner)?;
        validate_non_zero_address(&timelock)?;
        let mut roles: BTreeMap<Role, BTreeSet<Address>> = BTreeMap::new();
        roles.entry(Role::DefaultAdmin).or_default().insert(owner);
        let pausers = roles.entry(Role::CollateralRatioPauser).or_default();
        pausers.insert(owner);
        pausers.insert(timelock);
        Ok(Self {
            owner,
            timelock,
            controller: Address::ZERO,
            roles,
        })
    }

    /// Classify `caller`
    pub fn classify(&self, caller: &Address, registry: &PoolRegistry) -> CallerRole {
        if caller.is_zero() {
            CallerRole::Public
        } else if *caller == self.owner {
            CallerRole::Owner
        } else if *caller == self.timelock {
            CallerRole::GovernanceTimelock
        } else if *caller == self.controller {
            CallerRole::Controller
        } else if registry.is_pool(caller) {
            CallerRole::Pool
        } else {
            CallerRole::Public
        }
    }

    /// Check `permission` for `caller`, returning its role
    pub fn authorize(
        &self,
        caller: &Address,
        permission: Permission,
        registry: &PoolRegistry,
    ) -> Result<CallerRole> {
        let role = self.classify(caller, registry);
        match permission {
            Permission::Public => Ok(role),
            Permission::Governance => match role {
                CallerRole::Owner | CallerRole::Controller | CallerRole::GovernanceTimelock => {
                    Ok(role)
                }
                _ => Err(Error::NotGovernance),
            },
            Permission::CollateralRatioPauser => {
                if self.has_role(Role::CollateralRatioPauser, caller) {
                    Ok(role)
                } else {
                    Err(Error::NotPauser)
                }
            }
            Permission::Pool => {
                // Checked on the registry directly so an owner that is also a pool still passes.
                if registry.is_pool(caller) {
                    Ok(CallerRole::Pool)
                } else {
                    Err(Error::NotPool)
                }
            }
        }
    }

    /// True if `account` holds `role`
    pub fn has_role(&self, role: Role, account: &Address) -> bool {
        self.roles
            .get(&role)
            .map(|members| members.contains(account))
            .unwrap_or(false)
    }

    /// Number of holders of `role`
    pub fn role_member_count(&self, role: Role) -> usize {
        self.roles.get(&role).map(|m| m.len()).unwrap_or(0)
    }

    /// Grant `role` to `account`; caller must be admin
    pub fn grant_role(&mut self, caller: &Address, role: Role, account: Address) -> Result<()> {
        if !self.has_role(Role::DefaultAdmin, caller) {
            return Err(Error::NotGovernance);
        }
        validate_non_zero_address(&account)?;
        self.roles.entry(role).or_default().insert(account);
        info!(?role, account = %account.short(), "role granted");
        Ok(())
    }

    /// Revoke `role` from `account`; caller must be admin
    pub fn revoke_role(&mut self, caller: &Address, role: Role, account: &Address) -> Result<()> {
        if !self.has_role(Role::DefaultAdmin, caller) {
            return Err(Error::NotGovernance);
        }
        if let Some(members) = self.roles.get_mut(&role) {
            members.remove(account);
        }
        info!(?role, account = %account.short(), "role revoked");
        Ok(())
    }

    /// Deployer
    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Governance timelock
    pub fn timelock(&self) -> Address {
        self.timelock
    }

    /// Controller, zero when unset
    pub fn controller(&self) -> Address {
        self.controller
    }

    pub(crate) fn set_timelock(&mut self, timelock: Address) -> Result<()> {
        validate_non_zero_address(&timelock)?;
        self.timelock = timelock;
        Ok(())
    }

    pub(crate) fn set_controller(&mut self, controller: Address) -> Result<()> {
        validate_non_zero_address(&controller)?;
        self.controller = controller;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_policy() -> (AccessPolicy, PoolRegistry) {
        let policy =
            AccessPolicy::new(Address::from_label("owner"), Address::from_label("timelock"))
                .unwrap();
        let mut registry = PoolRegistry::new();
        registry.add(Address::from_label("pool")).unwrap();
        (policy, registry)
    }

    #[test]
    fn test_initial_roles() {
        let (policy, _) = make_policy();
        assert!(policy.has_role(Role::DefaultAdmin, &Address::from_label("owner")));
        assert!(policy.has_role(Role::CollateralRatioPauser, &Address::from_label("timelock")));
        assert_eq!(policy.role_member_count(Role::CollateralRatioPauser), 2);
        assert_eq!(policy.role_member_count(Role::DefaultAdmin), 1);
    }

    #[test]
    fn test_governance_permission() {
        let (mut policy, registry) = make_policy();
        let controller = Address::from_label("controller");
        assert_eq!(
            policy.authorize(&controller, Permission::Governance, &registry),
            Err(Error::NotGovernance)
        );
        policy.set_controller(controller).unwrap();
        assert_eq!(
            policy.authorize(&controller, Permission::Governance, &registry),
            Ok(CallerRole::Controller)
        );
        assert_eq!(
            policy.authorize(&Address::from_label("timelock"), Permission::Governance, &registry),
            Ok(CallerRole::GovernanceTimelock)
        );
        assert_eq!(
            policy.authorize(&Address::from_label("pool"), Permission::Governance, &registry),
            Err(Error::NotGovernance)
        );
    }

    #[test]
    fn test_admin_role_is_not_governance() {
        let (mut policy, registry) = make_policy();
        let admin = Address::from_label("admin");
        policy
            .grant_role(&Address::from_label("owner"), Role::DefaultAdmin, admin)
            .unwrap();
        assert_eq!(policy.classify(&admin, &registry), CallerRole::Public);
        assert_eq!(
            policy.authorize(&admin, Permission::Governance, &registry),
            Err(Error::NotGovernance)
        );
        // Still administers roles
        policy
            .grant_role(&admin, Role::CollateralRatioPauser, admin)
            .unwrap();
        assert!(policy.has_role(Role::CollateralRatioPauser, &admin));
    }

    #[test]
    fn test_pauser_permission() {
        let (mut policy, registry) = make_policy();
        let other = Address::from_label("other");
        assert_eq!(
            policy.authorize(&other, Permission::CollateralRatioPauser, &registry),
            Err(Error::NotPauser)
        );
        policy
            .grant_role(&Address::from_label("owner"), Role::CollateralRatioPauser, other)
            .unwrap();
        assert!(policy
            .authorize(&other, Permission::CollateralRatioPauser, &registry)
            .is_ok());
        assert!(policy
            .grant_role(&other, Role::DefaultAdmin, other)
            .is_err());
    }

    #[test]
    fn test_pool_permission() {
        let (policy, registry) = make_policy();
        assert_eq!(
            policy.authorize(&Address::from_label("pool"), Permission::Pool, &registry),
            Ok(CallerRole::Pool)
        );
        assert_eq!(
            policy.authorize(&Address::from_label("owner"), Permission::Pool, &registry),
            Err(Error::NotPool)
        );
    }

    #[test]
    fn test_classify_public() {
        let (policy, registry) = make_policy();
        assert_eq!(
            policy.classify(&Address::from_label("anyone"), &registry),
            CallerRole::Public
        );
        assert_eq!(policy.classify(&Address::ZERO, &registry), CallerRole::Public);
    }
}
