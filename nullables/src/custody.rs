//! Nullable bond custody: an in-memory RPL ledger with allowances.

use std::collections::HashMap;
use trustdao_store::{BondCustody, BondOp, CustodyError};
use trustdao_types::{NodeAddress, RplAmount};

#[derive(Clone, Debug, Default)]
struct Ledger {
    balances: HashMap<NodeAddress, RplAmount>,
    allowances: HashMap<NodeAddress, RplAmount>,
    vault: RplAmount,
    total_supply: RplAmount,
}

/// A deterministic RPL ledger: balances, approvals to the custody vault, the
/// vault itself and total supply.
#[derive(Debug, Default)]
pub struct NullBondCustody {
    ledger: Ledger,
    frozen: bool,
}

impl NullBondCustody {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create tokens out of thin air for `to`.
    pub fn mint(&mut self, to: &NodeAddress, amount: RplAmount) {
        let balance = self.ledger.balances.entry(to.clone()).or_default();
        *balance = *balance + amount;
        self.ledger.total_supply = self.ledger.total_supply + amount;
    }

    /// Approve the vault to pull up to `amount` from `owner`.
    pub fn approve(&mut self, owner: &NodeAddress, amount: RplAmount) {
        self.ledger.allowances.insert(owner.clone(), amount);
    }

    pub fn allowance(&self, owner: &NodeAddress) -> RplAmount {
        self.ledger.allowances.get(owner).copied().unwrap_or_default()
    }

    /// RPL currently held in custody.
    pub fn vault(&self) -> RplAmount {
        self.ledger.vault
    }

    pub fn total_supply(&self) -> RplAmount {
        self.ledger.total_supply
    }

    /// While frozen every `settle` fails without touching balances.
    pub fn freeze(&mut self, frozen: bool) {
        self.frozen = frozen;
    }
}

impl Ledger {
    fn lock(&mut self, from: &NodeAddress, amount: RplAmount) -> Result<(), CustodyError> {
        let approved = self.allowances.get(from).copied().unwrap_or_default();
        if approved < amount {
            return Err(CustodyError::InsufficientAllowance {
                owner: from.to_string(),
                approved,
                needed: amount,
            });
        }
        let have = self.balances.get(from).copied().unwrap_or_default();
        let remaining = have
            .checked_sub(amount)
            .ok_or_else(|| CustodyError::InsufficientBalance {
                owner: from.to_string(),
                have,
                needed: amount,
            })?;
        self.balances.insert(from.clone(), remaining);
        self.allowances.insert(from.clone(), approved - amount);
        self.vault = self.vault + amount;
        Ok(())
    }

    fn take_from_vault(&mut self, amount: RplAmount) -> Result<(), CustodyError> {
        self.vault = self
            .vault
            .checked_sub(amount)
            .ok_or(CustodyError::VaultShortfall {
                held: self.vault,
                needed: amount,
            })?;
        Ok(())
    }

    fn release(&mut self, to: &NodeAddress, amount: RplAmount) -> Result<(), CustodyError> {
        self.take_from_vault(amount)?;
        let balance = self.balances.entry(to.clone()).or_default();
        *balance = *balance + amount;
        Ok(())
    }

    fn burn(&mut self, amount: RplAmount) -> Result<(), CustodyError> {
        self.take_from_vault(amount)?;
        self.total_supply = self.total_supply.saturating_sub(amount);
        Ok(())
    }
}

impl BondCustody for NullBondCustody {
    fn lock(&mut self, from: &NodeAddress, amount: RplAmount) -> Result<(), CustodyError> {
        self.ledger.lock(from, amount)
    }

    fn release(&mut self, to: &NodeAddress, amount: RplAmount) -> Result<(), CustodyError> {
        self.ledger.release(to, amount)
    }

    fn burn(&mut self, amount: RplAmount) -> Result<(), CustodyError> {
        self.ledger.burn(amount)
    }

    fn balance_of(&self, owner: &NodeAddress) -> RplAmount {
        self.ledger.balances.get(owner).copied().unwrap_or_default()
    }

    fn held(&self) -> RplAmount {
        self.ledger.vault
    }

    fn settle(&mut self, ops: &[BondOp]) -> Result<(), CustodyError> {
        if self.frozen {
            return Err(CustodyError::Backend("custody is frozen".into()));
        }
        let mut staged = self.ledger.clone();
        for op in ops {
            match op {
                BondOp::Lock { from, amount } => staged.lock(from, *amount)?,
                BondOp::Release { to, amount } => staged.release(to, *amount)?,
                BondOp::Burn { amount } => staged.burn(*amount)?,
            }
        }
        self.ledger = staged;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(n: u8) -> NodeAddress {
        let mut bytes = [0u8; 20];
        bytes[19] = n;
        NodeAddress::from_bytes(bytes)
    }

    #[test]
    fn lock_requires_allowance() {
        let mut custody = NullBondCustody::new();
        let a = node(1);
        custody.mint(&a, RplAmount::new(100));
        assert!(custody.lock(&a, RplAmount::new(10)).is_err());
        custody.approve(&a, RplAmount::new(10));
        custody.lock(&a, RplAmount::new(10)).unwrap();
        assert_eq!(custody.vault(), RplAmount::new(10));
        assert_eq!(custody.balance_of(&a), RplAmount::new(90));
    }

    #[test]
    fn settle_is_all_or_nothing() {
        let mut custody = NullBondCustody::new();
        let a = node(1);
        custody.mint(&a, RplAmount::new(100));
        custody.approve(&a, RplAmount::new(100));
        let ops = [
            BondOp::Lock {
                from: a.clone(),
                amount: RplAmount::new(50),
            },
            BondOp::Release {
                to: a.clone(),
                amount: RplAmount::new(80),
            },
        ];
        assert!(custody.settle(&ops).is_err());
        assert_eq!(custody.balance_of(&a), RplAmount::new(100));
        assert_eq!(custody.vault(), RplAmount::ZERO);
    }

    #[test]
    fn burn_reduces_supply() {
        let mut custody = NullBondCustody::new();
        let a = node(1);
        custody.mint(&a, RplAmount::new(100));
        custody.approve(&a, RplAmount::new(100));
        custody
            .settle(&[
                BondOp::Lock {
                    from: a.clone(),
                    amount: RplAmount::new(100),
                },
                BondOp::Burn {
                    amount: RplAmount::new(30),
                },
            ])
            .unwrap();
        assert_eq!(custody.total_supply(), RplAmount::new(70));
        assert_eq!(custody.vault(), RplAmount::new(70));
    }
}
