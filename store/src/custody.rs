//! Bond custody trait.

use crate::CustodyError;
use serde::{Deserialize, Serialize};
use trustdao_types::{NodeAddress, RplAmount};

/// One movement of bonded RPL.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BondOp {
    /// Pull `amount` from `from` (against a prior approval) into custody.
    Lock { from: NodeAddress, amount: RplAmount },
    /// Pay `amount` out of custody to `to`.
    Release { to: NodeAddress, amount: RplAmount },
    /// Destroy `amount` held in custody, reducing total supply.
    Burn { amount: RplAmount },
}

/// Escrow for member bonds.
///
/// The governance core only calls [`BondCustody::settle`], which must apply a
/// whole batch or nothing. The single-step methods are the primitives a
/// backend builds `settle` from.
pub trait BondCustody {
    fn lock(&mut self, from: &NodeAddress, amount: RplAmount) -> Result<(), CustodyError>;

    fn release(&mut self, to: &NodeAddress, amount: RplAmount) -> Result<(), CustodyError>;

    fn burn(&mut self, amount: RplAmount) -> Result<(), CustodyError>;

    fn balance_of(&self, owner: &NodeAddress) -> RplAmount;

    /// RPL currently held in custody.
    fn held(&self) -> RplAmount;

    /// Apply every op in order, or none of them.
    fn settle(&mut self, ops: &[BondOp]) -> Result<(), CustodyError>;
}
