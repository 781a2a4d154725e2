//! Directory of network contract addresses and ABIs.

use crate::error::GovernanceError;
use crate::payload::ContractChange;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use trustdao_types::NodeAddress;

/// Name → address and name → ABI maps, changed only by upgrade proposals or
/// the guardian during bootstrap.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ContractDirectory {
    addresses: BTreeMap<String, NodeAddress>,
    abis: BTreeMap<String, String>,
}

impl ContractDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn address_of(&self, name: &str) -> Option<&NodeAddress> {
        self.addresses.get(name)
    }

    pub fn abi_of(&self, name: &str) -> Option<&str> {
        self.abis.get(name).map(String::as_str)
    }

    /// Check a change without applying it.
    pub fn validate(&self, change: &ContractChange) -> Result<(), GovernanceError> {
        let name = change.name();
        if name.is_empty() {
            return Err(GovernanceError::Contract("name is empty".into()));
        }
        match change {
            ContractChange::AddContract { address, abi, .. } => {
                check_address(address)?;
                check_abi(abi)?;
                if self.addresses.contains_key(name) {
                    return Err(GovernanceError::Contract(format!("{name} already exists")));
                }
                if self.addresses.values().any(|a| a == address) {
                    return Err(GovernanceError::Contract(format!(
                        "{address} is already in use"
                    )));
                }
            }
            ContractChange::UpgradeContract { address, abi, .. } => {
                check_address(address)?;
                check_abi(abi)?;
                match self.addresses.get(name) {
                    None => return Err(GovernanceError::Contract(format!("{name} does not exist"))),
                    Some(current) if current == address => {
                        return Err(GovernanceError::Contract(format!(
                            "{name} is already at {address}"
                        )))
                    }
                    Some(_) => {}
                }
            }
            ContractChange::AddAbi { abi, .. } => {
                check_abi(abi)?;
                if self.abis.contains_key(name) {
                    return Err(GovernanceError::Contract(format!("ABI {name} already exists")));
                }
            }
            ContractChange::UpgradeAbi { abi, .. } => {
                check_abi(abi)?;
                match self.abis.get(name) {
                    None => {
                        return Err(GovernanceError::Contract(format!("ABI {name} does not exist")))
                    }
                    Some(current) if current == abi => {
                        return Err(GovernanceError::Contract(format!("ABI {name} is unchanged")))
                    }
                    Some(_) => {}
                }
            }
        }
        Ok(())
    }

    pub fn apply(&mut self, change: &ContractChange) -> Result<(), GovernanceError> {
        self.validate(change)?;
        match change {
            ContractChange::AddContract { name, address, abi }
            | ContractChange::UpgradeContract { name, address, abi } => {
                self.addresses.insert(name.clone(), address.clone());
                self.abis.insert(name.clone(), abi.clone());
            }
            ContractChange::AddAbi { name, abi } | ContractChange::UpgradeAbi { name, abi } => {
                self.abis.insert(name.clone(), abi.clone());
            }
        }
        tracing::info!(contract = %change.name(), "contract directory updated");
        Ok(())
    }
}

fn check_address(address: &NodeAddress) -> Result<(), GovernanceError> {
    if address.is_zero() {
        return Err(GovernanceError::Contract("address is zero".into()));
    }
    Ok(())
}

fn check_abi(abi: &str) -> Result<(), GovernanceError> {
    if abi.trim().is_empty() {
        return Err(GovernanceError::Contract("ABI is empty".into()));
    }
    Ok(())
}
