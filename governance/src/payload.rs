//! What a proposal does when executed.

use serde::{Deserialize, Serialize};
use trustdao_store::{SettingKey, SettingValue};
use trustdao_types::{NodeAddress, RplAmount};

/// A change to the contract directory, proposed or applied by the guardian.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractChange {
    AddContract {
        name: String,
        address: NodeAddress,
        abi: String,
    },
    UpgradeContract {
        name: String,
        address: NodeAddress,
        abi: String,
    },
    AddAbi {
        name: String,
        abi: String,
    },
    UpgradeAbi {
        name: String,
        abi: String,
    },
}

impl ContractChange {
    pub fn name(&self) -> &str {
        match self {
            Self::AddContract { name, .. }
            | Self::UpgradeContract { name, .. }
            | Self::AddAbi { name, .. }
            | Self::UpgradeAbi { name, .. } => name,
        }
    }
}

/// Proposal payload, dispatched by the DAO at execution time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalPayload {
    /// Admit a registered node; its bond is pulled into custody on execution.
    Invite {
        id: String,
        email: String,
        node: NodeAddress,
    },
    /// The proposer leaves; the full bond goes to `refund`.
    Leave { refund: NodeAddress },
    /// Remove `node`, burning `fine` from its bond and returning the rest.
    Kick { node: NodeAddress, fine: RplAmount },
    /// Change the contract directory.
    Contract(ContractChange),
    /// Write a setting in a governable group.
    Setting { key: SettingKey, value: SettingValue },
}

impl ProposalPayload {
    pub fn description(&self) -> String {
        match self {
            Self::Invite { id, node, .. } => format!("invite {id} ({node})"),
            Self::Leave { refund } => format!("leave, refund bond to {refund}"),
            Self::Kick { node, fine } => format!("kick {node} with fine {fine}"),
            Self::Contract(change) => match change {
                ContractChange::AddContract { name, address, .. } => {
                    format!("add contract {name} at {address}")
                }
                ContractChange::UpgradeContract { name, address, .. } => {
                    format!("upgrade contract {name} to {address}")
                }
                ContractChange::AddAbi { name, .. } => format!("add ABI {name}"),
                ContractChange::UpgradeAbi { name, .. } => format!("upgrade ABI {name}"),
            },
            Self::Setting { key, value } => format!("set {key} to {value:?}"),
        }
    }
}
