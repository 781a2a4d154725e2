//! Events emitted by successful commands, drained by the node layer.

use serde::{Deserialize, Serialize};
use trustdao_store::SettingKey;
use trustdao_types::{NodeAddress, RplAmount};

/// How a member came to join.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinPath {
    Bootstrap,
    Proposal,
    Emergency,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GovernanceEvent {
    MemberJoined {
        member: NodeAddress,
        bond: RplAmount,
        via: JoinPath,
    },
    MemberLeft {
        member: NodeAddress,
        refund_to: NodeAddress,
        refunded: RplAmount,
    },
    /// Removed by a kick proposal or a failed challenge.
    MemberKicked {
        member: NodeAddress,
        fine: RplAmount,
        refunded: RplAmount,
    },
    ProposalAdded {
        id: u64,
        proposer: NodeAddress,
    },
    ProposalVoted {
        id: u64,
        voter: NodeAddress,
        support: bool,
    },
    ProposalExecuted {
        id: u64,
    },
    ProposalCancelled {
        id: u64,
    },
    ChallengeMade {
        target: NodeAddress,
        challenger: NodeAddress,
    },
    ChallengeDecided {
        target: NodeAddress,
        decider: NodeAddress,
        success: bool,
    },
    SettingChanged {
        key: SettingKey,
    },
    ContractUpgraded {
        name: String,
    },
    BootstrapDisabled,
}
