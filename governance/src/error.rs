use serde::Serialize;
use thiserror::Error;
use trustdao_store::{CustodyError, SettingKey, StoreError};
use trustdao_types::{EthAmount, RplAmount};

/// Coarse classification of a rejected command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The caller is not allowed to perform this action.
    Authorization,
    /// The proposal or challenge is in the wrong state.
    State,
    /// A cooldown or window has not elapsed.
    Timing,
    /// Bond, allowance or fee problems.
    Economic,
    /// The action would break a structural rule.
    Invariant,
    /// A collaborator's storage failed.
    Storage,
}

#[derive(Debug, Error)]
pub enum GovernanceError {
    #[error("{0} is not the bootstrap guardian")]
    NotGuardian(String),

    #[error("bootstrap mode is disabled")]
    BootstrapClosed,

    #[error("{0} is not a registered node")]
    NotRegisteredNode(String),

    #[error("{0} is already a member")]
    AlreadyMember(String),

    #[error("{0} is not a member")]
    NotMember(String),

    #[error("low member mode is not engaged: {members} members, minimum {minimum}")]
    LowMemberModeNotEngaged { members: usize, minimum: u64 },

    #[error("removing a member would leave {remaining} members, minimum is {minimum}")]
    BelowMinimumMembers { remaining: usize, minimum: u64 },

    #[error("quorum {0} is outside (0, 0.9]")]
    InvalidQuorum(String),

    #[error("invalid setting {key}: {reason}")]
    InvalidSetting { key: SettingKey, reason: String },

    #[error("setting group {0} cannot be changed by proposal")]
    SettingNotGovernable(String),

    #[error("proposal {0} not found")]
    ProposalNotFound(u64),

    #[error("proposer {proposer} must wait {remaining_secs}s before proposing again")]
    ProposalCooldown {
        proposer: String,
        remaining_secs: u64,
    },

    #[error("voting is not active on proposal {0}")]
    VotingNotActive(u64),

    #[error("{voter} cannot vote on proposal {id}: {reason}")]
    IneligibleVoter {
        id: u64,
        voter: String,
        reason: &'static str,
    },

    #[error("proposal {0} has already been decided")]
    AlreadyDecided(u64),

    #[error("proposal {0} cannot be executed")]
    NotExecutable(u64),

    #[error("proposal {0} cannot be cancelled")]
    NotCancellable(u64),

    #[error("{0} is not the proposer")]
    NotProposer(String),

    #[error("invalid proposal payload: {0}")]
    InvalidPayload(String),

    #[error("cannot challenge {0}: not a member")]
    InvalidTarget(String),

    #[error("a member cannot challenge themselves")]
    SelfChallenge,

    #[error("{0} already has an open challenge")]
    AlreadyChallenged(String),

    #[error("challenger {challenger} must wait {remaining_secs}s before challenging again")]
    CooldownActive {
        challenger: String,
        remaining_secs: u64,
    },

    #[error("non-member challengers must pay {required}, provided {provided}")]
    PaymentRequired {
        required: EthAmount,
        provided: EthAmount,
    },

    #[error("challenge fee {fee} would overflow the {held} already held")]
    FeeOverflow { held: EthAmount, fee: EthAmount },

    #[error("snapshot bonds total {bonded} but custody holds {held}")]
    SnapshotOutOfBalance { bonded: RplAmount, held: RplAmount },

    #[error("no active challenge against {0}")]
    NoActiveChallenge(String),

    #[error("only {0} can respond to their challenge")]
    NotChallengeTarget(String),

    #[error("challenge window for {target} is open for another {remaining_secs}s")]
    WindowNotElapsed {
        target: String,
        remaining_secs: u64,
    },

    #[error("fine {fine} exceeds bond {bond}")]
    FineExceedsBond { fine: RplAmount, bond: RplAmount },

    #[error("contract directory: {0}")]
    Contract(String),

    #[error("bond custody: {0}")]
    Custody(#[from] CustodyError),

    #[error("store: {0}")]
    Store(#[from] StoreError),
}

impl GovernanceError {
    pub fn kind(&self) -> ErrorKind {
        use GovernanceError::*;
        match self {
            NotGuardian(_) | NotRegisteredNode(_) | NotMember(_) | NotProposer(_)
            | NotChallengeTarget(_) | IneligibleVoter { .. } => ErrorKind::Authorization,
            BootstrapClosed
            | LowMemberModeNotEngaged { .. }
            | ProposalNotFound(_)
            | VotingNotActive(_)
            | AlreadyDecided(_)
            | NotExecutable(_)
            | NotCancellable(_)
            | NoActiveChallenge(_)
            | AlreadyChallenged(_)
            | InvalidTarget(_) => ErrorKind::State,
            ProposalCooldown { .. } | CooldownActive { .. } | WindowNotElapsed { .. } => {
                ErrorKind::Timing
            }
            PaymentRequired { .. } | FeeOverflow { .. } | FineExceedsBond { .. } | Custody(_) => {
                ErrorKind::Economic
            }
            AlreadyMember(_)
            | BelowMinimumMembers { .. }
            | InvalidQuorum(_)
            | InvalidSetting { .. }
            | SettingNotGovernable(_)
            | InvalidPayload(_)
            | SelfChallenge
            | SnapshotOutOfBalance { .. }
            | Contract(_) => ErrorKind::Invariant,
            Store(_) => ErrorKind::Storage,
        }
    }
}
