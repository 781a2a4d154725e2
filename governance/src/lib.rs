//! Trusted-node DAO governance.
//!
//! A permissioned membership that admits and removes members by proposal
//! vote, bonds members with RPL that can be partially burned, and lets
//! members challenge each other's liveness.
//!
//! Key principles:
//! - One member = one vote; quorum is `ceil(members * quorum_fraction)` of the
//!   *current* membership, recomputed on every vote, query and execution.
//! - Time is always supplied by the caller; nothing here reads a clock.
//! - A rejected command leaves all state unchanged.

pub mod challenge;
pub mod contracts;
pub mod dao;
pub mod error;
pub mod events;
pub mod member;
pub mod params;
pub mod payload;
pub mod proposal;
pub mod quorum;
pub mod settings;

pub use challenge::{ChallengeManager, ChallengeOutcome, ChallengeRecord};
pub use contracts::ContractDirectory;
pub use dao::{LedgerSnapshot, TrustedNodeDao};
pub use error::{ErrorKind, GovernanceError};
pub use events::{GovernanceEvent, JoinPath};
pub use member::{Member, MembershipRegistry};
pub use params::{DaoSetting, MemberSettings, ProposalSettings, GOVERNABLE_GROUPS};
pub use payload::{ContractChange, ProposalPayload};
pub use proposal::{Proposal, ProposalRegistry, ProposalState};
pub use quorum::QuorumCalculator;
pub use settings::SettingsStore;
