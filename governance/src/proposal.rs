//! Governance proposals and their lifecycle.
//!
//! A proposal's state is derived, never cached: it is a pure function of the
//! stored flags and tallies, the caller-supplied `now`, and the number of
//! "yes" votes required by the *current* membership.
//!
//! ```text
//! Pending ──▶ Active ──▶ Succeeded ──▶ Executed
//!    │           │    └─▶ Defeated      └─▶ Expired (now >= expires_at)
//!    └───────────┴──▶ Cancelled (proposer only)
//! ```

use crate::error::GovernanceError;
use crate::member::Member;
use crate::params::ProposalSettings;
use crate::payload::ProposalPayload;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use trustdao_types::{NodeAddress, Timestamp};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProposalState {
    /// Created, voting has not started.
    Pending,
    /// Voting is open and quorum has not been reached.
    Active,
    /// Cancelled by the proposer before a decision.
    Cancelled,
    /// Voting closed without reaching quorum.
    Defeated,
    /// Quorum reached; may be executed until `expires_at`.
    Succeeded,
    /// Reached quorum but was not executed in time.
    Expired,
    /// Payload applied.
    Executed,
}

impl fmt::Display for ProposalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Proposal {
    /// 1-based, strictly increasing.
    pub id: u64,
    pub proposer: NodeAddress,
    pub message: String,
    pub payload: ProposalPayload,
    pub created_at: Timestamp,
    pub voting_starts_at: Timestamp,
    pub voting_ends_at: Timestamp,
    pub expires_at: Timestamp,
    pub votes_for: u64,
    pub votes_against: u64,
    pub cancelled: bool,
    pub executed: bool,
    /// Vote receipts: voter → supported.
    pub receipts: BTreeMap<NodeAddress, bool>,
}

impl Proposal {
    /// Derive the state at `now` given the live quorum requirement.
    pub fn state_at(&self, now: Timestamp, votes_required: u64) -> ProposalState {
        if self.cancelled {
            return ProposalState::Cancelled;
        }
        if self.executed {
            return ProposalState::Executed;
        }
        if now >= self.expires_at {
            return if self.reached(votes_required) {
                ProposalState::Expired
            } else {
                ProposalState::Defeated
            };
        }
        if now < self.voting_starts_at {
            return ProposalState::Pending;
        }
        if self.reached(votes_required) {
            return ProposalState::Succeeded;
        }
        if now < self.voting_ends_at {
            ProposalState::Active
        } else {
            ProposalState::Defeated
        }
    }

    fn reached(&self, votes_required: u64) -> bool {
        self.votes_for >= votes_required.max(1)
    }

    pub fn has_voted(&self, voter: &NodeAddress) -> bool {
        self.receipts.contains_key(voter)
    }
}

/// All proposals plus per-proposer cooldown bookkeeping.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ProposalRegistry {
    proposals: BTreeMap<u64, Proposal>,
    last_proposed_at: HashMap<NodeAddress, Timestamp>,
    next_id: u64,
}

impl ProposalRegistry {
    pub fn new() -> Self {
        Self {
            proposals: BTreeMap::new(),
            last_proposed_at: HashMap::new(),
            next_id: 1,
        }
    }

    /// Number of proposals ever created.
    pub fn count(&self) -> u64 {
        self.next_id.saturating_sub(1)
    }

    pub fn get(&self, id: u64) -> Result<&Proposal, GovernanceError> {
        self.proposals
            .get(&id)
            .ok_or(GovernanceError::ProposalNotFound(id))
    }

    fn get_mut(&mut self, id: u64) -> Result<&mut Proposal, GovernanceError> {
        self.proposals
            .get_mut(&id)
            .ok_or(GovernanceError::ProposalNotFound(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Proposal> {
        self.proposals.values()
    }

    pub fn last_proposed_at(&self, proposer: &NodeAddress) -> Option<Timestamp> {
        self.last_proposed_at.get(proposer).copied()
    }

    /// Fails if `proposer` proposed less than `cooldown_secs` ago.
    pub fn check_cooldown(
        &self,
        proposer: &NodeAddress,
        cooldown_secs: u64,
        now: Timestamp,
    ) -> Result<(), GovernanceError> {
        if let Some(last) = self.last_proposed_at(proposer) {
            if !last.has_expired(cooldown_secs, now) {
                return Err(GovernanceError::ProposalCooldown {
                    proposer: proposer.to_string(),
                    remaining_secs: last.plus(cooldown_secs).as_secs() - now.as_secs(),
                });
            }
        }
        Ok(())
    }

    /// Create a proposal. The caller has already checked the payload.
    pub fn propose(
        &mut self,
        proposer: &Member,
        message: impl Into<String>,
        payload: ProposalPayload,
        timing: &ProposalSettings,
        now: Timestamp,
    ) -> Result<u64, GovernanceError> {
        self.check_cooldown(&proposer.address, timing.cooldown_secs, now)?;

        // Keeps the id sequence 1-based after a restore from a default value.
        let id = self.next_id.max(1);
        let voting_starts_at = now.plus(timing.vote_delay_secs);
        let voting_ends_at = voting_starts_at.plus(timing.vote_duration_secs.max(1));
        let expires_at = voting_ends_at.plus(timing.execute_window_secs.max(1));

        let proposal = Proposal {
            id,
            proposer: proposer.address.clone(),
            message: message.into(),
            payload,
            created_at: now,
            voting_starts_at,
            voting_ends_at,
            expires_at,
            votes_for: 0,
            votes_against: 0,
            cancelled: false,
            executed: false,
            receipts: BTreeMap::new(),
        };
        tracing::info!(
            proposal_id = id,
            proposer = %proposer.address,
            payload = %proposal.payload.description(),
            starts = %voting_starts_at,
            ends = %voting_ends_at,
            expires = %expires_at,
            "proposal created"
        );
        self.proposals.insert(id, proposal);
        self.last_proposed_at.insert(proposer.address.clone(), now);
        self.next_id = id + 1;
        Ok(id)
    }

    pub fn state(
        &self,
        id: u64,
        now: Timestamp,
        votes_required: u64,
    ) -> Result<ProposalState, GovernanceError> {
        Ok(self.get(id)?.state_at(now, votes_required))
    }

    /// Record a vote and return the state after tallying.
    pub fn vote(
        &mut self,
        id: u64,
        voter: &Member,
        support: bool,
        now: Timestamp,
        votes_required: u64,
    ) -> Result<ProposalState, GovernanceError> {
        let proposal = self.get_mut(id)?;
        match proposal.state_at(now, votes_required) {
            ProposalState::Active => {}
            ProposalState::Succeeded | ProposalState::Executed => {
                return Err(GovernanceError::AlreadyDecided(id))
            }
            _ => return Err(GovernanceError::VotingNotActive(id)),
        }
        if voter.joined_at >= proposal.created_at {
            return Err(GovernanceError::IneligibleVoter {
                id,
                voter: voter.address.to_string(),
                reason: "joined after the proposal was created",
            });
        }
        if proposal.has_voted(&voter.address) {
            return Err(GovernanceError::IneligibleVoter {
                id,
                voter: voter.address.to_string(),
                reason: "already voted",
            });
        }

        if support {
            proposal.votes_for += 1;
        } else {
            proposal.votes_against += 1;
        }
        proposal.receipts.insert(voter.address.clone(), support);

        let state = proposal.state_at(now, votes_required);
        tracing::debug!(
            proposal_id = id,
            voter = %voter.address,
            support,
            votes_for = proposal.votes_for,
            votes_against = proposal.votes_against,
            votes_required,
            %state,
            "vote recorded"
        );
        Ok(state)
    }

    /// Fails with `NotExecutable` unless the proposal has succeeded and not expired.
    pub fn check_executable(
        &self,
        id: u64,
        now: Timestamp,
        votes_required: u64,
    ) -> Result<&Proposal, GovernanceError> {
        let proposal = self.get(id)?;
        if proposal.state_at(now, votes_required) != ProposalState::Succeeded {
            return Err(GovernanceError::NotExecutable(id));
        }
        Ok(proposal)
    }

    pub(crate) fn mark_executed(&mut self, id: u64) -> Result<(), GovernanceError> {
        let proposal = self.get_mut(id)?;
        proposal.executed = true;
        tracing::info!(proposal_id = id, "proposal executed");
        Ok(())
    }

    /// Cancel a proposal; only its proposer, only while pending or active.
    pub fn cancel(
        &mut self,
        id: u64,
        caller: &NodeAddress,
        now: Timestamp,
        votes_required: u64,
    ) -> Result<(), GovernanceError> {
        let proposal = self.get_mut(id)?;
        if &proposal.proposer != caller {
            return Err(GovernanceError::NotProposer(caller.to_string()));
        }
        match proposal.state_at(now, votes_required) {
            ProposalState::Pending | ProposalState::Active => {}
            _ => return Err(GovernanceError::NotCancellable(id)),
        }
        proposal.cancelled = true;
        tracing::info!(proposal_id = id, proposer = %caller, "proposal cancelled");
        Ok(())
    }
}
