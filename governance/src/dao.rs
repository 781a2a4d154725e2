//! The trusted-node DAO: membership, proposals and challenges composed over
//! the settings store and the external collaborators.
//!
//! Every command validates first, then performs at most one fallible
//! collaborator call (a bond settlement or a settings write), and only then
//! mutates in-memory state. A rejected command leaves everything unchanged.

use crate::challenge::{ChallengeManager, ChallengeOutcome, ChallengeRecord};
use crate::contracts::ContractDirectory;
use crate::error::GovernanceError;
use crate::events::{GovernanceEvent, JoinPath};
use crate::member::{Member, MembershipRegistry};
use crate::params::{
    describe_period, validate_setting, DaoSetting, MemberSettings, ProposalSettings,
};
use crate::payload::{ContractChange, ProposalPayload};
use crate::proposal::{Proposal, ProposalRegistry, ProposalState};
use crate::quorum::QuorumCalculator;
use crate::settings::SettingsStore;
use serde::{Deserialize, Serialize};
use trustdao_store::{
    BondCustody, BondOp, NodeRegistry, SettingKey, SettingValue, SettingsBacking, SnapshotStore,
    StoreError,
};
use trustdao_types::{EthAmount, NodeAddress, RplAmount, Timestamp};

/// Snapshot key under which the ledger is persisted.
const LEDGER_SNAPSHOT_KEY: &str = "trusted_node_dao_ledger";

/// Serializable copy of the DAO's in-memory ledger.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub members: MembershipRegistry,
    pub proposals: ProposalRegistry,
    pub challenges: ChallengeManager,
    pub contracts: ContractDirectory,
}

/// One trusted-node governance domain.
pub struct TrustedNodeDao<S, C, R> {
    settings: SettingsStore<S>,
    members: MembershipRegistry,
    proposals: ProposalRegistry,
    challenges: ChallengeManager,
    contracts: ContractDirectory,
    custody: C,
    registry: R,
    events: Vec<GovernanceEvent>,
}

impl<S, C, R> TrustedNodeDao<S, C, R>
where
    S: SettingsBacking,
    C: BondCustody,
    R: NodeRegistry,
{
    /// Build a DAO over `settings`, seeding any missing default settings.
    pub fn new(
        mut settings: SettingsStore<S>,
        custody: C,
        registry: R,
    ) -> Result<Self, GovernanceError> {
        settings.seed_defaults(&DaoSetting::defaults())?;
        Ok(Self {
            settings,
            members: MembershipRegistry::new(),
            proposals: ProposalRegistry::new(),
            challenges: ChallengeManager::new(),
            contracts: ContractDirectory::new(),
            custody,
            registry,
            events: Vec::new(),
        })
    }

    // ── Bootstrap (guardian only) ──────────────────────────────────────────

    /// Admit a registered node without a bond while bootstrap mode is open.
    pub fn bootstrap_member(
        &mut self,
        caller: &NodeAddress,
        id: &str,
        email: &str,
        node: &NodeAddress,
        now: Timestamp,
    ) -> Result<(), GovernanceError> {
        self.settings.check_bootstrap(caller)?;
        self.members.check_admissible(node, &self.registry)?;
        self.members
            .admit(Member::new(node.clone(), id, email, now, RplAmount::ZERO))?;
        self.events.push(GovernanceEvent::MemberJoined {
            member: node.clone(),
            bond: RplAmount::ZERO,
            via: JoinPath::Bootstrap,
        });
        Ok(())
    }

    /// Write any setting while bootstrap mode is open.
    pub fn bootstrap_setting(
        &mut self,
        caller: &NodeAddress,
        key: &SettingKey,
        value: SettingValue,
    ) -> Result<(), GovernanceError> {
        self.settings.check_bootstrap(caller)?;
        validate_setting(key, &value)?;
        match value {
            SettingValue::Uint(v) => {
                self.settings
                    .bootstrap_set_uint(caller, &key.group, &key.path, v)?
            }
            SettingValue::Bool(v) => {
                self.settings
                    .bootstrap_set_bool(caller, &key.group, &key.path, v)?
            }
            SettingValue::Address(v) => {
                self.settings
                    .bootstrap_set_address(caller, &key.group, &key.path, v)?
            }
        }
        self.events
            .push(GovernanceEvent::SettingChanged { key: key.clone() });
        Ok(())
    }

    /// Change the contract directory directly while bootstrap mode is open.
    pub fn bootstrap_upgrade(
        &mut self,
        caller: &NodeAddress,
        change: &ContractChange,
    ) -> Result<(), GovernanceError> {
        self.settings.check_bootstrap(caller)?;
        self.contracts.apply(change)?;
        self.events.push(GovernanceEvent::ContractUpgraded {
            name: change.name().to_string(),
        });
        Ok(())
    }

    /// Permanently hand control over to proposals.
    pub fn bootstrap_disable(&mut self, caller: &NodeAddress) -> Result<(), GovernanceError> {
        self.settings.disable_bootstrap(caller)?;
        self.events.push(GovernanceEvent::BootstrapDisabled);
        Ok(())
    }

    // ── Membership ────────────────────────────────────────────────────────

    /// Join without a proposal while membership is below the minimum. The
    /// caller must have approved the bond to custody.
    pub fn emergency_join(
        &mut self,
        caller: &NodeAddress,
        id: &str,
        email: &str,
        now: Timestamp,
    ) -> Result<(), GovernanceError> {
        let settings = MemberSettings::load(&self.settings)?;
        self.members
            .check_low_member_mode(settings.minimum_members)?;
        self.members.check_admissible(caller, &self.registry)?;
        self.lock_bond(caller, settings.rpl_bond)?;
        self.members.admit(Member::new(
            caller.clone(),
            id,
            email,
            now,
            settings.rpl_bond,
        ))?;
        tracing::warn!(member = %caller, "member joined through low member mode");
        self.events.push(GovernanceEvent::MemberJoined {
            member: caller.clone(),
            bond: settings.rpl_bond,
            via: JoinPath::Emergency,
        });
        Ok(())
    }

    fn lock_bond(&mut self, from: &NodeAddress, amount: RplAmount) -> Result<(), GovernanceError> {
        if amount.is_zero() {
            return Ok(());
        }
        self.custody.settle(&[BondOp::Lock {
            from: from.clone(),
            amount,
        }])?;
        Ok(())
    }

    /// Burn `fine` (capped at the bond), pay the rest to `refund_to`, then
    /// drop the member. Returns `(fine, refunded)`.
    fn remove_member(
        &mut self,
        node: &NodeAddress,
        fine: RplAmount,
        refund_to: &NodeAddress,
    ) -> Result<(RplAmount, RplAmount), GovernanceError> {
        let bond = self.members.require(node)?.rpl_bond;
        let fine = fine.min(bond);
        let refund = bond - fine;
        let mut ops = Vec::with_capacity(2);
        if !fine.is_zero() {
            ops.push(BondOp::Burn { amount: fine });
        }
        if !refund.is_zero() {
            ops.push(BondOp::Release {
                to: refund_to.clone(),
                amount: refund,
            });
        }
        if !ops.is_empty() {
            self.custody.settle(&ops)?;
        }
        self.members.remove(node);
        Ok((fine, refund))
    }

    // ── Proposals ─────────────────────────────────────────────────────────

    /// "Yes" votes currently needed for a proposal to succeed.
    pub fn quorum_votes_required(&self) -> Result<u64, GovernanceError> {
        let settings = MemberSettings::load(&self.settings)?;
        Ok(QuorumCalculator::votes_required(
            self.members.count(),
            settings.quorum,
        ))
    }

    fn validate_payload(
        &self,
        proposer: &NodeAddress,
        payload: &ProposalPayload,
    ) -> Result<(), GovernanceError> {
        match payload {
            ProposalPayload::Invite { id, node, .. } => {
                if id.trim().is_empty() {
                    return Err(GovernanceError::InvalidPayload("member id is empty".into()));
                }
                self.members.check_admissible(node, &self.registry)
            }
            ProposalPayload::Leave { refund } => {
                if refund.is_zero() {
                    return Err(GovernanceError::InvalidPayload(
                        "refund address is zero".into(),
                    ));
                }
                Ok(())
            }
            ProposalPayload::Kick { node, fine } => {
                if node == proposer {
                    return Err(GovernanceError::InvalidPayload(
                        "a member cannot propose kicking themselves".into(),
                    ));
                }
                let bond = self.members.require(node)?.rpl_bond;
                if *fine > bond {
                    return Err(GovernanceError::FineExceedsBond { fine: *fine, bond });
                }
                Ok(())
            }
            ProposalPayload::Contract(change) => self.contracts.validate(change),
            ProposalPayload::Setting { key, value } => {
                SettingsStore::<S>::check_governable(&key.group)?;
                validate_setting(key, value)
            }
        }
    }

    /// Create a proposal; returns its id.
    pub fn propose(
        &mut self,
        proposer: &NodeAddress,
        message: &str,
        payload: ProposalPayload,
        now: Timestamp,
    ) -> Result<u64, GovernanceError> {
        let member = self.members.require(proposer)?;
        self.validate_payload(proposer, &payload)?;
        let timing = ProposalSettings::load(&self.settings)?;
        let id = self
            .proposals
            .propose(member, message, payload, &timing, now)?;
        tracing::debug!(
            proposal_id = id,
            voting_period = %describe_period(timing.vote_duration_secs),
            execute_window = %describe_period(timing.execute_window_secs),
            "proposal timing"
        );
        self.events.push(GovernanceEvent::ProposalAdded {
            id,
            proposer: proposer.clone(),
        });
        Ok(id)
    }

    /// Vote on a proposal; returns the state after the vote is tallied.
    pub fn vote(
        &mut self,
        id: u64,
        voter: &NodeAddress,
        support: bool,
        now: Timestamp,
    ) -> Result<ProposalState, GovernanceError> {
        let required = self.quorum_votes_required()?;
        let member = self.members.require(voter)?;
        let state = self.proposals.vote(id, member, support, now, required)?;
        self.events.push(GovernanceEvent::ProposalVoted {
            id,
            voter: voter.clone(),
            support,
        });
        Ok(state)
    }

    /// Apply a succeeded proposal's payload. Anyone may execute.
    pub fn execute(
        &mut self,
        id: u64,
        caller: &NodeAddress,
        now: Timestamp,
    ) -> Result<(), GovernanceError> {
        let required = self.quorum_votes_required()?;
        let proposal = self.proposals.check_executable(id, now, required)?.clone();
        self.apply_payload(&proposal, now)?;
        self.proposals.mark_executed(id)?;
        tracing::info!(proposal_id = id, executor = %caller, "proposal payload applied");
        self.events.push(GovernanceEvent::ProposalExecuted { id });
        Ok(())
    }

    fn apply_payload(&mut self, proposal: &Proposal, now: Timestamp) -> Result<(), GovernanceError> {
        let settings = MemberSettings::load(&self.settings)?;
        match &proposal.payload {
            ProposalPayload::Invite { id, email, node } => {
                self.members.check_admissible(node, &self.registry)?;
                self.lock_bond(node, settings.rpl_bond)?;
                self.members.admit(Member::new(
                    node.clone(),
                    id.as_str(),
                    email.as_str(),
                    now,
                    settings.rpl_bond,
                ))?;
                self.events.push(GovernanceEvent::MemberJoined {
                    member: node.clone(),
                    bond: settings.rpl_bond,
                    via: JoinPath::Proposal,
                });
            }
            ProposalPayload::Leave { refund } => {
                let leaver = proposal.proposer.clone();
                self.members
                    .check_removable(&leaver, settings.minimum_members)?;
                let (_, refunded) = self.remove_member(&leaver, RplAmount::ZERO, refund)?;
                self.events.push(GovernanceEvent::MemberLeft {
                    member: leaver,
                    refund_to: refund.clone(),
                    refunded,
                });
            }
            ProposalPayload::Kick { node, fine } => {
                self.members
                    .check_removable(node, settings.minimum_members)?;
                let (fine, refunded) = self.remove_member(node, *fine, node)?;
                self.events.push(GovernanceEvent::MemberKicked {
                    member: node.clone(),
                    fine,
                    refunded,
                });
            }
            ProposalPayload::Contract(change) => {
                self.contracts.apply(change)?;
                self.events.push(GovernanceEvent::ContractUpgraded {
                    name: change.name().to_string(),
                });
            }
            ProposalPayload::Setting { key, value } => {
                validate_setting(key, value)?;
                self.settings.set_by_proposal(key, value.clone())?;
                tracing::info!(setting = %key, proposal_id = proposal.id, "setting changed by proposal");
                self.events
                    .push(GovernanceEvent::SettingChanged { key: key.clone() });
            }
        }
        Ok(())
    }

    /// Withdraw a pending or active proposal.
    pub fn cancel(
        &mut self,
        id: u64,
        caller: &NodeAddress,
        now: Timestamp,
    ) -> Result<(), GovernanceError> {
        let required = self.quorum_votes_required()?;
        self.proposals.cancel(id, caller, now, required)?;
        self.events.push(GovernanceEvent::ProposalCancelled { id });
        Ok(())
    }

    // ── Challenges ────────────────────────────────────────────────────────

    /// Challenge a member. Non-members must attach exactly the challenge cost.
    pub fn challenge(
        &mut self,
        target: &NodeAddress,
        challenger: &NodeAddress,
        fee: EthAmount,
        now: Timestamp,
    ) -> Result<ChallengeRecord, GovernanceError> {
        let settings = MemberSettings::load(&self.settings)?;
        let record = self.challenges.challenge(
            &mut self.members,
            &self.registry,
            target,
            challenger,
            fee,
            &settings,
            now,
        )?;
        self.events.push(GovernanceEvent::ChallengeMade {
            target: target.clone(),
            challenger: challenger.clone(),
        });
        Ok(record)
    }

    /// The target answers its own challenge.
    pub fn respond(
        &mut self,
        target: &NodeAddress,
        caller: &NodeAddress,
        success: bool,
    ) -> Result<ChallengeOutcome, GovernanceError> {
        let outcome = self
            .challenges
            .respond(&self.members, target, caller, success)?;
        self.resolve_challenge(outcome, caller)
    }

    /// Decide a challenge; non-targets must wait for the window to elapse.
    pub fn decide(
        &mut self,
        target: &NodeAddress,
        decider: &NodeAddress,
        success: bool,
        now: Timestamp,
    ) -> Result<ChallengeOutcome, GovernanceError> {
        let outcome = self
            .challenges
            .decide(&self.members, target, decider, success, now)?;
        self.resolve_challenge(outcome, decider)
    }

    fn resolve_challenge(
        &mut self,
        outcome: ChallengeOutcome,
        decider: &NodeAddress,
    ) -> Result<ChallengeOutcome, GovernanceError> {
        match &outcome {
            ChallengeOutcome::Cleared(record) => {
                self.challenges.clear(&mut self.members, &record.target);
            }
            ChallengeOutcome::Failed(record) => {
                let settings = MemberSettings::load(&self.settings)?;
                let fine = if settings.penalty_enabled {
                    settings.penalty_fine
                } else {
                    RplAmount::ZERO
                };
                let target = record.target.clone();
                let (fine, refunded) = self.remove_member(&target, fine, &target)?;
                tracing::info!(
                    target = %target,
                    decider = %decider,
                    %fine,
                    %refunded,
                    "member removed after failed challenge"
                );
                self.events.push(GovernanceEvent::MemberKicked {
                    member: target,
                    fine,
                    refunded,
                });
            }
        }
        let (target, success) = match &outcome {
            ChallengeOutcome::Cleared(r) => (r.target.clone(), true),
            ChallengeOutcome::Failed(r) => (r.target.clone(), false),
        };
        self.events.push(GovernanceEvent::ChallengeDecided {
            target,
            decider: decider.clone(),
            success,
        });
        Ok(outcome)
    }

    // ── Queries ───────────────────────────────────────────────────────────

    pub fn proposal_state(&self, id: u64, now: Timestamp) -> Result<ProposalState, GovernanceError> {
        self.proposals.state(id, now, self.quorum_votes_required()?)
    }

    pub fn proposal(&self, id: u64) -> Result<&Proposal, GovernanceError> {
        self.proposals.get(id)
    }

    pub fn proposal_count(&self) -> u64 {
        self.proposals.count()
    }

    pub fn votes_for(&self, id: u64) -> Result<u64, GovernanceError> {
        Ok(self.proposals.get(id)?.votes_for)
    }

    pub fn votes_against(&self, id: u64) -> Result<u64, GovernanceError> {
        Ok(self.proposals.get(id)?.votes_against)
    }

    pub fn start_time(&self, id: u64) -> Result<Timestamp, GovernanceError> {
        Ok(self.proposals.get(id)?.voting_starts_at)
    }

    pub fn end_time(&self, id: u64) -> Result<Timestamp, GovernanceError> {
        Ok(self.proposals.get(id)?.voting_ends_at)
    }

    pub fn expires_time(&self, id: u64) -> Result<Timestamp, GovernanceError> {
        Ok(self.proposals.get(id)?.expires_at)
    }

    pub fn has_voted(&self, id: u64, voter: &NodeAddress) -> Result<bool, GovernanceError> {
        Ok(self.proposals.get(id)?.has_voted(voter))
    }

    /// `Some(support)` if `voter` voted on proposal `id`.
    pub fn receipt(&self, id: u64, voter: &NodeAddress) -> Result<Option<bool>, GovernanceError> {
        Ok(self.proposals.get(id)?.receipts.get(voter).copied())
    }

    pub fn member_is_valid(&self, address: &NodeAddress) -> bool {
        self.members.is_member(address)
    }

    pub fn member_count(&self) -> usize {
        self.members.count()
    }

    pub fn member(&self, address: &NodeAddress) -> Option<&Member> {
        self.members.get(address)
    }

    pub fn members(&self) -> &MembershipRegistry {
        &self.members
    }

    pub fn challenge_of(&self, target: &NodeAddress) -> Option<&ChallengeRecord> {
        self.members.get(target).and_then(|m| m.challenged.as_ref())
    }

    pub fn challenge_fees_held(&self) -> EthAmount {
        self.challenges.fees_held()
    }

    pub fn contracts(&self) -> &ContractDirectory {
        &self.contracts
    }

    pub fn settings(&self) -> &SettingsStore<S> {
        &self.settings
    }

    pub fn custody(&self) -> &C {
        &self.custody
    }

    pub fn custody_mut(&mut self) -> &mut C {
        &mut self.custody
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut R {
        &mut self.registry
    }

    /// Take all events emitted since the last drain.
    pub fn drain_events(&mut self) -> Vec<GovernanceEvent> {
        std::mem::take(&mut self.events)
    }

    // ── Persistence ───────────────────────────────────────────────────────

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            members: self.members.clone(),
            proposals: self.proposals.clone(),
            challenges: self.challenges.clone(),
            contracts: self.contracts.clone(),
        }
    }

    /// Serialize the ledger into `store`.
    pub fn save_snapshot(&self, store: &mut impl SnapshotStore) -> Result<(), GovernanceError> {
        let bytes = bincode::serialize(&self.snapshot())
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        store.put_snapshot(LEDGER_SNAPSHOT_KEY, &bytes)?;
        tracing::debug!(bytes = bytes.len(), "ledger snapshot saved");
        Ok(())
    }

    /// Replace the in-memory ledger with the one saved in `store`.
    ///
    /// Custody is not part of the snapshot, so the saved member bonds must add
    /// up to what custody holds right now.
    pub fn restore_snapshot(&mut self, store: &impl SnapshotStore) -> Result<(), GovernanceError> {
        let bytes = store.get_snapshot(LEDGER_SNAPSHOT_KEY)?;
        let snapshot: LedgerSnapshot = bincode::deserialize(&bytes)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let bonded = snapshot.members.total_bonded();
        let held = self.custody.held();
        if bonded != held {
            return Err(GovernanceError::SnapshotOutOfBalance { bonded, held });
        }
        self.members = snapshot.members;
        self.proposals = snapshot.proposals;
        self.challenges = snapshot.challenges;
        self.contracts = snapshot.contracts;
        tracing::info!(
            members = self.members.count(),
            proposals = self.proposals.count(),
            "ledger snapshot restored"
        );
        Ok(())
    }
}
