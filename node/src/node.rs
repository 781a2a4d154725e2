//! The DAO node: one governance domain over in-memory collaborators, applying
//! log entries strictly in order.

use serde::Serialize;

use trustdao_governance::{
    ChallengeOutcome, ChallengeRecord, ErrorKind, GovernanceError, GovernanceEvent,
    ProposalState, SettingsStore, TrustedNodeDao,
};
use trustdao_nullables::{NullBondCustody, NullNodeRegistry, NullSettingsBacking, NullSnapshotStore};
use trustdao_store::{BondCustody, SettingValue};
use trustdao_types::{Clock, EthAmount, NodeAddress, RplAmount, Timestamp};

use crate::command::{Command, CommandLog, LogEntry, Query};
use crate::{NodeConfig, NodeError};

/// The DAO wired to in-memory settings, custody and node registry.
pub type MemoryDao = TrustedNodeDao<NullSettingsBacking, NullBondCustody, NullNodeRegistry>;

/// Answer to a [`Query`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum QueryValue {
    State(ProposalState),
    Count(u64),
    Flag(bool),
    Time(Timestamp),
    Receipt(Option<bool>),
    Address(Option<NodeAddress>),
    Text(Option<String>),
    Setting(Option<SettingValue>),
    Rpl(RplAmount),
    Eth(EthAmount),
}

/// Result of applying one log entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reply {
    Applied {
        events: Vec<GovernanceEvent>,
    },
    Proposed {
        id: u64,
    },
    Voted {
        state: ProposalState,
    },
    Challenged {
        record: ChallengeRecord,
    },
    Decided {
        target: NodeAddress,
        cleared: bool,
        events: Vec<GovernanceEvent>,
    },
    Value(QueryValue),
    Rejected {
        command: &'static str,
        kind: ErrorKind,
        error: String,
    },
}

impl Reply {
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }

    /// The error kind if this reply is a rejection.
    pub fn rejection(&self) -> Option<ErrorKind> {
        match self {
            Self::Rejected { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

pub struct DaoNode<K> {
    dao: MemoryDao,
    clock: K,
    snapshots: NullSnapshotStore,
    applied: u64,
    rejected: u64,
}

impl<K: Clock> DaoNode<K> {
    /// Build the node and write the configured setting overrides as the
    /// guardian.
    pub fn new(config: &NodeConfig, clock: K) -> Result<Self, NodeError> {
        let guardian = config.guardian()?;
        let settings = SettingsStore::open(NullSettingsBacking::new(), guardian.clone())?;
        let mut dao = TrustedNodeDao::new(settings, NullBondCustody::new(), NullNodeRegistry::new())?;
        for (key, value) in config.setting_overrides()? {
            dao.bootstrap_setting(&guardian, &key, value)?;
        }
        dao.drain_events();
        tracing::info!(
            guardian = %guardian,
            overrides = config.settings.len(),
            "DAO node initialised"
        );
        Ok(Self {
            dao,
            clock,
            snapshots: NullSnapshotStore::new(),
            applied: 0,
            rejected: 0,
        })
    }

    pub fn dao(&self) -> &MemoryDao {
        &self.dao
    }

    /// Entries applied so far, rejected ones included.
    pub fn applied(&self) -> u64 {
        self.applied
    }

    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    /// Apply one entry. Rejections are returned as [`Reply::Rejected`] and
    /// leave the ledger unchanged.
    pub fn apply(&mut self, entry: LogEntry) -> Reply {
        let now = entry
            .at
            .map(Timestamp::new)
            .unwrap_or_else(|| self.clock.now());
        let name = entry.command.name();
        self.applied += 1;
        match self.dispatch(entry.command, now) {
            Ok(reply) => {
                tracing::debug!(command = name, at = %now, "command applied");
                reply
            }
            Err(err) => {
                self.rejected += 1;
                // A rejected command must not leak events from partial work.
                self.dao.drain_events();
                tracing::warn!(command = name, at = %now, kind = ?err.kind(), error = %err, "command rejected");
                Reply::Rejected {
                    command: name,
                    kind: err.kind(),
                    error: err.to_string(),
                }
            }
        }
    }

    /// Apply every entry of `log` in order.
    pub fn replay(&mut self, log: &CommandLog, stop_on_error: bool) -> Vec<Reply> {
        let mut replies = Vec::with_capacity(log.len());
        for entry in log.entries() {
            let reply = self.apply(entry.clone());
            let stop = stop_on_error && reply.is_rejected();
            replies.push(reply);
            if stop {
                tracing::warn!(applied = replies.len(), total = log.len(), "replay stopped at rejected command");
                break;
            }
        }
        tracing::info!(
            applied = replies.len(),
            rejected = replies.iter().filter(|r| r.is_rejected()).count(),
            members = self.dao.member_count(),
            proposals = self.dao.proposal_count(),
            "replay finished"
        );
        replies
    }

    fn applied_events(&mut self) -> Reply {
        Reply::Applied {
            events: self.dao.drain_events(),
        }
    }

    fn dispatch(&mut self, command: Command, now: Timestamp) -> Result<Reply, GovernanceError> {
        let dao = &mut self.dao;
        match command {
            Command::RegisterNode { node } => {
                dao.registry_mut().register(&node);
                Ok(Reply::Applied { events: Vec::new() })
            }
            Command::MintRpl { to, amount } => {
                dao.custody_mut().mint(&to, amount);
                Ok(Reply::Applied { events: Vec::new() })
            }
            Command::ApproveRpl { owner, amount } => {
                dao.custody_mut().approve(&owner, amount);
                Ok(Reply::Applied { events: Vec::new() })
            }
            Command::BootstrapMember {
                caller,
                id,
                email,
                node,
            } => {
                dao.bootstrap_member(&caller, &id, &email, &node, now)?;
                Ok(self.applied_events())
            }
            Command::BootstrapSetting { caller, key, value } => {
                dao.bootstrap_setting(&caller, &key, value)?;
                Ok(self.applied_events())
            }
            Command::BootstrapUpgrade { caller, change } => {
                dao.bootstrap_upgrade(&caller, &change)?;
                Ok(self.applied_events())
            }
            Command::BootstrapDisable { caller } => {
                dao.bootstrap_disable(&caller)?;
                Ok(self.applied_events())
            }
            Command::EmergencyJoin { caller, id, email } => {
                dao.emergency_join(&caller, &id, &email, now)?;
                Ok(self.applied_events())
            }
            Command::Propose {
                proposer,
                message,
                payload,
            } => {
                let id = dao.propose(&proposer, &message, payload, now)?;
                dao.drain_events();
                Ok(Reply::Proposed { id })
            }
            Command::Vote { id, voter, support } => {
                let state = dao.vote(id, &voter, support, now)?;
                dao.drain_events();
                Ok(Reply::Voted { state })
            }
            Command::Execute { id, caller } => {
                dao.execute(id, &caller, now)?;
                Ok(self.applied_events())
            }
            Command::Cancel { id, caller } => {
                dao.cancel(id, &caller, now)?;
                Ok(self.applied_events())
            }
            Command::Challenge {
                target,
                challenger,
                fee,
            } => {
                let record = dao.challenge(&target, &challenger, fee, now)?;
                dao.drain_events();
                Ok(Reply::Challenged { record })
            }
            Command::Respond {
                target,
                caller,
                success,
            } => {
                let outcome = dao.respond(&target, &caller, success)?;
                Ok(self.decided(target, outcome))
            }
            Command::Decide {
                target,
                decider,
                success,
            } => {
                let outcome = dao.decide(&target, &decider, success, now)?;
                Ok(self.decided(target, outcome))
            }
            Command::SaveSnapshot => {
                self.dao.save_snapshot(&mut self.snapshots)?;
                Ok(Reply::Applied { events: Vec::new() })
            }
            Command::RestoreSnapshot => {
                self.dao.restore_snapshot(&self.snapshots)?;
                Ok(Reply::Applied { events: Vec::new() })
            }
            Command::Query(query) => self.query(query, now).map(Reply::Value),
        }
    }

    fn decided(&mut self, target: NodeAddress, outcome: ChallengeOutcome) -> Reply {
        Reply::Decided {
            target,
            cleared: matches!(outcome, ChallengeOutcome::Cleared(_)),
            events: self.dao.drain_events(),
        }
    }

    /// Answer a query at `now`.
    pub fn query(&self, query: Query, now: Timestamp) -> Result<QueryValue, GovernanceError> {
        let dao = &self.dao;
        Ok(match query {
            Query::ProposalState { id } => QueryValue::State(dao.proposal_state(id, now)?),
            Query::VotesFor { id } => QueryValue::Count(dao.votes_for(id)?),
            Query::VotesAgainst { id } => QueryValue::Count(dao.votes_against(id)?),
            Query::StartTime { id } => QueryValue::Time(dao.start_time(id)?),
            Query::EndTime { id } => QueryValue::Time(dao.end_time(id)?),
            Query::ExpiresTime { id } => QueryValue::Time(dao.expires_time(id)?),
            Query::HasVoted { id, voter } => QueryValue::Flag(dao.has_voted(id, &voter)?),
            Query::Receipt { id, voter } => QueryValue::Receipt(dao.receipt(id, &voter)?),
            Query::ProposalCount => QueryValue::Count(dao.proposal_count()),
            Query::MemberIsValid { address } => QueryValue::Flag(dao.member_is_valid(&address)),
            Query::MemberCount => QueryValue::Count(dao.member_count() as u64),
            Query::QuorumVotesRequired => QueryValue::Count(dao.quorum_votes_required()?),
            Query::ContractAddress { name } => {
                QueryValue::Address(dao.contracts().address_of(&name).cloned())
            }
            Query::Abi { name } => {
                QueryValue::Text(dao.contracts().abi_of(&name).map(str::to_string))
            }
            Query::Setting { key } => QueryValue::Setting(dao.settings().get(&key.group, &key.path)?),
            Query::RplBalance { owner } => QueryValue::Rpl(dao.custody().balance_of(&owner)),
            Query::RplTotalSupply => QueryValue::Rpl(dao.custody().total_supply()),
            Query::ChallengeFeesHeld => QueryValue::Eth(dao.challenge_fees_held()),
        })
    }
}
