//! Serialized commands and queries, and the ordered log they are replayed from.
//!
//! One [`LogEntry`] per line, JSON encoded:
//!
//! ```text
//! {"at": 100, "command": {"vote": {"id": 1, "voter": "0x..", "support": true}}}
//! ```
//!
//! Entries without `at` are stamped from the node's clock when applied.

use serde::{Deserialize, Serialize};
use std::path::Path;

use trustdao_governance::{ContractChange, ProposalPayload};
use trustdao_store::{SettingKey, SettingValue};
use trustdao_types::{EthAmount, NodeAddress, RplAmount};

use crate::NodeError;

/// Every write the DAO accepts, plus collaborator setup for the in-memory
/// registry and custody.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    RegisterNode {
        node: NodeAddress,
    },
    MintRpl {
        to: NodeAddress,
        amount: RplAmount,
    },
    ApproveRpl {
        owner: NodeAddress,
        amount: RplAmount,
    },
    BootstrapMember {
        caller: NodeAddress,
        id: String,
        email: String,
        node: NodeAddress,
    },
    BootstrapSetting {
        caller: NodeAddress,
        key: SettingKey,
        value: SettingValue,
    },
    BootstrapUpgrade {
        caller: NodeAddress,
        change: ContractChange,
    },
    BootstrapDisable {
        caller: NodeAddress,
    },
    EmergencyJoin {
        caller: NodeAddress,
        id: String,
        email: String,
    },
    Propose {
        proposer: NodeAddress,
        message: String,
        payload: ProposalPayload,
    },
    Vote {
        id: u64,
        voter: NodeAddress,
        support: bool,
    },
    Execute {
        id: u64,
        caller: NodeAddress,
    },
    Cancel {
        id: u64,
        caller: NodeAddress,
    },
    Challenge {
        target: NodeAddress,
        challenger: NodeAddress,
        #[serde(default)]
        fee: EthAmount,
    },
    Respond {
        target: NodeAddress,
        caller: NodeAddress,
        success: bool,
    },
    Decide {
        target: NodeAddress,
        decider: NodeAddress,
        success: bool,
    },
    SaveSnapshot,
    RestoreSnapshot,
    Query(Query),
}

impl Command {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RegisterNode { .. } => "register_node",
            Self::MintRpl { .. } => "mint_rpl",
            Self::ApproveRpl { .. } => "approve_rpl",
            Self::BootstrapMember { .. } => "bootstrap_member",
            Self::BootstrapSetting { .. } => "bootstrap_setting",
            Self::BootstrapUpgrade { .. } => "bootstrap_upgrade",
            Self::BootstrapDisable { .. } => "bootstrap_disable",
            Self::EmergencyJoin { .. } => "emergency_join",
            Self::Propose { .. } => "propose",
            Self::Vote { .. } => "vote",
            Self::Execute { .. } => "execute",
            Self::Cancel { .. } => "cancel",
            Self::Challenge { .. } => "challenge",
            Self::Respond { .. } => "respond",
            Self::Decide { .. } => "decide",
            Self::SaveSnapshot => "save_snapshot",
            Self::RestoreSnapshot => "restore_snapshot",
            Self::Query(_) => "query",
        }
    }
}

/// Read-only questions answered against the state at the entry's time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Query {
    ProposalState { id: u64 },
    VotesFor { id: u64 },
    VotesAgainst { id: u64 },
    StartTime { id: u64 },
    EndTime { id: u64 },
    ExpiresTime { id: u64 },
    HasVoted { id: u64, voter: NodeAddress },
    Receipt { id: u64, voter: NodeAddress },
    ProposalCount,
    MemberIsValid { address: NodeAddress },
    MemberCount,
    QuorumVotesRequired,
    ContractAddress { name: String },
    Abi { name: String },
    Setting { key: SettingKey },
    RplBalance { owner: NodeAddress },
    RplTotalSupply,
    ChallengeFeesHeld,
}

/// One line of the command log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Seconds; `None` means "now" by the node's clock.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at: Option<u64>,
    pub command: Command,
}

impl LogEntry {
    pub fn at(at: u64, command: Command) -> Self {
        Self {
            at: Some(at),
            command,
        }
    }

    pub fn now(command: Command) -> Self {
        Self { at: None, command }
    }
}

/// An ordered sequence of log entries.
#[derive(Clone, Debug, Default)]
pub struct CommandLog {
    entries: Vec<LogEntry>,
}

impl CommandLog {
    pub fn new(entries: Vec<LogEntry>) -> Self {
        Self { entries }
    }

    /// Parse JSON lines. Blank lines and lines starting with `#` are skipped.
    pub fn parse(text: &str) -> Result<Self, NodeError> {
        let mut entries = Vec::new();
        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let entry = serde_json::from_str(line).map_err(|e| NodeError::MalformedCommand {
                line: index + 1,
                reason: e.to_string(),
            })?;
            entries.push(entry);
        }
        Ok(Self { entries })
    }

    pub fn from_file(path: &Path) -> Result<Self, NodeError> {
        Self::parse(&std::fs::read_to_string(path)?)
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn push(&mut self, entry: LogEntry) {
        self.entries.push(entry);
    }

    /// Encode back to JSON lines.
    pub fn to_json_lines(&self) -> Result<String, NodeError> {
        let mut out = String::new();
        for entry in &self.entries {
            let line = serde_json::to_string(entry)
                .map_err(|e| NodeError::Config(format!("encode command: {e}")))?;
            out.push_str(&line);
            out.push('\n');
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: &str = "0x00000000000000000000000000000000000000a1";

    #[test]
    fn parses_lines_and_skips_comments() {
        let text = format!(
            "# setup\n\
             {{\"at\": 5, \"command\": {{\"register_node\": {{\"node\": \"{ALICE}\"}}}}}}\n\
             \n\
             {{\"command\": {{\"query\": \"member_count\"}}}}\n\
             {{\"at\": 9, \"command\": \"save_snapshot\"}}\n"
        );
        let log = CommandLog::parse(&text).unwrap();
        assert_eq!(log.len(), 3);
        assert_eq!(log.entries()[0].at, Some(5));
        assert_eq!(log.entries()[0].command.name(), "register_node");
        assert_eq!(log.entries()[1].command, Command::Query(Query::MemberCount));
        assert_eq!(log.entries()[2].command, Command::SaveSnapshot);
    }

    #[test]
    fn reports_the_offending_line() {
        let text = "{\"command\": \"save_snapshot\"}\n{\"command\": {\"vote\": {}}}\n";
        match CommandLog::parse(text) {
            Err(NodeError::MalformedCommand { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected malformed command, got {other:?}"),
        }
    }

    #[test]
    fn rejects_malformed_addresses() {
        let text = "{\"command\": {\"register_node\": {\"node\": \"0x1234\"}}}";
        assert!(CommandLog::parse(text).is_err());
    }

    #[test]
    fn json_lines_reparse() {
        let alice = NodeAddress::parse(ALICE).unwrap();
        let mut log = CommandLog::default();
        log.push(LogEntry::at(
            1,
            Command::MintRpl {
                to: alice.clone(),
                amount: RplAmount::whole(1750),
            },
        ));
        log.push(LogEntry::now(Command::Challenge {
            target: alice,
            challenger: NodeAddress::zero(),
            fee: EthAmount::whole(1),
        }));
        let text = log.to_json_lines().unwrap();
        let back = CommandLog::parse(&text).unwrap();
        assert_eq!(back.entries(), log.entries());
    }
}
