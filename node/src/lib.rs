//! Trusted-node DAO node.
//!
//! Wires one governance domain to in-memory collaborators and applies a
//! strictly ordered command log to it, either in a batch ([`DaoNode::replay`])
//! or through the single-writer actor ([`spawn_actor`]).

pub mod actor;
pub mod command;
pub mod config;
pub mod error;
pub mod logging;
pub mod node;

pub use actor::{spawn_actor, DaoHandle};
pub use command::{Command, CommandLog, LogEntry, Query};
pub use config::{NodeConfig, SettingOverride};
pub use error::NodeError;
pub use logging::{init_logging, LogFormat};
pub use node::{DaoNode, MemoryDao, QueryValue, Reply};
