//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use trustdao_store::{SettingKey, SettingValue};
use trustdao_types::NodeAddress;

use crate::logging::LogFormat;
use crate::NodeError;

/// A settings override as written in TOML.
///
/// TOML integers stop at `i64`, so wei-scaled amounts are written as decimal
/// strings. Strings starting with `0x` are addresses.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingOverride {
    Bool(bool),
    Int(u64),
    Text(String),
}

impl SettingOverride {
    fn to_value(&self, path: &str) -> Result<SettingValue, NodeError> {
        match self {
            Self::Bool(b) => Ok(SettingValue::Bool(*b)),
            Self::Int(n) => Ok(SettingValue::Uint(u128::from(*n))),
            Self::Text(t) if t.starts_with(NodeAddress::PREFIX) => {
                Ok(SettingValue::Address(NodeAddress::parse(t)?))
            }
            Self::Text(t) => t
                .parse::<u128>()
                .map(SettingValue::Uint)
                .map_err(|_| NodeError::Config(format!("setting {path}: '{t}' is not a uint"))),
        }
    }
}

/// Configuration for a DAO node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Guardian address allowed to act while bootstrap mode is open.
    #[serde(default = "default_guardian")]
    pub guardian: String,

    /// Log format: "human" or "json".
    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Command log replayed at startup, one JSON entry per line.
    #[serde(default)]
    pub command_log: Option<PathBuf>,

    /// Stop replaying at the first rejected command.
    #[serde(default)]
    pub stop_on_error: bool,

    /// Bounded queue depth of the actor's command channel.
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,

    /// Settings written by the guardian before any command is applied, keyed
    /// by path (`members.quorum`). The group is the first path segment.
    #[serde(default)]
    pub settings: BTreeMap<String, SettingOverride>,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_guardian() -> String {
    let mut bytes = [0u8; NodeAddress::LEN];
    bytes[NodeAddress::LEN - 1] = 1;
    NodeAddress::from_bytes(bytes).to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_queue_depth() -> usize {
    256
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &std::path::Path) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    pub fn guardian(&self) -> Result<NodeAddress, NodeError> {
        Ok(NodeAddress::parse(&self.guardian)?)
    }

    /// Resolve the `[settings]` table into typed keys and values.
    pub fn setting_overrides(&self) -> Result<Vec<(SettingKey, SettingValue)>, NodeError> {
        self.settings
            .iter()
            .map(|(path, raw)| {
                let group = path
                    .split('.')
                    .next()
                    .filter(|g| !g.is_empty() && g.len() < path.len())
                    .ok_or_else(|| NodeError::Config(format!("setting path '{path}' has no group")))?;
                Ok((SettingKey::new(group, path.as_str()), raw.to_value(path)?))
            })
            .collect()
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            guardian: default_guardian(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            command_log: None,
            stop_on_error: false,
            queue_depth: default_queue_depth(),
            settings: BTreeMap::new(),
        }
    }
}
