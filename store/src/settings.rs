//! Settings persistence trait.

use crate::StoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use trustdao_types::NodeAddress;

/// Location of a setting: a named group and a dotted path within it.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SettingKey {
    pub group: String,
    pub path: String,
}

impl SettingKey {
    pub fn new(group: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            path: path.into(),
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.group, self.path)
    }
}

/// A typed setting value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettingValue {
    Uint(u128),
    Bool(bool),
    Address(NodeAddress),
}

impl SettingValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Uint(_) => "uint",
            Self::Bool(_) => "bool",
            Self::Address(_) => "address",
        }
    }
}

/// Durable key/value persistence for settings, keyed by `(group, path)`.
pub trait SettingsBacking {
    /// Read a value; `Ok(None)` if the key was never written.
    fn get(&self, key: &SettingKey) -> Result<Option<SettingValue>, StoreError>;

    /// Write a value, replacing any previous one.
    fn put(&mut self, key: &SettingKey, value: SettingValue) -> Result<(), StoreError>;
}
