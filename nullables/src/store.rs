//! Nullable stores: in-memory settings and snapshot storage for testing.

use std::collections::HashMap;
use trustdao_store::{SettingKey, SettingValue, SettingsBacking, SnapshotStore, StoreError};

/// An in-memory settings backing.
#[derive(Debug, Default)]
pub struct NullSettingsBacking {
    values: HashMap<SettingKey, SettingValue>,
    fail_writes: bool,
}

impl NullSettingsBacking {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `put` fail with a backend error.
    pub fn fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl SettingsBacking for NullSettingsBacking {
    fn get(&self, key: &SettingKey) -> Result<Option<SettingValue>, StoreError> {
        Ok(self.values.get(key).cloned())
    }

    fn put(&mut self, key: &SettingKey, value: SettingValue) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::Backend(format!("write to {key} refused")));
        }
        self.values.insert(key.clone(), value);
        Ok(())
    }
}

/// An in-memory snapshot store.
#[derive(Debug, Default)]
pub struct NullSnapshotStore {
    blobs: HashMap<String, Vec<u8>>,
}

impl NullSnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for NullSnapshotStore {
    fn put_snapshot(&mut self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.blobs.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get_snapshot(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        self.blobs
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }
}
