//! Snapshot storage trait.

use crate::StoreError;

/// Opaque blob storage for serialized ledger snapshots.
///
/// A generic key-value store for state that is persisted as a whole rather
/// than field by field.
pub trait SnapshotStore {
    fn put_snapshot(&mut self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    fn get_snapshot(&self, key: &str) -> Result<Vec<u8>, StoreError>;
}
