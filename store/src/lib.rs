//! Abstract storage and collaborator traits for the trusted-node DAO.
//!
//! Every backend (durable, remote, in-memory for testing) implements these
//! traits. The governance core depends only on the traits.

pub mod custody;
pub mod error;
pub mod registry;
pub mod settings;
pub mod snapshot;

pub use custody::{BondCustody, BondOp};
pub use error::{CustodyError, StoreError};
pub use registry::NodeRegistry;
pub use settings::{SettingKey, SettingValue, SettingsBacking};
pub use snapshot::SnapshotStore;
