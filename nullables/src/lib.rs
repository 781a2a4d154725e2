//! Nullable infrastructure for deterministic testing.
//!
//! All external collaborators (clock, settings storage, bond custody, node
//! registry) are abstracted behind traits. This crate provides test-friendly
//! implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Never touch the filesystem or network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod clock;
pub mod custody;
pub mod registry;
pub mod store;

pub use clock::NullClock;
pub use custody::NullBondCustody;
pub use registry::NullNodeRegistry;
pub use store::{NullSettingsBacking, NullSnapshotStore};
