//! Fundamental types for the trusted-node DAO.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! node addresses, token amounts, timestamps and the 18-decimal fixed-point ratio
//! used for quorum arithmetic.

pub mod address;
pub mod amount;
pub mod error;
pub mod fixed;
pub mod time;

pub use address::NodeAddress;
pub use amount::{EthAmount, RplAmount, ETH_UNIT, RPL_UNIT};
pub use error::TypesError;
pub use fixed::Fraction;
pub use time::{Clock, SystemClock, Timestamp};
