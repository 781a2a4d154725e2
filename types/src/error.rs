//! Top-level error type for parsing and arithmetic on the shared types.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypesError {
    #[error("invalid node address: {0}")]
    InvalidAddress(String),

    #[error("fraction {0} exceeds one (1e18)")]
    FractionOutOfRange(u128),

    #[error("arithmetic overflow")]
    Overflow,
}
