use thiserror::Error;
use trustdao_types::RplAmount;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key not found: {0}")]
    NotFound(String),

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CustodyError {
    #[error("insufficient allowance for {owner}: approved {approved}, need {needed}")]
    InsufficientAllowance {
        owner: String,
        approved: RplAmount,
        needed: RplAmount,
    },

    #[error("insufficient balance for {owner}: have {have}, need {needed}")]
    InsufficientBalance {
        owner: String,
        have: RplAmount,
        needed: RplAmount,
    },

    #[error("custody vault holds {held}, cannot pay out {needed}")]
    VaultShortfall { held: RplAmount, needed: RplAmount },

    #[error("custody backend error: {0}")]
    Backend(String),
}
