use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("governance error: {0}")]
    Governance(#[from] trustdao_governance::GovernanceError),

    #[error("store error: {0}")]
    Store(#[from] trustdao_store::StoreError),

    #[error("invalid address: {0}")]
    Address(#[from] trustdao_types::TypesError),

    #[error("config error: {0}")]
    Config(String),

    #[error("command log line {line}: {reason}")]
    MalformedCommand { line: usize, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("actor stopped")]
    ActorStopped,
}
