//! Error types for CitizenChain

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    // Citizen registry
    #[error("Citizen already registered: {0}")]
    AlreadyRegistered(String),
    #[error("Not authorized: {0}")]
    NotAuthorized(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Citizen already processed: {0}")]
    AlreadyProcessed(String),

    // Election system
    #[error("An election is already in progress")]
    ElectionInProgress,
    #[error("No active election")]
    NoActiveElection,
    #[error("Not an approved citizen: {0}")]
    NotApprovedCitizen(String),
    #[error("Citizen has already voted: {0}")]
    AlreadyVoted(String),
    #[error("Invalid candidate: {0}")]
    InvalidCandidate(String),
    #[error("Already registered as a candidate: {0}")]
    AlreadyCandidate(String),

    // Pool and chain
    #[error("Duplicate transaction: {0}")]
    DuplicateTransaction(String),
    #[error("Blockchain not initialized")]
    EmptyChain,
    #[error("Failed to add {0} transaction to pool")]
    PoolInsertFailed(String),
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),
    #[error("Invalid block: {0}")]
    InvalidBlock(String),

    // Ambient
    #[error("Cryptographic error: {0}")]
    CryptoError(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(String),
}

impl ChainError {
    /// Stable, machine-readable name of the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ChainError::AlreadyRegistered(_) => "ALREADY_REGISTERED",
            ChainError::NotAuthorized(_) => "NOT_AUTHORIZED",
            ChainError::NotFound(_) => "NOT_FOUND",
            ChainError::AlreadyProcessed(_) => "ALREADY_PROCESSED",
            ChainError::ElectionInProgress => "ELECTION_IN_PROGRESS",
            ChainError::NoActiveElection => "NO_ACTIVE_ELECTION",
            ChainError::NotApprovedCitizen(_) => "NOT_APPROVED_CITIZEN",
            ChainError::AlreadyVoted(_) => "ALREADY_VOTED",
            ChainError::InvalidCandidate(_) => "INVALID_CANDIDATE",
            ChainError::AlreadyCandidate(_) => "ALREADY_CANDIDATE",
            ChainError::DuplicateTransaction(_) => "DUPLICATE_TRANSACTION",
            ChainError::EmptyChain => "EMPTY_CHAIN",
            ChainError::PoolInsertFailed(_) => "POOL_INSERT_FAILED",
            ChainError::InvalidTransaction(_) => "INVALID_TRANSACTION",
            ChainError::InvalidBlock(_) => "INVALID_BLOCK",
            ChainError::CryptoError(_) => "CRYPTO_ERROR",
            ChainError::Config(_) => "CONFIG_ERROR",
            ChainError::Io(_) => "IO_ERROR",
        }
    }

    /// Internal-invariant violations, as opposed to rejected user input.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            ChainError::PoolInsertFailed(_) | ChainError::EmptyChain | ChainError::Io(_)
        )
    }
}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::Io(err.to_string())
    }
}

impl From<toml::de::Error> for ChainError {
    fn from(err: toml::de::Error) -> Self {
        ChainError::Config(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_kind() {
        let err = ChainError::AlreadyVoted("abc".to_string());
        assert_eq!(err.to_string(), "Citizen has already voted: abc");
        assert_eq!(err.kind(), "ALREADY_VOTED");
        assert!(!err.is_internal());
        assert!(ChainError::PoolInsertFailed("vote".to_string()).is_internal());
    }
}
