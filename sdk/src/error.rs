// Error types for guard evaluation and chain lookups

use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

/// Errors surfaced by chain lookups and guard resolution.
///
/// Payloads are owned strings so a single failure can be handed to every
/// caller sharing a cached resolution.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GuardEvalError {
    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Account not found: {0}")]
    AccountNotFound(Pubkey),

    #[error("Invalid account data: {0}")]
    InvalidAccountData(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<solana_client::client_error::ClientError> for GuardEvalError {
    fn from(err: solana_client::client_error::ClientError) -> Self {
        Self::Rpc(err.to_string())
    }
}

impl From<std::io::Error> for GuardEvalError {
    fn from(err: std::io::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for GuardEvalError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Guard evaluation result type
pub type Result<T> = std::result::Result<T, GuardEvalError>;
