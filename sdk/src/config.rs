//! SDK configuration

use anyhow::{Context, Result};
use solana_sdk::{commitment_config::CommitmentConfig, pubkey, pubkey::Pubkey};

use crate::events::DEFAULT_EVENT_BUFFER;

/// Candy Guard program on mainnet-beta and devnet
pub const CANDY_GUARD_PROGRAM_ID: Pubkey = pubkey!("Guard1JwRhJkVH6XZhzoYxeBVQe872VH6QggF4BWmS9g");

/// Token Metadata program
pub const TOKEN_METADATA_PROGRAM_ID: Pubkey = pubkey!("metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s");

#[derive(Debug, Clone)]
pub struct GuardEvalConfig {
    /// Solana RPC URL
    pub rpc_url: String,

    /// Commitment level for account reads
    pub commitment: CommitmentConfig,

    /// Program owning the candy guard and its mint limit counters
    pub candy_guard_program_id: Pubkey,

    /// Program owning token metadata accounts
    pub token_metadata_program_id: Pubkey,

    /// Capacity of the guard event broadcast buffer
    pub event_buffer: usize,
}

impl Default for GuardEvalConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://api.mainnet-beta.solana.com".to_string(),
            commitment: CommitmentConfig::confirmed(),
            candy_guard_program_id: CANDY_GUARD_PROGRAM_ID,
            token_metadata_program_id: TOKEN_METADATA_PROGRAM_ID,
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

impl GuardEvalConfig {
    /// Load configuration from the environment, falling back to defaults
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let commitment = match std::env::var("COMMITMENT") {
            Ok(level) => level
                .parse::<CommitmentConfig>()
                .map_err(|e| anyhow::anyhow!("{:?}", e))
                .context("Invalid COMMITMENT")?,
            Err(_) => defaults.commitment,
        };

        Ok(GuardEvalConfig {
            rpc_url: std::env::var("RPC_URL").unwrap_or(defaults.rpc_url),

            commitment,

            candy_guard_program_id: match std::env::var("CANDY_GUARD_PROGRAM_ID") {
                Ok(id) => id.parse().context("Invalid CANDY_GUARD_PROGRAM_ID")?,
                Err(_) => defaults.candy_guard_program_id,
            },

            token_metadata_program_id: match std::env::var("TOKEN_METADATA_PROGRAM_ID") {
                Ok(id) => id.parse().context("Invalid TOKEN_METADATA_PROGRAM_ID")?,
                Err(_) => defaults.token_metadata_program_id,
            },

            event_buffer: std::env::var("EVENT_BUFFER")
                .unwrap_or_else(|_| defaults.event_buffer.to_string())
                .parse()
                .context("Invalid EVENT_BUFFER")?,
        })
    }
}
