//! Common types describing wallet holdings and on-chain state used during evaluation

use borsh::BorshDeserialize;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

use crate::error::{GuardEvalError, Result};

/// Length of the Anchor account discriminator preceding account data
pub const ACCOUNT_DISCRIMINATOR_LEN: usize = 8;

/// Collection reference carried by NFT metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    #[serde(with = "pubkey_string")]
    pub address: Pubkey,
    #[serde(default)]
    pub verified: bool,
}

/// Metadata of an NFT held by the wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftMetadata {
    #[serde(with = "pubkey_string")]
    pub mint: Pubkey,
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub collection: Option<Collection>,
}

impl NftMetadata {
    /// True when this NFT belongs to `collection`
    pub fn is_in_collection(&self, collection: &Pubkey) -> bool {
        self.collection
            .as_ref()
            .is_some_and(|c| c.address == *collection)
    }
}

/// Token account balance held by the wallet, in the token's smallest unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenHolding {
    #[serde(with = "pubkey_string")]
    pub mint: Pubkey,
    pub balance: u64,
}

/// Mint metadata resolved from chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub symbol: Option<String>,
    pub decimals: u8,
}

/// Per-wallet mint counter stored in the mint limit PDA
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, BorshDeserialize, Serialize, Deserialize)]
pub struct MintCounter {
    pub count: u16,
}

impl MintCounter {
    /// Decode counter account data (discriminator followed by the borsh payload)
    pub fn try_from_account_data(data: &[u8]) -> Result<Self> {
        let payload = data.get(ACCOUNT_DISCRIMINATOR_LEN..).ok_or_else(|| {
            GuardEvalError::InvalidAccountData(format!(
                "mint counter account too short: {} bytes",
                data.len()
            ))
        })?;
        let mut payload = payload;
        Ok(<Self as BorshDeserialize>::deserialize(&mut payload)?)
    }
}

/// The parts of a candy machine the evaluator needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandyMachineState {
    #[serde(with = "pubkey_string")]
    pub address: Pubkey,
    #[serde(with = "pubkey_string")]
    pub candy_guard: Pubkey,
    pub items_minted: u64,
    pub items_available: u64,
}

/// Wallet balances observed at evaluation time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletState {
    #[serde(with = "pubkey_string")]
    pub address: Pubkey,
    /// SOL balance in lamports
    pub lamports: u64,
    #[serde(default)]
    pub token_holdings: Vec<TokenHolding>,
    #[serde(default)]
    pub nft_holdings: Vec<NftMetadata>,
}

impl WalletState {
    /// Balance of `mint`, if the wallet holds a token account for it
    pub fn token_balance(&self, mint: &Pubkey) -> Option<u64> {
        self.token_holdings
            .iter()
            .find(|holding| holding.mint == *mint)
            .map(|holding| holding.balance)
    }
}

// Base58 string encoding for pubkeys in JSON
pub(crate) mod pubkey_string {
    use serde::{Deserialize, Deserializer, Serializer};
    use solana_sdk::pubkey::Pubkey;
    use std::str::FromStr;

    pub fn serialize<S>(pubkey: &Pubkey, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(pubkey)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Pubkey, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Pubkey::from_str(&s).map_err(|e| serde::de::Error::custom(format!("Invalid pubkey {}: {}", s, e)))
    }
}
