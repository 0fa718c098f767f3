//! Normalized guard group produced by the normalizer and consumed by pricing and eligibility

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

use crate::guards::MintLimit;
use crate::types::{MintCounter, NftMetadata};

/// Decimal places of SOL amounts expressed in lamports
pub const SOL_DECIMALS: u8 = 9;

/// SOL amount in lamports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolRequirement {
    pub amount: u64,
    pub decimals: u8,
}

impl SolRequirement {
    pub fn new(amount: u64) -> Self {
        Self {
            amount,
            decimals: SOL_DECIMALS,
        }
    }
}

/// SPL token amount in the token's smallest unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRequirement {
    pub mint: Pubkey,
    pub symbol: Option<String>,
    pub decimals: u8,
    pub amount: u64,
}

/// What one category (payment, burn or gate) requires from the wallet.
///
/// The candy guard program allows a single guard kind per category, so the
/// variants are exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Requirement {
    Sol(SolRequirement),
    Token(TokenRequirement),
    /// Held NFTs matching the required collection, possibly empty
    Nfts(Vec<NftMetadata>),
}

impl Requirement {
    pub fn as_token(&self) -> Option<&TokenRequirement> {
        match self {
            Requirement::Token(token) => Some(token),
            _ => None,
        }
    }

    pub fn as_token_mut(&mut self) -> Option<&mut TokenRequirement> {
        match self {
            Requirement::Token(token) => Some(token),
            _ => None,
        }
    }
}

/// Mint limit settings with the wallet's on-chain counter, once resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintLimitState {
    pub settings: MintLimit,
    /// Counter PDA for this wallet
    pub pda: Option<Pubkey>,
    /// `None` until resolved, or when the wallet has never minted
    pub mint_counter: Option<MintCounter>,
}

impl MintLimitState {
    pub fn unresolved(settings: MintLimit) -> Self {
        Self {
            settings,
            pda: None,
            mint_counter: None,
        }
    }

    /// Mints recorded for the wallet, if known
    pub fn count(&self) -> Option<u16> {
        self.mint_counter.map(|counter| counter.count)
    }
}

/// Guards of one group in evaluation-ready form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedGuardGroup {
    /// Present only while the start date is still in the future
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub mint_limit: Option<MintLimitState>,
    pub redeem_limit: Option<u64>,
    pub payment: Option<Requirement>,
    pub burn: Option<Requirement>,
    pub gate: Option<Requirement>,
    /// Present when an address gate or allow list is configured
    pub allowed: Option<Vec<Pubkey>>,
    pub gatekeeper_network: Option<Pubkey>,
}

impl ParsedGuardGroup {
    /// Payment, burn and gate requirements in evaluation order
    pub fn requirements(&self) -> [Option<&Requirement>; 3] {
        [self.payment.as_ref(), self.burn.as_ref(), self.gate.as_ref()]
    }
}
