//! Raw guard configuration as stored by the candy guard program, and group merging

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

use crate::error::Result;

/// Label used for the default guard set when no group is selected
pub const DEFAULT_GROUP_LABEL: &str = "default";

// ================================
// Individual Guards
// ================================

/// Guard that sets a specific date for the mint to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartDate {
    /// Unix timestamp (seconds)
    pub date: i64,
}

/// Guard that sets a specific date for the mint to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndDate {
    /// Unix timestamp (seconds)
    pub date: i64,
}

/// Limit of mints per wallet, tracked by a counter PDA derived from `id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MintLimit {
    pub id: u8,
    pub limit: u16,
}

/// Stops the mint once `maximum` items have been redeemed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedeemedAmount {
    pub maximum: u64,
}

/// Display hints for a token amount
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub decimals: u8,
}

/// Charges an amount in SOL (lamports).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolPayment {
    pub lamports: u64,
    #[serde(with = "crate::types::pubkey_string")]
    pub destination: Pubkey,
}

/// Charges an amount of an SPL token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPayment {
    pub amount: u64,
    #[serde(with = "crate::types::pubkey_string")]
    pub mint: Pubkey,
    #[serde(with = "crate::types::pubkey_string")]
    pub destination_ata: Pubkey,
    #[serde(default)]
    pub currency: Currency,
}

/// Burns an amount of an SPL token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBurn {
    pub amount: u64,
    #[serde(with = "crate::types::pubkey_string")]
    pub mint: Pubkey,
    #[serde(default)]
    pub currency: Currency,
}

/// Restricts minting to holders of an amount of an SPL token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenGate {
    pub amount: u64,
    #[serde(with = "crate::types::pubkey_string")]
    pub mint: Pubkey,
    #[serde(default)]
    pub currency: Currency,
}

/// Charges an NFT from a collection as payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftPayment {
    #[serde(with = "crate::types::pubkey_string")]
    pub required_collection: Pubkey,
    #[serde(with = "crate::types::pubkey_string")]
    pub destination: Pubkey,
}

/// Burns an NFT from a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftBurn {
    #[serde(with = "crate::types::pubkey_string")]
    pub required_collection: Pubkey,
}

/// Restricts minting to holders of an NFT from a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftGate {
    #[serde(with = "crate::types::pubkey_string")]
    pub required_collection: Pubkey,
}

/// Restricts minting to a single address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressGate {
    #[serde(with = "crate::types::pubkey_string")]
    pub address: Pubkey,
}

/// Restricts minting to wallets proven to be in a Merkle tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowList {
    pub merkle_root: [u8; 32],
}

/// Requires a gateway token from a gatekeeper network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gatekeeper {
    #[serde(with = "crate::types::pubkey_string")]
    pub gatekeeper_network: Pubkey,
    #[serde(default)]
    pub expire_on_use: bool,
}

// ================================
// Guard Set
// ================================

/// The set of guards configured for one group. `None` means the guard is inactive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardSet {
    pub start_date: Option<StartDate>,
    pub end_date: Option<EndDate>,
    pub mint_limit: Option<MintLimit>,
    pub redeemed_amount: Option<RedeemedAmount>,
    pub sol_payment: Option<SolPayment>,
    pub token_payment: Option<TokenPayment>,
    pub nft_payment: Option<NftPayment>,
    pub token_burn: Option<TokenBurn>,
    pub nft_burn: Option<NftBurn>,
    pub token_gate: Option<TokenGate>,
    pub nft_gate: Option<NftGate>,
    pub address_gate: Option<AddressGate>,
    pub allow_list: Option<AllowList>,
    pub gatekeeper: Option<Gatekeeper>,
}

macro_rules! overlay_fields {
    ($base:ident, $top:ident, $($field:ident),+ $(,)?) => {
        GuardSet {
            $($field: $top.$field.or($base.$field),)+
        }
    };
}

impl GuardSet {
    /// Overlay `other` on top of `self`: every guard set in `other` wins,
    /// guards absent from `other` keep their current value.
    #[must_use]
    pub fn overlay(self, other: GuardSet) -> GuardSet {
        overlay_fields!(
            self,
            other,
            start_date,
            end_date,
            mint_limit,
            redeemed_amount,
            sol_payment,
            token_payment,
            nft_payment,
            token_burn,
            nft_burn,
            token_gate,
            nft_gate,
            address_gate,
            allow_list,
            gatekeeper,
        )
    }

    /// True when no guard is configured
    pub fn is_empty(&self) -> bool {
        *self == GuardSet::default()
    }
}

/// Merge guard sets in order, later sets taking precedence field by field.
///
/// Callers pass the default set first, then increasingly specific groups.
/// An empty slice yields a set with no active guards.
pub fn merge_guards(guard_sets: &[GuardSet]) -> GuardSet {
    guard_sets
        .iter()
        .cloned()
        .fold(GuardSet::default(), GuardSet::overlay)
}

// ================================
// Guard Groups
// ================================

/// A labeled set of guards
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub label: String,
    pub guards: GuardSet,
}

/// Guard configuration of a candy guard account: a default set plus optional groups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandyGuardData {
    pub default: GuardSet,
    #[serde(default)]
    pub groups: Vec<Group>,
}

impl CandyGuardData {
    /// Parse guard data from its JSON form
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Find a group by label
    pub fn group(&self, label: &str) -> Option<&Group> {
        self.groups.iter().find(|group| group.label == label)
    }

    /// Effective guards for a group: the default set overridden by the group's guards.
    ///
    /// `None`, or a label with no matching group, resolves to the default set.
    pub fn effective_guards(&self, label: Option<&str>) -> GuardSet {
        match label.and_then(|label| self.group(label)) {
            Some(group) => merge_guards(&[self.default.clone(), group.guards.clone()]),
            None => self.default.clone(),
        }
    }

    /// Labels of all groups in declaration order
    pub fn labels(&self) -> Vec<&str> {
        self.groups.iter().map(|group| group.label.as_str()).collect()
    }
}
