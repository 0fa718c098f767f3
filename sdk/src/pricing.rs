//! Flatten a parsed guard group into display-ready prices

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

use crate::parsed::{ParsedGuardGroup, Requirement};

/// Kind of asset a price is denominated in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentKind {
    Sol,
    Token,
    Nft,
}

/// One required payment, burn or gate in human units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceEntry {
    pub label: String,
    pub price: f64,
    pub kind: PaymentKind,
    pub mint: Option<Pubkey>,
    pub decimals: Option<u8>,
}

/// Prices per category
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedPrices {
    pub payment: Vec<PriceEntry>,
    pub burn: Vec<PriceEntry>,
    pub gate: Vec<PriceEntry>,
}

impl ParsedPrices {
    pub fn is_empty(&self) -> bool {
        self.payment.is_empty() && self.burn.is_empty() && self.gate.is_empty()
    }
}

/// Convert a raw amount to human units
pub fn to_ui_amount(amount: u64, decimals: u8) -> f64 {
    amount as f64 / 10f64.powi(i32::from(decimals))
}

/// Project a parsed guard group onto UI prices.
///
/// An NFT requirement becomes a single entry priced at one item of the
/// required collection, and only when the wallet holds at least one.
pub fn guard_to_prices(guards: &ParsedGuardGroup) -> ParsedPrices {
    ParsedPrices {
        payment: entries(guards.payment.as_ref()),
        burn: entries(guards.burn.as_ref()),
        gate: entries(guards.gate.as_ref()),
    }
}

fn entries(requirement: Option<&Requirement>) -> Vec<PriceEntry> {
    let Some(requirement) = requirement else {
        return Vec::new();
    };

    match requirement {
        Requirement::Sol(sol) => vec![PriceEntry {
            label: "SOL".to_string(),
            price: to_ui_amount(sol.amount, sol.decimals),
            kind: PaymentKind::Sol,
            mint: None,
            decimals: Some(sol.decimals),
        }],
        Requirement::Token(token) => vec![PriceEntry {
            label: token
                .symbol
                .clone()
                .filter(|symbol| !symbol.is_empty())
                .unwrap_or_else(|| "Token".to_string()),
            price: to_ui_amount(token.amount, token.decimals),
            kind: PaymentKind::Token,
            mint: Some(token.mint),
            decimals: Some(token.decimals),
        }],
        Requirement::Nfts(nfts) => nfts
            .first()
            .map(|nft| PriceEntry {
                label: if nft.symbol.is_empty() {
                    "NFT".to_string()
                } else {
                    nft.symbol.clone()
                },
                price: 1.0,
                kind: PaymentKind::Nft,
                mint: nft.collection.map(|collection| collection.address),
                decimals: None,
            })
            .into_iter()
            .collect(),
    }
}
