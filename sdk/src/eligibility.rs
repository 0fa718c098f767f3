//! Mint eligibility flags for a wallet against a parsed guard group

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::parsed::{MintLimitState, ParsedGuardGroup, Requirement};
use crate::types::WalletState;

/// Independent eligibility flags. Combining them is up to the caller;
/// [`GuardStates::can_mint`] is the usual conjunction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardStates {
    pub is_started: bool,
    pub is_ended: bool,
    pub is_limit_reached: bool,
    pub is_payment_available: bool,
    pub is_wallet_whitelisted: bool,
    pub has_gatekeeper: bool,
}

impl Default for GuardStates {
    fn default() -> Self {
        Self {
            is_started: true,
            is_ended: false,
            is_limit_reached: false,
            is_payment_available: true,
            is_wallet_whitelisted: true,
            has_gatekeeper: false,
        }
    }
}

impl GuardStates {
    /// Started, not ended, under the limit, affordable and allowed.
    ///
    /// A gatekeeper does not block by itself; it only signals that a gateway
    /// token is needed at mint time.
    pub fn can_mint(&self) -> bool {
        self.is_started
            && !self.is_ended
            && !self.is_limit_reached
            && self.is_payment_available
            && self.is_wallet_whitelisted
    }
}

/// Evaluate every guard of `guards` for `wallet` at instant `now`.
pub fn parse_guard_states(
    guards: &ParsedGuardGroup,
    wallet: &WalletState,
    items_minted: u64,
    now: DateTime<Utc>,
) -> GuardStates {
    let mint_limit_reached = guards
        .mint_limit
        .as_ref()
        .is_some_and(is_mint_limit_reached);
    let redeem_limit_reached = guards
        .redeem_limit
        .is_some_and(|maximum| items_minted >= maximum);

    GuardStates {
        is_started: guards.start_time.map_or(true, |start| start <= now),
        is_ended: guards.end_time.is_some_and(|end| end < now),
        is_limit_reached: mint_limit_reached || redeem_limit_reached,
        is_payment_available: guards
            .requirements()
            .into_iter()
            .flatten()
            .all(|requirement| is_requirement_met(requirement, wallet)),
        is_wallet_whitelisted: guards
            .allowed
            .as_ref()
            .map_or(true, |allowed| allowed.contains(&wallet.address)),
        has_gatekeeper: guards.gatekeeper_network.is_some(),
    }
}

/// Reached once the wallet's counter has met the limit. An unresolved
/// counter never counts as reached.
pub fn is_mint_limit_reached(mint_limit: &MintLimitState) -> bool {
    mint_limit
        .count()
        .is_some_and(|count| count >= mint_limit.settings.limit)
}

/// Whether the wallet can satisfy one payment, burn or gate requirement
pub fn is_requirement_met(requirement: &Requirement, wallet: &WalletState) -> bool {
    match requirement {
        Requirement::Sol(sol) => wallet.lamports >= sol.amount,
        Requirement::Token(token) => wallet
            .token_balance(&token.mint)
            .is_some_and(|balance| balance >= token.amount),
        Requirement::Nfts(nfts) => !nfts.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guards::MintLimit;
    use crate::parsed::{SolRequirement, TokenRequirement};
    use crate::types::{MintCounter, TokenHolding};
    use chrono::Duration;
    use solana_sdk::pubkey::Pubkey;

    const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

    fn wallet(lamports: u64) -> WalletState {
        WalletState {
            address: Pubkey::new_unique(),
            lamports,
            token_holdings: vec![],
            nft_holdings: vec![],
        }
    }

    fn mint_limit(limit: u16, count: Option<u16>) -> ParsedGuardGroup {
        ParsedGuardGroup {
            mint_limit: Some(MintLimitState {
                settings: MintLimit { id: 1, limit },
                pda: Some(Pubkey::new_unique()),
                mint_counter: count.map(|count| MintCounter { count }),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_no_guards_defaults() {
        let states = parse_guard_states(&ParsedGuardGroup::default(), &wallet(0), 0, Utc::now());
        assert_eq!(states, GuardStates::default());
        assert!(states.can_mint());
    }

    #[test]
    fn test_start_and_end_times() {
        let now = Utc::now();
        let guards = ParsedGuardGroup {
            start_time: Some(now + Duration::hours(1)),
            end_time: Some(now - Duration::seconds(1)),
            ..Default::default()
        };

        let states = parse_guard_states(&guards, &wallet(0), 0, now);
        assert!(!states.is_started);
        assert!(states.is_ended);
        assert!(!states.can_mint());

        let later = parse_guard_states(&guards, &wallet(0), 0, now + Duration::hours(2));
        assert!(later.is_started);
    }

    #[test]
    fn test_mint_limit() {
        let now = Utc::now();
        assert!(parse_guard_states(&mint_limit(5, Some(5)), &wallet(0), 0, now).is_limit_reached);
        assert!(parse_guard_states(&mint_limit(5, Some(6)), &wallet(0), 0, now).is_limit_reached);
        assert!(!parse_guard_states(&mint_limit(5, Some(4)), &wallet(0), 0, now).is_limit_reached);
        assert!(!parse_guard_states(&mint_limit(5, None), &wallet(0), 0, now).is_limit_reached);
    }

    #[test]
    fn test_redeem_limit() {
        let guards = ParsedGuardGroup {
            redeem_limit: Some(100),
            ..Default::default()
        };
        let now = Utc::now();

        assert!(parse_guard_states(&guards, &wallet(0), 100, now).is_limit_reached);
        assert!(!parse_guard_states(&guards, &wallet(0), 99, now).is_limit_reached);
    }

    #[test]
    fn test_sol_payment_balance() {
        let guards = ParsedGuardGroup {
            payment: Some(Requirement::Sol(SolRequirement::new(LAMPORTS_PER_SOL))),
            ..Default::default()
        };
        let now = Utc::now();

        assert!(!parse_guard_states(&guards, &wallet(LAMPORTS_PER_SOL / 2), 0, now).is_payment_available);
        assert!(parse_guard_states(&guards, &wallet(2 * LAMPORTS_PER_SOL), 0, now).is_payment_available);
    }

    #[test]
    fn test_payment_checks_are_anded_across_categories() {
        let mint = Pubkey::new_unique();
        let guards = ParsedGuardGroup {
            payment: Some(Requirement::Sol(SolRequirement::new(10))),
            gate: Some(Requirement::Token(TokenRequirement {
                mint,
                symbol: None,
                decimals: 0,
                amount: 5,
            })),
            allowed: Some(vec![]),
            ..Default::default()
        };
        let now = Utc::now();

        let mut holder = wallet(100);
        let states = parse_guard_states(&guards, &holder, 0, now);
        assert!(!states.is_payment_available);
        // A failing payment does not short-circuit the allow-list check
        assert!(!states.is_wallet_whitelisted);

        holder.token_holdings.push(TokenHolding { mint, balance: 5 });
        assert!(parse_guard_states(&guards, &holder, 0, now).is_payment_available);
    }

    #[test]
    fn test_nft_burn_requires_holding() {
        let guards = ParsedGuardGroup {
            burn: Some(Requirement::Nfts(vec![])),
            ..Default::default()
        };

        assert!(!parse_guard_states(&guards, &wallet(0), 0, Utc::now()).is_payment_available);
    }

    #[test]
    fn test_allow_list_membership() {
        let member = wallet(0);
        let guards = ParsedGuardGroup {
            allowed: Some(vec![Pubkey::new_unique(), member.address]),
            gatekeeper_network: Some(Pubkey::new_unique()),
            ..Default::default()
        };
        let now = Utc::now();

        let states = parse_guard_states(&guards, &member, 0, now);
        assert!(states.is_wallet_whitelisted);
        assert!(states.has_gatekeeper);

        assert!(!parse_guard_states(&guards, &wallet(0), 0, now).is_wallet_whitelisted);
    }
}
