//! Turn a raw guard set into a [`ParsedGuardGroup`], resolving chain lookups
//!
//! Every field is handled independently. Chain lookups (mint limit counters,
//! token symbol and decimals) go through the shared [`GuardCaches`] and run
//! concurrently; the parsed group is returned only after all of them finish.
//! A failed lookup leaves its field unresolved instead of failing the group.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::allow_list::ProofVerifier;
use crate::cache::{mint_limit_key, token_info_key, GuardCaches};
use crate::chain::ChainAccessor;
use crate::events::{GuardEvent, GuardEventStream};
use crate::guards::{GuardSet, MintLimit, TokenBurn, TokenGate, TokenPayment, DEFAULT_GROUP_LABEL};
use crate::parsed::{
    MintLimitState, ParsedGuardGroup, Requirement, SolRequirement, TokenRequirement,
};
use crate::types::{CandyMachineState, MintCounter, NftMetadata, TokenInfo};

/// Everything the normalizer needs to know about one group evaluation
#[derive(Debug, Clone, Copy)]
pub struct GroupContext<'a> {
    pub guards: &'a GuardSet,
    /// Group label; `None` for the default group
    pub label: Option<&'a str>,
    pub candy_machine: &'a CandyMachineState,
    pub wallet: &'a Pubkey,
    pub nft_holdings: &'a [NftMetadata],
    pub now: DateTime<Utc>,
}

impl GroupContext<'_> {
    /// Label passed to the proof verifier
    pub fn label_or_default(&self) -> &str {
        self.label.unwrap_or(DEFAULT_GROUP_LABEL)
    }
}

/// Convert stored epoch seconds to a timestamp
pub fn timestamp(seconds: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(seconds, 0)
}

pub struct GuardNormalizer {
    chain: Option<Arc<dyn ChainAccessor>>,
    caches: Arc<GuardCaches>,
    events: Option<Arc<GuardEventStream>>,
}

impl GuardNormalizer {
    /// Normalizer without chain access: mint limit counters stay unresolved
    /// and token amounts keep the decimals found in the guard config.
    pub fn new(caches: Arc<GuardCaches>) -> Self {
        Self {
            chain: None,
            caches,
            events: None,
        }
    }

    #[must_use]
    pub fn with_chain(mut self, chain: Arc<dyn ChainAccessor>) -> Self {
        self.chain = Some(chain);
        self
    }

    #[must_use]
    pub fn with_events(mut self, events: Arc<GuardEventStream>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn caches(&self) -> &Arc<GuardCaches> {
        &self.caches
    }

    /// Parse the guards of one group
    pub async fn parse_guard_group(
        &self,
        ctx: &GroupContext<'_>,
        verifier: &dyn ProofVerifier,
    ) -> ParsedGuardGroup {
        let guards = ctx.guards;
        let mut parsed = ParsedGuardGroup::default();

        // A start date already in the past no longer gates minting
        if let Some(start) = guards.start_date {
            parsed.start_time = timestamp(start.date).filter(|start| *start > ctx.now);
        }
        if let Some(end) = guards.end_date {
            parsed.end_time = timestamp(end.date);
        }

        parsed.mint_limit = guards.mint_limit.map(MintLimitState::unresolved);
        parsed.redeem_limit = guards.redeemed_amount.map(|redeemed| redeemed.maximum);

        parsed.payment = guards
            .nft_payment
            .map(|nft| Requirement::Nfts(matching_nfts(ctx.nft_holdings, &nft.required_collection)))
            .or_else(|| guards.token_payment.as_ref().map(token_payment))
            .or_else(|| {
                guards
                    .sol_payment
                    .map(|sol| Requirement::Sol(SolRequirement::new(sol.lamports)))
            });

        parsed.burn = guards
            .nft_burn
            .map(|nft| Requirement::Nfts(matching_nfts(ctx.nft_holdings, &nft.required_collection)))
            .or_else(|| guards.token_burn.as_ref().map(token_burn));

        parsed.gate = guards
            .nft_gate
            .map(|nft| Requirement::Nfts(matching_nfts(ctx.nft_holdings, &nft.required_collection)))
            .or_else(|| guards.token_gate.as_ref().map(token_gate));

        if guards.address_gate.is_some() || guards.allow_list.is_some() {
            let mut allowed = Vec::new();
            if let Some(gate) = guards.address_gate {
                allowed.push(gate.address);
            }
            if let Some(allow_list) = guards.allow_list {
                if verifier.verify(&allow_list.merkle_root, ctx.label_or_default()) {
                    allowed.push(*ctx.wallet);
                }
            }
            parsed.allowed = Some(allowed);
        }

        parsed.gatekeeper_network = guards.gatekeeper.map(|gatekeeper| gatekeeper.gatekeeper_network);

        if self.chain.is_some() {
            self.resolve(ctx, &mut parsed).await;
        }

        parsed
    }

    // Await the mint limit counter and every token refinement together
    async fn resolve(&self, ctx: &GroupContext<'_>, parsed: &mut ParsedGuardGroup) {
        let token_mints: Vec<Pubkey> = parsed
            .requirements()
            .into_iter()
            .flatten()
            .filter_map(Requirement::as_token)
            .map(|token| token.mint)
            .collect();

        let mint_limit = async {
            match ctx.guards.mint_limit {
                Some(settings) => Some(self.resolve_mint_limit(settings, ctx).await),
                None => None,
            }
        };
        let token_infos = join_all(token_mints.iter().map(|mint| self.resolve_token_info(mint)));

        let (mint_limit, token_infos) = futures::join!(mint_limit, token_infos);

        if mint_limit.is_some() {
            parsed.mint_limit = mint_limit;
        }

        let tokens = [&mut parsed.payment, &mut parsed.burn, &mut parsed.gate]
            .into_iter()
            .filter_map(|requirement| requirement.as_mut().and_then(Requirement::as_token_mut));
        for (token, info) in tokens.zip(token_infos) {
            if let Some(info) = info {
                token.decimals = info.decimals;
                if info.symbol.is_some() {
                    token.symbol = info.symbol;
                }
            }
        }
    }

    /// Mint limit settings with the wallet's counter. On failure the counter
    /// stays unresolved.
    pub async fn resolve_mint_limit(
        &self,
        settings: MintLimit,
        ctx: &GroupContext<'_>,
    ) -> MintLimitState {
        let Some(chain) = self.chain.clone() else {
            return MintLimitState::unresolved(settings);
        };

        let candy_guard = ctx.candy_machine.candy_guard;
        let candy_machine = ctx.candy_machine.address;
        let wallet = *ctx.wallet;
        let key = mint_limit_key(settings.id, &candy_guard, &wallet);
        let events = self.events.clone();

        let resolved = self
            .caches
            .mint_limits
            .get_or_resolve(&key, move || async move {
                let pda = chain.mint_limit_counter_address(&candy_guard, settings.id, &candy_machine, &wallet);
                let mint_counter = match chain.get_account_data(&pda).await? {
                    Some(data) => Some(MintCounter::try_from_account_data(&data)?),
                    None => None,
                };
                debug!("Resolved mint limit {} for {}: {:?}", settings.id, wallet, mint_counter);

                if let Some(events) = events {
                    events.emit(GuardEvent::MintLimitResolved {
                        candy_guard,
                        wallet,
                        limit_id: settings.id,
                        count: mint_counter.map(|counter| counter.count),
                    });
                }

                Ok(MintLimitState {
                    settings,
                    pda: Some(pda),
                    mint_counter,
                })
            })
            .await;

        match resolved {
            // The counter is shared per limit id; the settings come from this group
            Ok(state) => MintLimitState { settings, ..state },
            Err(e) => {
                warn!("Failed to resolve mint limit {}: {}", key, e);
                MintLimitState::unresolved(settings)
            }
        }
    }

    /// Symbol and decimals of a mint, `None` when the lookup fails
    pub async fn resolve_token_info(&self, mint: &Pubkey) -> Option<TokenInfo> {
        let chain = self.chain.clone()?;
        let mint = *mint;
        let events = self.events.clone();

        let resolved = self
            .caches
            .token_info
            .get_or_resolve(&token_info_key(&mint), move || async move {
                let info = chain.find_token_info(&mint).await?;
                if let Some(events) = events {
                    events.emit(GuardEvent::TokenInfoResolved {
                        mint,
                        symbol: info.symbol.clone(),
                        decimals: info.decimals,
                    });
                }
                Ok(info)
            })
            .await;

        match resolved {
            Ok(info) => Some(info),
            Err(e) => {
                warn!("Failed to resolve token info for {}, keeping configured decimals: {}", mint, e);
                None
            }
        }
    }
}

fn matching_nfts(holdings: &[NftMetadata], collection: &Pubkey) -> Vec<NftMetadata> {
    holdings
        .iter()
        .filter(|nft| nft.is_in_collection(collection))
        .cloned()
        .collect()
}

fn token_requirement(mint: Pubkey, amount: u64, symbol: Option<String>, decimals: u8) -> Requirement {
    Requirement::Token(TokenRequirement {
        mint,
        symbol,
        decimals,
        amount,
    })
}

fn token_payment(guard: &TokenPayment) -> Requirement {
    token_requirement(guard.mint, guard.amount, guard.currency.symbol.clone(), guard.currency.decimals)
}

fn token_burn(guard: &TokenBurn) -> Requirement {
    token_requirement(guard.mint, guard.amount, guard.currency.symbol.clone(), guard.currency.decimals)
}

fn token_gate(guard: &TokenGate) -> Requirement {
    token_requirement(guard.mint, guard.amount, guard.currency.symbol.clone(), guard.currency.decimals)
}
