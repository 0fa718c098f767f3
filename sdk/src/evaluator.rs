//! Evaluate candy guard groups for a wallet in one call
//!
//! [`GuardEvaluator`] runs the normalizer, the price projector and the
//! eligibility evaluator for a group and keeps the caches and event stream
//! shared between evaluations.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::allow_list::ProofVerifier;
use crate::cache::GuardCaches;
use crate::chain::{ChainAccessor, RpcChainAccessor};
use crate::config::GuardEvalConfig;
use crate::eligibility::{parse_guard_states, GuardStates};
use crate::events::{GuardEvent, GuardEventStream};
use crate::guards::CandyGuardData;
use crate::normalizer::{GroupContext, GuardNormalizer};
use crate::parsed::ParsedGuardGroup;
use crate::pricing::{guard_to_prices, ParsedPrices};
use crate::types::{CandyMachineState, WalletState};

/// Inputs shared by every group evaluated for one wallet
#[derive(Clone, Copy)]
pub struct EvaluationRequest<'a> {
    pub guard_data: &'a CandyGuardData,
    pub candy_machine: &'a CandyMachineState,
    pub wallet: &'a WalletState,
    pub verifier: &'a dyn ProofVerifier,
    pub now: DateTime<Utc>,
}

/// Result of evaluating one group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupEvaluation {
    /// `None` for the default group
    pub label: Option<String>,
    pub guards: ParsedGuardGroup,
    pub prices: ParsedPrices,
    pub states: GuardStates,
}

impl GroupEvaluation {
    pub fn can_mint(&self) -> bool {
        self.states.can_mint()
    }
}

pub struct GuardEvaluator {
    config: GuardEvalConfig,
    events: Arc<GuardEventStream>,
    normalizer: GuardNormalizer,
}

impl GuardEvaluator {
    /// Evaluator reading chain state over RPC
    pub fn new(config: GuardEvalConfig) -> Self {
        let chain = Arc::new(RpcChainAccessor::new(&config));
        Self::with_chain(config, chain)
    }

    pub fn with_chain(config: GuardEvalConfig, chain: Arc<dyn ChainAccessor>) -> Self {
        Self::from_parts(config, Some(chain), Arc::new(GuardCaches::new()))
    }

    /// Evaluator without chain access. Mint limit counters stay unresolved.
    pub fn offline(config: GuardEvalConfig) -> Self {
        Self::from_parts(config, None, Arc::new(GuardCaches::new()))
    }

    /// Build an evaluator around existing caches, e.g. to share them between evaluators
    pub fn from_parts(
        config: GuardEvalConfig,
        chain: Option<Arc<dyn ChainAccessor>>,
        caches: Arc<GuardCaches>,
    ) -> Self {
        let events = Arc::new(GuardEventStream::new(config.event_buffer));

        let mut normalizer = GuardNormalizer::new(caches).with_events(events.clone());
        if let Some(chain) = chain {
            normalizer = normalizer.with_chain(chain);
        }

        Self {
            config,
            events,
            normalizer,
        }
    }

    pub fn config(&self) -> &GuardEvalConfig {
        &self.config
    }

    pub fn caches(&self) -> &Arc<GuardCaches> {
        self.normalizer.caches()
    }

    /// Receive resolution events, e.g. to refresh a view once counters arrive
    pub fn subscribe(&self) -> broadcast::Receiver<GuardEvent> {
        self.events.subscribe()
    }

    /// Evaluate one group. `None`, or an unknown label, evaluates the default guards.
    pub async fn evaluate_group(
        &self,
        request: &EvaluationRequest<'_>,
        label: Option<&str>,
    ) -> GroupEvaluation {
        let guards = request.guard_data.effective_guards(label);
        let ctx = GroupContext {
            guards: &guards,
            label,
            candy_machine: request.candy_machine,
            wallet: &request.wallet.address,
            nft_holdings: &request.wallet.nft_holdings,
            now: request.now,
        };

        let parsed = self.normalizer.parse_guard_group(&ctx, request.verifier).await;
        let prices = guard_to_prices(&parsed);
        let states = parse_guard_states(
            &parsed,
            request.wallet,
            request.candy_machine.items_minted,
            request.now,
        );

        debug!(
            "Evaluated group {} for {}: {:?}",
            ctx.label_or_default(),
            request.wallet.address,
            states
        );

        GroupEvaluation {
            label: label.map(str::to_string),
            guards: parsed,
            prices,
            states,
        }
    }

    /// Evaluate the default group and every labeled group concurrently,
    /// default first, then groups in declaration order.
    pub async fn evaluate_all(&self, request: &EvaluationRequest<'_>) -> Vec<GroupEvaluation> {
        let labels = std::iter::once(None).chain(request.guard_data.labels().into_iter().map(Some));
        let evaluations = join_all(labels.map(|label| self.evaluate_group(request, label))).await;

        info!(
            "Evaluated {} guard groups for {}, {} mintable",
            evaluations.len(),
            request.wallet.address,
            evaluations.iter().filter(|evaluation| evaluation.can_mint()).count()
        );

        evaluations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::MockChainAccessor;
    use crate::guards::{AllowList, Group, GuardSet, MintLimit, SolPayment};
    use crate::pricing::PaymentKind;
    use solana_sdk::pubkey::Pubkey;

    const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

    fn sol_payment(lamports: u64) -> SolPayment {
        SolPayment {
            lamports,
            destination: Pubkey::new_unique(),
        }
    }

    fn guard_data() -> CandyGuardData {
        CandyGuardData {
            default: GuardSet {
                sol_payment: Some(sol_payment(2 * LAMPORTS_PER_SOL)),
                ..Default::default()
            },
            groups: vec![Group {
                label: "vip".to_string(),
                guards: GuardSet {
                    sol_payment: Some(sol_payment(LAMPORTS_PER_SOL / 2)),
                    allow_list: Some(AllowList { merkle_root: [1u8; 32] }),
                    ..Default::default()
                },
            }],
        }
    }

    fn candy_machine() -> CandyMachineState {
        CandyMachineState {
            address: Pubkey::new_unique(),
            candy_guard: Pubkey::new_unique(),
            items_minted: 10,
            items_available: 100,
        }
    }

    fn wallet(lamports: u64) -> WalletState {
        WalletState {
            address: Pubkey::new_unique(),
            lamports,
            token_holdings: vec![],
            nft_holdings: vec![],
        }
    }

    #[tokio::test]
    async fn test_evaluate_all_groups() {
        let data = guard_data();
        let machine = candy_machine();
        let wallet = wallet(LAMPORTS_PER_SOL);
        let verifier = |_: &[u8; 32], label: &str| label == "vip";
        let request = EvaluationRequest {
            guard_data: &data,
            candy_machine: &machine,
            wallet: &wallet,
            verifier: &verifier,
            now: Utc::now(),
        };

        let evaluator = GuardEvaluator::offline(GuardEvalConfig::default());
        let evaluations = evaluator.evaluate_all(&request).await;
        assert_eq!(evaluations.len(), 2);

        let default = &evaluations[0];
        assert_eq!(default.label, None);
        assert_eq!(default.prices.payment.len(), 1);
        assert!((default.prices.payment[0].price - 2.0).abs() < f64::EPSILON);
        assert!(!default.states.is_payment_available);
        assert!(!default.can_mint());

        let vip = &evaluations[1];
        assert_eq!(vip.label.as_deref(), Some("vip"));
        assert_eq!(vip.prices.payment[0].kind, PaymentKind::Sol);
        assert!((vip.prices.payment[0].price - 0.5).abs() < f64::EPSILON);
        assert_eq!(vip.guards.allowed, Some(vec![wallet.address]));
        assert!(vip.states.is_wallet_whitelisted);
        assert!(vip.can_mint());
    }

    #[tokio::test]
    async fn test_unknown_label_uses_default_guards() {
        let data = guard_data();
        let machine = candy_machine();
        let wallet = wallet(0);
        let verifier = |_: &[u8; 32], _: &str| false;
        let request = EvaluationRequest {
            guard_data: &data,
            candy_machine: &machine,
            wallet: &wallet,
            verifier: &verifier,
            now: Utc::now(),
        };

        let evaluator = GuardEvaluator::offline(GuardEvalConfig::default());
        let evaluation = evaluator.evaluate_group(&request, Some("missing")).await;
        assert_eq!(evaluation.label.as_deref(), Some("missing"));
        assert!((evaluation.prices.payment[0].price - 2.0).abs() < f64::EPSILON);
        assert!(evaluation.guards.allowed.is_none());
    }

    #[tokio::test]
    async fn test_mint_limit_reached_blocks_minting() {
        let data = CandyGuardData {
            default: GuardSet {
                mint_limit: Some(MintLimit { id: 1, limit: 2 }),
                ..Default::default()
            },
            groups: vec![],
        };
        let machine = candy_machine();
        let wallet = wallet(LAMPORTS_PER_SOL);
        let verifier = |_: &[u8; 32], _: &str| false;

        let mut chain = MockChainAccessor::new();
        chain.expect_mint_limit_counter_address().return_const(Pubkey::new_unique());
        chain.expect_get_account_data().returning(|_| {
            let mut data = vec![0u8; 8];
            data.extend_from_slice(&2u16.to_le_bytes());
            Ok(Some(data))
        });

        let evaluator = GuardEvaluator::with_chain(GuardEvalConfig::default(), Arc::new(chain));
        let mut events = evaluator.subscribe();
        let request = EvaluationRequest {
            guard_data: &data,
            candy_machine: &machine,
            wallet: &wallet,
            verifier: &verifier,
            now: Utc::now(),
        };

        let evaluations = evaluator.evaluate_all(&request).await;
        assert_eq!(evaluations.len(), 1);
        assert!(evaluations[0].states.is_limit_reached);
        assert!(!evaluations[0].can_mint());
        assert!(evaluations[0].prices.is_empty());

        assert!(matches!(
            events.try_recv(),
            Ok(GuardEvent::MintLimitResolved { count: Some(2), .. })
        ));
        assert_eq!(evaluator.caches().mint_limits.len(), 1);
    }
}
