//! Candy Guard SDK - Off-chain evaluation of candy machine guards
//!
//! This SDK provides:
//! - Guard group merging (default guards overridden by a group)
//! - Normalization of raw guards with cached chain lookups
//! - Price projection for display
//! - Per-wallet mint eligibility flags
//! - Allow list Merkle proofs

pub mod allow_list;
pub mod cache;
pub mod chain;
pub mod config;
pub mod eligibility;
pub mod error;
pub mod evaluator;
pub mod events;
pub mod guards;
pub mod normalizer;
pub mod parsed;
pub mod pricing;
pub mod types;

// Re-export key types
pub use allow_list::{MerkleProofVerifier, ProofVerifier};
pub use cache::{GuardCaches, ResolutionCache};
pub use chain::{ChainAccessor, RpcChainAccessor};
pub use config::GuardEvalConfig;
pub use eligibility::{parse_guard_states, GuardStates};
pub use error::{GuardEvalError, Result};
pub use evaluator::{EvaluationRequest, GroupEvaluation, GuardEvaluator};
pub use events::{GuardEvent, GuardEventStream};
pub use guards::{merge_guards, CandyGuardData, Group, GuardSet};
pub use normalizer::{GroupContext, GuardNormalizer};
pub use parsed::{MintLimitState, ParsedGuardGroup, Requirement};
pub use pricing::{guard_to_prices, ParsedPrices, PaymentKind, PriceEntry};
pub use types::*;
