//! Resolve-once caches for chain lookups
//!
//! Each entry holds a shared future. The first caller for a key starts the
//! lookup; concurrent callers with the same key await the same future, and
//! later callers reuse its completed value. A failed lookup removes its own
//! entry so the next caller starts over.

use std::future::Future;

use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use solana_sdk::pubkey::Pubkey;
use tracing::debug;

use crate::error::Result;
use crate::parsed::MintLimitState;
use crate::types::TokenInfo;

type SharedResolution<V> = Shared<BoxFuture<'static, Result<V>>>;

/// String-keyed cache of in-flight and completed resolutions
pub struct ResolutionCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    name: &'static str,
    entries: DashMap<String, SharedResolution<V>>,
}

impl<V> ResolutionCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create an empty cache; `name` only appears in logs
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: DashMap::new(),
        }
    }

    /// Return the value for `key`, running `resolve` only if no resolution
    /// for the key is cached or in flight.
    pub async fn get_or_resolve<F, Fut>(&self, key: &str, resolve: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        // Lookup and insertion happen under the shard lock, without awaiting
        let resolution = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| {
                debug!(cache = self.name, key, "Starting resolution");
                resolve().boxed().shared()
            })
            .value()
            .clone();

        let result = resolution.clone().await;

        if let Err(e) = &result {
            let evicted = self
                .entries
                .remove_if(key, |_, entry| entry.ptr_eq(&resolution))
                .is_some();
            if evicted {
                debug!(cache = self.name, key, error = %e, "Evicted failed resolution");
            }
        }

        result
    }

    /// Completed value for `key`, if any. In-flight and failed entries yield `None`.
    pub fn get(&self, key: &str) -> Option<V> {
        self.entries
            .get(key)
            .and_then(|entry| entry.peek().cloned())
            .and_then(std::result::Result::ok)
    }

    /// Whether an entry, completed or in flight, exists for `key`
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Cache key of a wallet's mint limit counter
pub fn mint_limit_key(limit_id: u8, candy_guard: &Pubkey, wallet: &Pubkey) -> String {
    format!("{}-{}-{}", limit_id, candy_guard, wallet)
}

/// Cache key of a token mint's metadata
pub fn token_info_key(mint: &Pubkey) -> String {
    mint.to_string()
}

/// The caches shared by guard evaluations within one session or process
pub struct GuardCaches {
    pub mint_limits: ResolutionCache<MintLimitState>,
    pub token_info: ResolutionCache<TokenInfo>,
}

impl GuardCaches {
    pub fn new() -> Self {
        Self {
            mint_limits: ResolutionCache::new("mint_limit"),
            token_info: ResolutionCache::new("token_info"),
        }
    }
}

impl Default for GuardCaches {
    fn default() -> Self {
        Self::new()
    }
}
