//! Resolution completion notifications

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use tokio::sync::broadcast;
use tracing::debug;

/// Default capacity of the broadcast buffer
pub const DEFAULT_EVENT_BUFFER: usize = 256;

/// Emitted once per underlying chain lookup, after it completes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GuardEvent {
    /// A wallet's mint limit counter was read
    MintLimitResolved {
        candy_guard: Pubkey,
        wallet: Pubkey,
        limit_id: u8,
        count: Option<u16>,
    },

    /// Symbol and decimals of a token mint were read
    TokenInfoResolved {
        mint: Pubkey,
        symbol: Option<String>,
        decimals: u8,
    },
}

/// Broadcast channel for [`GuardEvent`]s
pub struct GuardEventStream {
    sender: broadcast::Sender<GuardEvent>,
}

impl GuardEventStream {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to events emitted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<GuardEvent> {
        self.sender.subscribe()
    }

    /// Emit an event; dropped when nobody is listening
    pub fn emit(&self, event: GuardEvent) {
        match self.sender.send(event) {
            Ok(count) => debug!("Guard event sent to {} receivers", count),
            Err(e) => debug!("No receivers for guard event: {:?}", e.0),
        }
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for GuardEventStream {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER)
    }
}
