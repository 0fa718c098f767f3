//! Chain data access used to resolve mint limit counters and token metadata

use async_trait::async_trait;
use borsh::BorshDeserialize;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey};
use spl_token::solana_program::program_pack::Pack;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::GuardEvalConfig;
use crate::error::{GuardEvalError, Result};
use crate::types::TokenInfo;

/// Seed prefix of mint limit counter PDAs
pub const MINT_LIMIT_SEED: &[u8] = b"mint_limit";

/// Seed prefix of token metadata PDAs
pub const METADATA_SEED: &[u8] = b"metadata";

/// Read access to the chain state the normalizer depends on
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainAccessor: Send + Sync {
    /// Raw data of an account, `None` if the account does not exist
    async fn get_account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>>;

    /// Address of the mint limit counter of `wallet` for limit `id`
    fn mint_limit_counter_address(
        &self,
        candy_guard: &Pubkey,
        id: u8,
        candy_machine: &Pubkey,
        wallet: &Pubkey,
    ) -> Pubkey;

    /// Symbol and decimals of a token mint. Fails when the mint is unknown.
    async fn find_token_info(&self, mint: &Pubkey) -> Result<TokenInfo>;
}

/// Derive the mint limit counter PDA
/// (`["mint_limit", id, wallet, candy_guard, candy_machine]`)
pub fn find_mint_limit_counter_pda(
    program_id: &Pubkey,
    id: u8,
    wallet: &Pubkey,
    candy_guard: &Pubkey,
    candy_machine: &Pubkey,
) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[
            MINT_LIMIT_SEED,
            &[id],
            wallet.as_ref(),
            candy_guard.as_ref(),
            candy_machine.as_ref(),
        ],
        program_id,
    )
}

/// Derive the token metadata PDA of a mint
pub fn find_metadata_pda(metadata_program_id: &Pubkey, mint: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[METADATA_SEED, metadata_program_id.as_ref(), mint.as_ref()],
        metadata_program_id,
    )
}

// Leading fields of a token metadata account
#[derive(BorshDeserialize)]
struct MetadataPrefix {
    _key: u8,
    _update_authority: [u8; 32],
    _mint: [u8; 32],
    _name: String,
    symbol: String,
}

/// Read the symbol from token metadata account data. Symbols are stored
/// NUL-padded; an empty symbol yields `None`.
pub fn decode_metadata_symbol(data: &[u8]) -> Result<Option<String>> {
    let mut data = data;
    let prefix = MetadataPrefix::deserialize(&mut data)?;
    let symbol = prefix.symbol.trim_end_matches('\0').trim().to_string();
    Ok(Some(symbol).filter(|symbol| !symbol.is_empty()))
}

/// Symbol of a mint from its metadata account data, if any. Missing or
/// undecodable metadata leaves the symbol unset.
pub fn metadata_symbol(mint: &Pubkey, data: Option<&[u8]>) -> Option<String> {
    let Some(data) = data else {
        debug!("No token metadata for mint {}", mint);
        return None;
    };
    match decode_metadata_symbol(data) {
        Ok(symbol) => symbol,
        Err(e) => {
            warn!("Ignoring undecodable token metadata for mint {}: {}", mint, e);
            None
        }
    }
}

/// Read the decimals from SPL mint account data (Token or Token-2022)
pub fn decode_mint_decimals(data: &[u8]) -> Result<u8> {
    let base = data
        .get(..spl_token::state::Mint::LEN)
        .ok_or_else(|| {
            GuardEvalError::InvalidAccountData(format!("mint account too short: {} bytes", data.len()))
        })?;
    let mint = spl_token::state::Mint::unpack_from_slice(base)
        .map_err(|e| GuardEvalError::InvalidAccountData(e.to_string()))?;
    Ok(mint.decimals)
}

/// [`ChainAccessor`] backed by a Solana RPC node
pub struct RpcChainAccessor {
    rpc_client: Arc<RpcClient>,
    commitment: CommitmentConfig,
    candy_guard_program_id: Pubkey,
    token_metadata_program_id: Pubkey,
}

impl RpcChainAccessor {
    pub fn new(config: &GuardEvalConfig) -> Self {
        let rpc_client = Arc::new(RpcClient::new_with_commitment(
            config.rpc_url.clone(),
            config.commitment,
        ));
        Self::with_client(rpc_client, config)
    }

    /// Reuse an existing RPC client
    pub fn with_client(rpc_client: Arc<RpcClient>, config: &GuardEvalConfig) -> Self {
        Self {
            rpc_client,
            commitment: config.commitment,
            candy_guard_program_id: config.candy_guard_program_id,
            token_metadata_program_id: config.token_metadata_program_id,
        }
    }

    pub fn rpc_client(&self) -> &Arc<RpcClient> {
        &self.rpc_client
    }
}

#[async_trait]
impl ChainAccessor for RpcChainAccessor {
    async fn get_account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>> {
        let response = self
            .rpc_client
            .get_account_with_commitment(address, self.commitment)
            .await?;
        Ok(response.value.map(|account| account.data))
    }

    fn mint_limit_counter_address(
        &self,
        candy_guard: &Pubkey,
        id: u8,
        candy_machine: &Pubkey,
        wallet: &Pubkey,
    ) -> Pubkey {
        find_mint_limit_counter_pda(
            &self.candy_guard_program_id,
            id,
            wallet,
            candy_guard,
            candy_machine,
        )
        .0
    }

    async fn find_token_info(&self, mint: &Pubkey) -> Result<TokenInfo> {
        let mint_data = self
            .get_account_data(mint)
            .await?
            .ok_or(GuardEvalError::AccountNotFound(*mint))?;
        let decimals = decode_mint_decimals(&mint_data)?;

        let (metadata, _) = find_metadata_pda(&self.token_metadata_program_id, mint);
        let metadata_data = self.get_account_data(&metadata).await?;
        let symbol = metadata_symbol(mint, metadata_data.as_deref());

        Ok(TokenInfo { symbol, decimals })
    }
}
