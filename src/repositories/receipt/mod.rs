//! Receipt Repository Module
//!
//! Durable record of what happened to each submitted boop: the ledger transaction that carried it
//! and, once included, its receipt. Everything else the relay holds lives in memory and is
//! rebuilt from the ledger after a restart.
//!
//! ## Repository Implementations
//!
//! - [`InMemoryBoopReceiptRepository`]: process-local storage, used when `REDIS_URL` is unset
//! - [`RedisBoopReceiptRepository`]: Redis-backed storage for production deployments
mod receipt_in_memory;
mod receipt_redis;

pub use receipt_in_memory::*;
pub use receipt_redis::*;

use std::sync::Arc;

use alloy::primitives::B256;
use async_trait::async_trait;
use redis::aio::ConnectionManager;

use crate::models::{BoopReceipt, RepositoryError};

#[cfg(test)]
use mockall::automock;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait BoopReceiptRepository: Send + Sync {
    /// Records the ledger transaction carrying `boop_hash`, replacing any earlier one.
    async fn save_submission(&self, boop_hash: B256, tx_hash: B256)
        -> Result<(), RepositoryError>;

    async fn find_tx_hash(&self, boop_hash: B256) -> Result<Option<B256>, RepositoryError>;

    async fn save_receipt(&self, receipt: &BoopReceipt) -> Result<(), RepositoryError>;

    async fn find_receipt(&self, boop_hash: B256) -> Result<Option<BoopReceipt>, RepositoryError>;
}

/// Enum wrapper for the receipt repository implementations.
#[derive(Debug, Clone)]
pub enum BoopReceiptRepositoryStorage {
    InMemory(InMemoryBoopReceiptRepository),
    Redis(RedisBoopReceiptRepository),
}

impl BoopReceiptRepositoryStorage {
    pub fn new_in_memory() -> Self {
        Self::InMemory(InMemoryBoopReceiptRepository::new())
    }

    pub fn new_redis(
        connection_manager: Arc<ConnectionManager>,
        key_prefix: String,
    ) -> Result<Self, RepositoryError> {
        Ok(Self::Redis(RedisBoopReceiptRepository::new(
            connection_manager,
            key_prefix,
        )?))
    }
}

#[async_trait]
impl BoopReceiptRepository for BoopReceiptRepositoryStorage {
    async fn save_submission(
        &self,
        boop_hash: B256,
        tx_hash: B256,
    ) -> Result<(), RepositoryError> {
        match self {
            Self::InMemory(repo) => repo.save_submission(boop_hash, tx_hash).await,
            Self::Redis(repo) => repo.save_submission(boop_hash, tx_hash).await,
        }
    }

    async fn find_tx_hash(&self, boop_hash: B256) -> Result<Option<B256>, RepositoryError> {
        match self {
            Self::InMemory(repo) => repo.find_tx_hash(boop_hash).await,
            Self::Redis(repo) => repo.find_tx_hash(boop_hash).await,
        }
    }

    async fn save_receipt(&self, receipt: &BoopReceipt) -> Result<(), RepositoryError> {
        match self {
            Self::InMemory(repo) => repo.save_receipt(receipt).await,
            Self::Redis(repo) => repo.save_receipt(receipt).await,
        }
    }

    async fn find_receipt(&self, boop_hash: B256) -> Result<Option<BoopReceipt>, RepositoryError> {
        match self {
            Self::InMemory(repo) => repo.find_receipt(boop_hash).await,
            Self::Redis(repo) => repo.find_receipt(boop_hash).await,
        }
    }
}

#[cfg(test)]
pub mod test_utils {
    use alloy::primitives::{Bytes, U256};

    use crate::models::boop::test_utils::{create_test_boop, TEST_CHAIN_ID};
    use crate::models::{BoopReceipt, OnchainStatus};

    pub fn create_test_boop_receipt(nonce_value: u64) -> BoopReceipt {
        let boop = create_test_boop(nonce_value);
        BoopReceipt {
            boop_hash: boop.hash(TEST_CHAIN_ID),
            account: boop.account,
            nonce_track: boop.nonce_track,
            nonce_value,
            entry_point: alloy::primitives::Address::repeat_byte(0xee),
            status: OnchainStatus::Success,
            description: OnchainStatus::Success.description().to_string(),
            logs: vec![],
            revert_data: Bytes::new(),
            evm_tx_hash: alloy::primitives::B256::repeat_byte(0x0f),
            block_hash: alloy::primitives::B256::repeat_byte(0x0b),
            block_number: 12,
            gas_used: 90_000,
            gas_cost: U256::from(90_000u64 * 1_000),
            boop,
        }
    }
}
