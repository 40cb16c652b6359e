//! Redis-backed implementation of the receipt repository.
//!
//! Keys: `{prefix}:boop_tx:{boop_hash}` holds the carrying transaction hash and
//! `{prefix}:boop_receipt:{boop_hash}` the JSON encoded receipt.
use alloy::primitives::B256;
use async_trait::async_trait;
use log::debug;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::fmt;
use std::sync::Arc;

use super::BoopReceiptRepository;
use crate::models::{BoopReceipt, RepositoryError};
use crate::repositories::redis_base::RedisRepository;

const SUBMISSION_PREFIX: &str = "boop_tx";
const RECEIPT_PREFIX: &str = "boop_receipt";

#[derive(Clone)]
pub struct RedisBoopReceiptRepository {
    pub client: Arc<ConnectionManager>,
    pub key_prefix: String,
}

impl RedisRepository for RedisBoopReceiptRepository {}

impl fmt::Debug for RedisBoopReceiptRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisBoopReceiptRepository")
            .field("client", &"<ConnectionManager>")
            .field("key_prefix", &self.key_prefix)
            .finish()
    }
}

impl RedisBoopReceiptRepository {
    pub fn new(
        connection_manager: Arc<ConnectionManager>,
        key_prefix: String,
    ) -> Result<Self, RepositoryError> {
        if key_prefix.is_empty() {
            return Err(RepositoryError::InvalidData(
                "Redis key prefix cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            client: connection_manager,
            key_prefix,
        })
    }

    fn submission_key(&self, boop_hash: &B256) -> String {
        format!("{}:{}:{}", self.key_prefix, SUBMISSION_PREFIX, boop_hash)
    }

    fn receipt_key(&self, boop_hash: &B256) -> String {
        format!("{}:{}:{}", self.key_prefix, RECEIPT_PREFIX, boop_hash)
    }
}

#[async_trait]
impl BoopReceiptRepository for RedisBoopReceiptRepository {
    async fn save_submission(
        &self,
        boop_hash: B256,
        tx_hash: B256,
    ) -> Result<(), RepositoryError> {
        let mut conn = self.client.as_ref().clone();
        let key = self.submission_key(&boop_hash);
        debug!("Recording transaction {} for boop {}", tx_hash, boop_hash);
        conn.set::<_, _, ()>(&key, tx_hash.to_string())
            .await
            .map_err(|e| self.map_redis_error(e, "save_submission"))
    }

    async fn find_tx_hash(&self, boop_hash: B256) -> Result<Option<B256>, RepositoryError> {
        let mut conn = self.client.as_ref().clone();
        let key = self.submission_key(&boop_hash);
        let value: Option<String> = conn
            .get(&key)
            .await
            .map_err(|e| self.map_redis_error(e, "find_tx_hash"))?;
        value
            .map(|raw| {
                raw.parse::<B256>().map_err(|e| {
                    RepositoryError::InvalidData(format!(
                        "Invalid transaction hash stored for boop {}: {}",
                        boop_hash, e
                    ))
                })
            })
            .transpose()
    }

    async fn save_receipt(&self, receipt: &BoopReceipt) -> Result<(), RepositoryError> {
        let json = self.encode_value(receipt, &receipt.boop_hash)?;
        let mut conn = self.client.as_ref().clone();

        let mut pipe = redis::pipe();
        pipe.atomic()
            .set(self.receipt_key(&receipt.boop_hash), json)
            .set(
                self.submission_key(&receipt.boop_hash),
                receipt.evm_tx_hash.to_string(),
            );
        pipe.query_async::<()>(&mut conn)
            .await
            .map_err(|e| self.map_redis_error(e, "save_receipt"))?;

        debug!("Saved receipt for boop {}", receipt.boop_hash);
        Ok(())
    }

    async fn find_receipt(&self, boop_hash: B256) -> Result<Option<BoopReceipt>, RepositoryError> {
        let mut conn = self.client.as_ref().clone();
        let key = self.receipt_key(&boop_hash);
        let value: Option<String> = conn
            .get(&key)
            .await
            .map_err(|e| self.map_redis_error(e, "find_receipt"))?;
        value
            .map(|json| self.decode_value(&json, &boop_hash))
            .transpose()
    }
}
