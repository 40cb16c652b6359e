//! In-memory receipt repository backed by `DashMap`.
use alloy::primitives::B256;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

use super::BoopReceiptRepository;
use crate::models::{BoopReceipt, RepositoryError};

#[derive(Debug, Clone, Default)]
pub struct InMemoryBoopReceiptRepository {
    submissions: Arc<DashMap<B256, B256>>,
    receipts: Arc<DashMap<B256, BoopReceipt>>,
}

impl InMemoryBoopReceiptRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BoopReceiptRepository for InMemoryBoopReceiptRepository {
    async fn save_submission(
        &self,
        boop_hash: B256,
        tx_hash: B256,
    ) -> Result<(), RepositoryError> {
        self.submissions.insert(boop_hash, tx_hash);
        Ok(())
    }

    async fn find_tx_hash(&self, boop_hash: B256) -> Result<Option<B256>, RepositoryError> {
        Ok(self.submissions.get(&boop_hash).map(|tx| *tx))
    }

    async fn save_receipt(&self, receipt: &BoopReceipt) -> Result<(), RepositoryError> {
        self.submissions
            .insert(receipt.boop_hash, receipt.evm_tx_hash);
        self.receipts.insert(receipt.boop_hash, receipt.clone());
        Ok(())
    }

    async fn find_receipt(&self, boop_hash: B256) -> Result<Option<BoopReceipt>, RepositoryError> {
        Ok(self.receipts.get(&boop_hash).map(|r| r.clone()))
    }
}
