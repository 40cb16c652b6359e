//! Signing of ledger transactions on behalf of the executor accounts.
//!
//! ```text
//! Signer (trait)
//!   └── LocalSigner   keys loaded from EXECUTOR_KEYS
//! ```
use alloy::{
    consensus::TxEip1559,
    primitives::{Address, Bytes, B256},
};
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::models::SignerError;

mod local_signer;
pub use local_signer::*;

/// A signed transaction ready for `eth_sendRawTransaction`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub hash: B256,
    /// EIP-2718 encoding.
    pub raw: Bytes,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait Signer: Send + Sync {
    /// Addresses of the executors this signer holds keys for, in configuration order.
    fn executors(&self) -> Vec<Address>;

    async fn sign_transaction(
        &self,
        executor: Address,
        transaction: TxEip1559,
    ) -> Result<SignedTransaction, SignerError>;
}
