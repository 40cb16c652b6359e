//! Ledger nonces of the executor accounts, tracked locally so that several transactions from one
//! executor can be in flight at once.
//!
//! A counter is seeded from the executor's pending transaction count the first time it is used
//! and dropped again whenever a send fails, which forces the next use to reseed from the ledger.
use alloy::primitives::Address;
use dashmap::DashMap;
use serde::Serialize;
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

#[derive(Error, Debug, Serialize, PartialEq)]
pub enum ExecutorNonceError {
    #[error("No nonce tracked for executor {0}")]
    NotSeeded(Address),
}

#[cfg_attr(test, automock)]
pub trait ExecutorNonceCounterTrait: Send + Sync {
    fn get(&self, executor: Address) -> Option<u64>;

    /// Seeds the counter unless another caller already did.
    fn seed(&self, executor: Address, value: u64);

    fn get_and_increment(&self, executor: Address) -> Result<u64, ExecutorNonceError>;

    fn reset(&self, executor: Address);
}

#[derive(Debug, Default)]
pub struct InMemoryExecutorNonceCounter {
    store: DashMap<Address, u64>,
}

impl InMemoryExecutorNonceCounter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ExecutorNonceCounterTrait for InMemoryExecutorNonceCounter {
    fn get(&self, executor: Address) -> Option<u64> {
        self.store.get(&executor).map(|n| *n)
    }

    fn seed(&self, executor: Address, value: u64) {
        self.store.entry(executor).or_insert(value);
    }

    fn get_and_increment(&self, executor: Address) -> Result<u64, ExecutorNonceError> {
        let mut entry = self
            .store
            .get_mut(&executor)
            .ok_or(ExecutorNonceError::NotSeeded(executor))?;
        let current = *entry;
        *entry += 1;
        Ok(current)
    }

    fn reset(&self, executor: Address) {
        if self.store.remove(&executor).is_some() {
            log::debug!("Dropped local nonce of executor {}", executor);
        }
    }
}
