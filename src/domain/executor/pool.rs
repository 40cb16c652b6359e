use std::collections::HashMap;
use std::time::Duration;

use alloy::primitives::{Address, B256};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::time::Instant;

use super::IndexedMinHeap;
use crate::metrics::EXECUTOR_JOBS;
use crate::models::{NonceKey, SubmitterError};

/// An executor bound to a lane, with one sliding expiry per boop hash submitted through it.
#[derive(Debug)]
struct Binding {
    executor: Address,
    hashes: HashMap<B256, Instant>,
}

#[derive(Debug, Default)]
struct PoolState {
    heap: IndexedMinHeap<Address>,
    bindings: HashMap<NonceKey, Binding>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutorStats {
    pub address: Address,
    pub jobs: u64,
}

/// Assigns executors to lanes.
///
/// The least loaded executor is bound to a lane on first use. Later boops on the same lane reuse
/// it for as long as any of the lane's hashes is still live, so one lane never has transactions
/// in flight from two executors.
pub struct ExecutorPool {
    state: Mutex<PoolState>,
    ttl: Duration,
}

impl ExecutorPool {
    pub fn new(executors: &[Address], ttl: Duration) -> Self {
        let mut state = PoolState::default();
        for executor in executors {
            state.heap.push(*executor, 0);
            EXECUTOR_JOBS
                .with_label_values(&[executor.to_string().as_str()])
                .set(0);
        }
        Self {
            state: Mutex::new(state),
            ttl,
        }
    }

    /// Returns the executor for `key`, refreshing the expiry of `boop_hash`.
    pub fn acquire(&self, boop_hash: B256, key: NonceKey) -> Result<Address, SubmitterError> {
        let now = Instant::now();
        let expires_at = now + self.ttl;
        let mut guard = self.state.lock();
        let state = &mut *guard;
        Self::expire(state, now);

        if let Some(binding) = state.bindings.get_mut(&key) {
            let executor = binding.executor;
            if binding.hashes.insert(boop_hash, expires_at).is_none() {
                Self::add_job(&mut state.heap, &executor);
            }
            return Ok(executor);
        }

        let executor = state
            .heap
            .peek()
            .map(|(executor, _)| *executor)
            .ok_or_else(|| SubmitterError::Unexpected("no executors available".to_string()))?;
        Self::add_job(&mut state.heap, &executor);
        state.bindings.insert(
            key,
            Binding {
                executor,
                hashes: HashMap::from([(boop_hash, expires_at)]),
            },
        );
        log::debug!("Bound executor {} to {}", executor, key);
        Ok(executor)
    }

    /// Executor currently bound to `key`, if the binding is still live.
    pub fn binding(&self, key: &NonceKey) -> Option<Address> {
        let now = Instant::now();
        let state = self.state.lock();
        state
            .bindings
            .get(key)
            .filter(|binding| binding.hashes.values().any(|expiry| *expiry > now))
            .map(|binding| binding.executor)
    }

    /// Drops expired hashes and bindings. Also runs on every `acquire`.
    pub fn sweep_expired(&self) {
        let mut state = self.state.lock();
        Self::expire(&mut state, Instant::now());
    }

    /// Current job count of every executor, least loaded first.
    pub fn stats(&self) -> Vec<ExecutorStats> {
        let state = self.state.lock();
        let mut stats: Vec<ExecutorStats> = state
            .heap
            .iter()
            .map(|(address, jobs)| ExecutorStats {
                address: *address,
                jobs,
            })
            .collect();
        stats.sort_by_key(|s| s.jobs);
        stats
    }

    fn expire(state: &mut PoolState, now: Instant) {
        let PoolState { heap, bindings } = state;
        bindings.retain(|key, binding| {
            let before = binding.hashes.len();
            binding.hashes.retain(|_, expiry| *expiry > now);
            for _ in binding.hashes.len()..before {
                Self::remove_job(heap, &binding.executor);
            }
            if binding.hashes.is_empty() {
                log::debug!("Binding of {} to executor {} expired", key, binding.executor);
                return false;
            }
            true
        });
    }

    fn add_job(heap: &mut IndexedMinHeap<Address>, executor: &Address) {
        if let Some(jobs) = heap.increment(executor) {
            EXECUTOR_JOBS
                .with_label_values(&[executor.to_string().as_str()])
                .set(jobs as i64);
        }
    }

    fn remove_job(heap: &mut IndexedMinHeap<Address>, executor: &Address) {
        if let Some(jobs) = heap.decrement(executor) {
            EXECUTOR_JOBS
                .with_label_values(&[executor.to_string().as_str()])
                .set(jobs as i64);
        }
    }
}
