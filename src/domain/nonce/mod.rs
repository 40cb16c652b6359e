//! Per-lane nonce ordering.
//!
//! Each lane (account, nonce track) caches the next nonce value the entry point expects. A boop
//! whose nonce is ahead of that value waits here until the boops before it went out, released
//! one at a time as the cached value advances.
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, B256};
use dashmap::DashMap;
use tokio::sync::{oneshot, Mutex};

use crate::config::LimitsConfig;
use crate::metrics::BLOCKED_BOOPS;
use crate::models::{Boop, NonceKey, PendingBoop, SubmitterError};
use crate::services::LedgerProvider;

type WaitResult = Result<(), SubmitterError>;

#[derive(Debug)]
struct Waiter {
    boop_hash: B256,
    release: oneshot::Sender<WaitResult>,
}

#[derive(Debug, Default)]
struct Lane {
    next_nonce: Option<u64>,
    waiting: BTreeMap<u64, Waiter>,
}

/// Admission ceilings and the wait timeout of the gate.
#[derive(Debug, Clone, Copy)]
pub struct NonceGateLimits {
    pub max_pending_per_track: usize,
    pub max_total_pending: usize,
    pub wait_timeout: Duration,
}

impl From<&LimitsConfig> for NonceGateLimits {
    fn from(config: &LimitsConfig) -> Self {
        Self {
            max_pending_per_track: config.max_pending_per_track,
            max_total_pending: config.max_total_pending,
            wait_timeout: config.max_submit_pending_time,
        }
    }
}

pub struct NonceGate<P: LedgerProvider> {
    provider: Arc<P>,
    limits: NonceGateLimits,
    lanes: DashMap<NonceKey, Arc<Mutex<Lane>>>,
    blocked: AtomicUsize,
}

impl<P: LedgerProvider> NonceGate<P> {
    pub fn new(provider: Arc<P>, limits: NonceGateLimits) -> Self {
        Self {
            provider,
            limits,
            lanes: DashMap::new(),
            blocked: AtomicUsize::new(0),
        }
    }

    fn lane(&self, key: NonceKey) -> Arc<Mutex<Lane>> {
        self.lanes.entry(key).or_default().clone()
    }

    /// Seeds the cached nonce from the ledger when needed. Must be called with the lane locked.
    async fn next_nonce(&self, key: &NonceKey, lane: &mut Lane) -> Result<u64, SubmitterError> {
        if let Some(nonce) = lane.next_nonce {
            return Ok(nonce);
        }
        let nonce = self.provider.get_nonce(key.account, key.track).await?;
        log::debug!("Seeded nonce of {} at {}", key, nonce);
        lane.next_nonce = Some(nonce);
        Ok(nonce)
    }

    /// True when the boop's nonce is ahead of the lane's next expected nonce.
    pub async fn is_blocked(&self, boop: &Boop) -> Result<bool, SubmitterError> {
        let key = boop.nonce_key();
        let lane = self.lane(key);
        let mut lane = lane.lock().await;
        Ok(boop.nonce_value > self.next_nonce(&key, &mut lane).await?)
    }

    /// Cached next nonce of a lane, if seeded.
    pub async fn local_nonce(&self, key: &NonceKey) -> Option<u64> {
        let lane = self.lanes.get(key)?.clone();
        let nonce = lane.lock().await.next_nonce;
        nonce
    }

    /// Number of boops currently waiting across all lanes.
    pub fn blocked_count(&self) -> usize {
        self.blocked.load(Ordering::SeqCst)
    }

    /// Waits until every earlier nonce of the lane went out.
    ///
    /// Returns immediately when the boop is not ahead of the lane. Fails without waiting when an
    /// admission ceiling is hit. A waiter for the same nonce is rejected as replaced.
    pub async fn wait_until_unblocked(
        &self,
        boop: &Boop,
        boop_hash: B256,
    ) -> Result<(), SubmitterError> {
        let key = boop.nonce_key();
        let lane_lock = self.lane(key);
        let mut receiver = {
            let mut lane = lane_lock.lock().await;
            let next_nonce = self.next_nonce(&key, &mut lane).await?;
            if boop.nonce_value <= next_nonce {
                return Ok(());
            }

            let replaced = lane.waiting.remove(&boop.nonce_value);
            if lane.waiting.len() >= self.limits.max_pending_per_track {
                self.restore(&mut lane, boop.nonce_value, replaced);
                return Err(SubmitterError::BufferExceeded);
            }
            if replaced.is_none() && self.blocked_count() >= self.limits.max_total_pending {
                return Err(SubmitterError::OverCapacity);
            }
            if boop.nonce_value > next_nonce + self.limits.max_pending_per_track as u64 {
                self.restore(&mut lane, boop.nonce_value, replaced);
                return Err(SubmitterError::NonceTooFarAhead {
                    value: boop.nonce_value,
                    expected: next_nonce,
                });
            }

            match replaced {
                Some(previous) => {
                    log::info!(
                        "Boop {} replaces waiting boop {} at nonce {} of {}",
                        boop_hash,
                        previous.boop_hash,
                        boop.nonce_value,
                        key
                    );
                    let _ = previous.release.send(Err(SubmitterError::Replaced));
                }
                None => self.add_blocked(),
            }

            let (release, receiver) = oneshot::channel();
            lane.waiting
                .insert(boop.nonce_value, Waiter { boop_hash, release });
            receiver
        };

        log::debug!(
            "Boop {} waits for nonce {} of {}",
            boop_hash,
            boop.nonce_value,
            key
        );
        match tokio::time::timeout(self.limits.wait_timeout, &mut receiver).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(SubmitterError::Unexpected(
                "nonce gate dropped a waiting boop".to_string(),
            )),
            Err(_) => {
                let mut lane = lane_lock.lock().await;
                let ours = lane
                    .waiting
                    .get(&boop.nonce_value)
                    .is_some_and(|waiter| waiter.boop_hash == boop_hash);
                if ours {
                    lane.waiting.remove(&boop.nonce_value);
                    self.remove_blocked();
                    log::info!("Boop {} timed out waiting for earlier nonces", boop_hash);
                    return Err(SubmitterError::SubmitTimeout);
                }
                // released or replaced while the timeout fired
                receiver.try_recv().unwrap_or(Err(SubmitterError::SubmitTimeout))
            }
        }
    }

    fn restore(&self, lane: &mut Lane, nonce_value: u64, replaced: Option<Waiter>) {
        if let Some(waiter) = replaced {
            lane.waiting.insert(nonce_value, waiter);
        }
    }

    /// Records that the boop went out: the lane now expects the following nonce, and the boop
    /// waiting for that nonce, if any, is released.
    pub async fn increment_local_nonce(&self, boop: &Boop) {
        let key = boop.nonce_key();
        let lane = self.lane(key);
        let mut lane = lane.lock().await;
        let next_nonce = boop.nonce_value + 1;
        if lane.next_nonce.is_some_and(|current| current > next_nonce) {
            return;
        }
        lane.next_nonce = Some(next_nonce);
        if let Some(waiter) = lane.waiting.remove(&next_nonce) {
            self.remove_blocked();
            log::debug!("Releasing boop {} at nonce {} of {}", waiter.boop_hash, next_nonce, key);
            let _ = waiter.release.send(Ok(()));
        }
    }

    /// Forgets the cached nonce so that the next access reads it from the ledger again.
    pub async fn reset_local_nonce(&self, key: &NonceKey) {
        if let Some(lane) = self.lanes.get(key).map(|lane| lane.clone()) {
            lane.lock().await.next_nonce = None;
        }
        // drop idle lanes; nobody else can be holding them while the shard is locked
        self.lanes.remove_if(key, |_, lane| {
            Arc::strong_count(lane) == 1
                && lane
                    .try_lock()
                    .map(|lane| lane.waiting.is_empty())
                    .unwrap_or(false)
        });
    }

    /// Boops of `account` waiting in the gate.
    pub async fn pending_for(&self, account: Address) -> Vec<PendingBoop> {
        let lanes: Vec<(NonceKey, Arc<Mutex<Lane>>)> = self
            .lanes
            .iter()
            .filter(|entry| entry.key().account == account)
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();

        let mut pending = Vec::new();
        for (key, lane) in lanes {
            let lane = lane.lock().await;
            pending.extend(lane.waiting.iter().map(|(nonce_value, waiter)| PendingBoop {
                nonce_track: key.track,
                nonce_value: *nonce_value,
                boop_hash: waiter.boop_hash,
                blocked: true,
            }));
        }
        pending
    }

    fn add_blocked(&self) {
        let blocked = self.blocked.fetch_add(1, Ordering::SeqCst) + 1;
        BLOCKED_BOOPS.set(blocked as i64);
    }

    fn remove_blocked(&self) {
        let previous = self
            .blocked
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(n.saturating_sub(1)))
            .unwrap_or(0);
        BLOCKED_BOOPS.set(previous.saturating_sub(1) as i64);
    }
}
