//! In-flight boops, indexed by hash and by nonce.
//!
//! The store holds its own copy of every boop: callers get clones back, so mutating a boop after
//! handing it over never changes what the relay will resubmit.
use std::collections::HashMap;
use std::sync::Arc;

use alloy::primitives::{aliases::U192, Address, B256};
use parking_lot::RwLock;

use crate::models::{Boop, NonceKey};

#[derive(Debug, Default)]
struct StoreState {
    by_hash: HashMap<B256, Arc<Boop>>,
    by_nonce: HashMap<(NonceKey, u64), B256>,
}

#[derive(Debug, Default)]
pub struct BoopStore {
    state: RwLock<StoreState>,
}

impl BoopStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `boop` under `hash`, returning false when that hash is already held.
    ///
    /// A different boop already stored for the same nonce stays reachable by hash, but
    /// `get_by_nonce` now returns the new one.
    pub fn set(&self, hash: B256, boop: &Boop) -> bool {
        let mut state = self.state.write();
        if state.by_hash.contains_key(&hash) {
            return false;
        }
        let nonce = (boop.nonce_key(), boop.nonce_value);
        state.by_nonce.insert(nonce, hash);
        state.by_hash.insert(hash, Arc::new(boop.clone()));
        true
    }

    pub fn contains(&self, hash: &B256) -> bool {
        self.state.read().by_hash.contains_key(hash)
    }

    pub fn get_by_hash(&self, hash: &B256) -> Option<Boop> {
        self.state
            .read()
            .by_hash
            .get(hash)
            .map(|boop| boop.as_ref().clone())
    }

    pub fn get_by_nonce(&self, account: Address, track: U192, value: u64) -> Option<Boop> {
        let state = self.state.read();
        state
            .by_nonce
            .get(&(NonceKey::new(account, track), value))
            .and_then(|hash| state.by_hash.get(hash))
            .map(|boop| boop.as_ref().clone())
    }

    /// Every stored boop of `account` with its hash, ordered by track then nonce.
    pub fn get_by_account(&self, account: Address) -> Vec<(B256, Boop)> {
        let state = self.state.read();
        let mut boops: Vec<(B256, Boop)> = state
            .by_hash
            .iter()
            .filter(|(_, boop)| boop.account == account)
            .map(|(hash, boop)| (*hash, boop.as_ref().clone()))
            .collect();
        boops.sort_by(|(_, a), (_, b)| {
            (a.nonce_track, a.nonce_value).cmp(&(b.nonce_track, b.nonce_value))
        });
        boops
    }

    /// Removes the boop. The nonce index is only cleared when it still points at this hash.
    pub fn delete(&self, hash: &B256) -> Option<Boop> {
        let mut state = self.state.write();
        let boop = state.by_hash.remove(hash)?;
        let nonce = (boop.nonce_key(), boop.nonce_value);
        if state.by_nonce.get(&nonce) == Some(hash) {
            state.by_nonce.remove(&nonce);
        }
        Some(boop.as_ref().clone())
    }

    pub fn len(&self) -> usize {
        self.state.read().by_hash.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
