//! Latest simulation of recently seen boops, answered by `getState` for boops without a receipt.
use std::collections::{HashMap, VecDeque};

use alloy::primitives::B256;
use parking_lot::Mutex;

use crate::models::SimulationReport;

#[derive(Debug, Default)]
struct CacheState {
    reports: HashMap<B256, SimulationReport>,
    /// Insertion order, oldest first. May hold hashes already overwritten or evicted.
    order: VecDeque<B256>,
}

/// Bounded cache evicting the oldest inserted entry first.
#[derive(Debug)]
pub struct SimulationCache {
    state: Mutex<CacheState>,
    capacity: usize,
}

impl SimulationCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            capacity: capacity.max(1),
        }
    }

    pub fn insert(&self, report: SimulationReport) {
        let mut state = self.state.lock();
        let hash = report.boop_hash;
        if state.reports.insert(hash, report).is_none() {
            state.order.push_back(hash);
        }
        while state.reports.len() > self.capacity {
            match state.order.pop_front() {
                Some(oldest) => {
                    state.reports.remove(&oldest);
                }
                None => break,
            }
        }
    }

    pub fn get(&self, hash: &B256) -> Option<SimulationReport> {
        self.state.lock().reports.get(hash).cloned()
    }

    pub fn len(&self) -> usize {
        self.state.lock().reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
