//! # RPC Endpoint Selector
//!
//! Picks the ledger endpoint the next call goes to. Endpoints with distinct weights are drawn
//! from a weighted distribution, equal weights rotate round-robin. An endpoint that keeps
//! failing is put on cooldown and skipped until the cooldown expires.
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use rand::distr::weighted::WeightedIndex;
use rand::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tokio::time::Instant;

use crate::models::RpcConfig;

#[derive(Error, Debug, Serialize, PartialEq)]
pub enum RpcSelectorError {
    #[error("No endpoints configured")]
    NoProviders,
    #[error("Client initialization failed: {0}")]
    ClientInitializationError(String),
    #[error("All endpoints are cooling down")]
    AllProvidersFailed,
}

#[derive(Debug)]
struct Cooldowns {
    /// Endpoint index -> instant it becomes selectable again.
    until: HashMap<usize, Instant>,
    period: Duration,
}

impl Cooldowns {
    fn new(period: Duration) -> Self {
        Self {
            until: HashMap::new(),
            period,
        }
    }

    fn start(&mut self, index: usize) {
        self.until.insert(index, Instant::now() + self.period);
    }

    /// Expired entries are dropped as they are looked at.
    fn is_cooling(&mut self, index: usize) -> bool {
        match self.until.get(&index) {
            Some(until) if Instant::now() < *until => true,
            Some(_) => {
                self.until.remove(&index);
                false
            }
            None => false,
        }
    }

    fn active(&self) -> usize {
        let now = Instant::now();
        self.until.values().filter(|until| now < **until).count()
    }
}

/// Chooses among the configured RPC endpoints. Clones share selection state.
#[derive(Debug, Clone)]
pub struct RpcSelector {
    configs: Arc<Vec<RpcConfig>>,
    /// `None` when every usable endpoint has the same weight.
    weights: Option<Arc<WeightedIndex<u8>>>,
    next_index: Arc<AtomicUsize>,
    cooldowns: Arc<RwLock<Cooldowns>>,
    current_index: Arc<AtomicUsize>,
    has_current: Arc<AtomicBool>,
}

impl RpcSelector {
    pub fn new(configs: Vec<RpcConfig>, cooldown: Duration) -> Result<Self, RpcSelectorError> {
        if configs.is_empty() {
            return Err(RpcSelectorError::NoProviders);
        }
        let weights = Self::weight_distribution(&configs);
        Ok(Self {
            configs: Arc::new(configs),
            weights,
            next_index: Arc::new(AtomicUsize::new(0)),
            cooldowns: Arc::new(RwLock::new(Cooldowns::new(cooldown))),
            current_index: Arc::new(AtomicUsize::new(0)),
            has_current: Arc::new(AtomicBool::new(false)),
        })
    }

    fn weight_distribution(configs: &[RpcConfig]) -> Option<Arc<WeightedIndex<u8>>> {
        let weights: Vec<u8> = configs.iter().map(RpcConfig::get_weight).collect();
        let mut usable = weights.iter().filter(|w| **w > 0);
        let first = *usable.next()?;
        if usable.all(|w| *w == first) {
            return None;
        }
        WeightedIndex::new(&weights).ok().map(Arc::new)
    }

    pub fn provider_count(&self) -> usize {
        self.configs.len()
    }

    pub fn available_provider_count(&self) -> usize {
        self.configs.len() - self.cooldowns.read().active()
    }

    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.configs.iter().map(|config| config.url.as_str())
    }

    /// Puts the endpoint picked last on cooldown.
    pub fn mark_current_as_failed(&self) {
        if !self.has_current.swap(false, Ordering::Relaxed) {
            return;
        }
        let current = self.current_index.load(Ordering::Relaxed);
        self.cooldowns.write().start(current);
        if self.configs.len() > 1 {
            self.next_index.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn reset_failed_providers(&self) {
        self.cooldowns.write().until.clear();
    }

    fn set_current(&self, index: usize) -> &str {
        self.current_index.store(index, Ordering::Relaxed);
        self.has_current.store(true, Ordering::Relaxed);
        &self.configs[index].url
    }

    fn select_url(&self) -> Result<&str, RpcSelectorError> {
        let mut cooldowns = self.cooldowns.write();

        if let Some(weights) = &self.weights {
            let mut rng = rand::rng();
            // a few draws before falling back to a linear scan
            for _ in 0..5 {
                let index = weights.sample(&mut rng);
                if !cooldowns.is_cooling(index) {
                    return Ok(self.set_current(index));
                }
            }
        }

        let len = self.configs.len();
        let start = self.next_index.load(Ordering::Relaxed) % len;
        for offset in 0..len {
            let index = (start + offset) % len;
            if self.configs[index].get_weight() == 0 && len > 1 {
                continue;
            }
            if !cooldowns.is_cooling(index) {
                self.next_index.store((index + 1) % len, Ordering::Relaxed);
                return Ok(self.set_current(index));
            }
        }

        Err(RpcSelectorError::AllProvidersFailed)
    }

    pub fn get_current_url(&self) -> Result<String, RpcSelectorError> {
        self.select_url().map(str::to_string)
    }

    /// Selects an endpoint and builds a client for it.
    pub fn get_client<T, E: std::fmt::Display>(
        &self,
        initializer: impl Fn(&str) -> Result<T, E>,
    ) -> Result<T, RpcSelectorError> {
        let url = self.select_url()?;
        initializer(url).map_err(|e| RpcSelectorError::ClientInitializationError(e.to_string()))
    }
}
