//! # Block Monitor
//!
//! Follows the chain head by polling one ledger endpoint at a time and publishes every accepted
//! block, both as the "current block" (a `watch` channel read by the fee oracle) and as a stream
//! (a `broadcast` channel that wakes receipt waiters).
//!
//! ```text
//! Selecting ──(fastest endpoint answers)──▶ Polling ──(max_attempts failures)──▶ TimedOut
//!     ▲   └──(nobody answers)──▶ Halted ──(any endpoint answers)──┘                │
//!     └────────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! An endpoint that times out repeatedly is put on cooldown. When no endpoint answers at all the
//! monitor keeps polling every endpoint slowly instead of giving up.
use std::collections::HashMap;
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::{broadcast, watch};
use tokio::time::{sleep, timeout, Duration, Instant};

use crate::config::BlockMonitorConfig;
use crate::metrics::{CURRENT_BLOCK, REORGS};
use crate::models::{Block, BlockTag};
use crate::services::{AlertManager, BlockSource, ProviderError};

mod history;
pub use history::*;

const LOG_TARGET: &str = "block_monitor";
const BLOCK_CHANNEL_CAPACITY: usize = 256;
pub const HALTED_CONDITION: &str = "block_production_halted";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Selecting,
    /// Polling endpoint `source`; `failures` consecutive polls have failed.
    Polling { source: usize, failures: u32 },
    TimedOut { source: usize },
    Halted,
}

pub struct BlockMonitor<S: BlockSource> {
    sources: Vec<Arc<S>>,
    config: BlockMonitorConfig,
    history: BlockHistory,
    cooldowns: HashMap<usize, Instant>,
    last_new_block: Instant,
    current: watch::Sender<Option<Block>>,
    blocks: broadcast::Sender<Block>,
    alerts: Arc<AlertManager>,
}

impl<S: BlockSource + 'static> BlockMonitor<S> {
    pub fn new(sources: Vec<Arc<S>>, config: BlockMonitorConfig, alerts: Arc<AlertManager>) -> Self {
        let (current, _) = watch::channel(None);
        let (blocks, _) = broadcast::channel(BLOCK_CHANNEL_CAPACITY);
        Self {
            history: BlockHistory::new(config.history_size),
            sources,
            config,
            cooldowns: HashMap::new(),
            last_new_block: Instant::now(),
            current,
            blocks,
            alerts,
        }
    }

    /// Receiver of the latest accepted block.
    pub fn current_block(&self) -> watch::Receiver<Option<Block>> {
        self.current.subscribe()
    }

    /// Sender side of the accepted block stream; call `subscribe` on it to follow new blocks.
    pub fn block_stream(&self) -> broadcast::Sender<Block> {
        self.blocks.clone()
    }

    pub fn history(&self) -> &BlockHistory {
        &self.history
    }

    /// Runs until the task is aborted.
    pub async fn run(mut self) {
        log::info!(target: LOG_TARGET, "Starting block monitor with {} endpoints", self.sources.len());
        let mut state = MonitorState::Selecting;
        loop {
            state = self.step(state).await;
        }
    }

    /// Advances the state machine by one transition, sleeping where the state asks for it.
    pub async fn step(&mut self, state: MonitorState) -> MonitorState {
        match state {
            MonitorState::Selecting => match self.select_source(false).await {
                Some((source, block)) => {
                    self.handle_block(source, block).await;
                    MonitorState::Polling {
                        source,
                        failures: 0,
                    }
                }
                None => {
                    log::warn!(target: LOG_TARGET, "No endpoint answered, switching to slow polling");
                    MonitorState::Halted
                }
            },
            MonitorState::Polling { source, failures } => self.poll(source, failures).await,
            MonitorState::TimedOut { source } => {
                log::warn!(
                    target: LOG_TARGET,
                    "Endpoint {} timed out, cooling it down for {:?}",
                    self.sources[source].name(),
                    self.config.endpoint_cooldown
                );
                self.cooldowns
                    .insert(source, Instant::now() + self.config.endpoint_cooldown);
                MonitorState::Selecting
            }
            MonitorState::Halted => {
                self.alerts
                    .report_unhealthy(
                        HALTED_CONDITION,
                        format!(
                            "No new block from any endpoint for {:?}",
                            self.last_new_block.elapsed()
                        ),
                    )
                    .await;
                sleep(self.config.halted_poll_interval).await;
                // cooldowns are ignored here: any endpoint that answers is better than none
                match self.select_source(true).await {
                    Some((source, block)) => {
                        self.handle_block(source, block).await;
                        MonitorState::Polling {
                            source,
                            failures: 0,
                        }
                    }
                    None => MonitorState::Halted,
                }
            }
        }
    }

    async fn poll(&mut self, source: usize, failures: u32) -> MonitorState {
        let result = timeout(
            self.config.block_timeout,
            self.sources[source].get_block(BlockTag::Latest),
        )
        .await;

        let advanced = match result {
            Ok(Ok(Some(block))) => self.handle_block(source, block).await,
            Ok(Ok(None)) => false,
            Ok(Err(e)) => {
                log::debug!(target: LOG_TARGET, "Polling {} failed: {}", self.sources[source].name(), e);
                false
            }
            Err(_) => false,
        };

        if advanced || self.last_new_block.elapsed() < self.config.block_timeout {
            sleep(self.config.polling_interval).await;
            return MonitorState::Polling {
                source,
                failures: 0,
            };
        }

        let failures = failures + 1;
        if failures >= self.config.max_attempts {
            return MonitorState::TimedOut { source };
        }
        sleep(self.retry_delay(failures)).await;
        MonitorState::Polling { source, failures }
    }

    /// Exponential backoff after the `failures`-th consecutive failure.
    fn retry_delay(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(16);
        self.config
            .retry_base_delay
            .saturating_mul(1 << exponent)
            .min(self.config.retry_max_delay)
    }

    fn is_cooling(&self, source: usize) -> bool {
        self.cooldowns
            .get(&source)
            .is_some_and(|until| Instant::now() < *until)
    }

    /// Races every eligible endpoint for the latest block and returns the first to answer.
    async fn select_source(&mut self, ignore_cooldowns: bool) -> Option<(usize, Block)> {
        let short_timeout = self.config.short_request_timeout;
        let mut race: FuturesUnordered<_> = self
            .sources
            .iter()
            .enumerate()
            .filter(|(index, _)| ignore_cooldowns || !self.is_cooling(*index))
            .map(|(index, source)| {
                let source = Arc::clone(source);
                async move {
                    let result = timeout(short_timeout, source.get_block(BlockTag::Latest))
                        .await
                        .unwrap_or(Err(ProviderError::Timeout));
                    (index, result)
                }
            })
            .collect();

        while let Some((index, result)) = race.next().await {
            match result {
                Ok(Some(block)) => {
                    self.cooldowns.remove(&index);
                    log::info!(
                        target: LOG_TARGET,
                        "Selected endpoint {} at block {}",
                        self.sources[index].name(),
                        block.number
                    );
                    return Some((index, block));
                }
                Ok(None) => {}
                Err(e) => log::debug!(
                    target: LOG_TARGET,
                    "Endpoint {} lost the race: {}",
                    self.sources[index].name(),
                    e
                ),
            }
        }
        None
    }

    /// Classifies and publishes `block`. Returns whether the head moved.
    async fn handle_block(&mut self, source: usize, block: Block) -> bool {
        match self.history.classify(&block) {
            BlockClassification::Duplicate | BlockClassification::Stale => return false,
            BlockClassification::First | BlockClassification::Next => {}
            BlockClassification::Gap { from, to } => self.backfill(source, from, to).await,
            BlockClassification::Reorg { number, replaced } => {
                REORGS.inc();
                log::warn!(
                    target: LOG_TARGET,
                    "Reorg at block {}: {} replaced by block {} ({})",
                    number,
                    replaced,
                    block.number,
                    block.hash
                );
            }
        }
        self.accept(block);
        self.alerts
            .report_healthy(HALTED_CONDITION, "Block production resumed")
            .await;
        true
    }

    /// Fetches the skipped blocks, at most `max_backfill` of the most recent ones.
    async fn backfill(&mut self, source: usize, from: u64, to: u64) {
        let start = from.max((to + 1).saturating_sub(self.config.max_backfill));
        if start > from {
            log::warn!(
                target: LOG_TARGET,
                "Skipping blocks {}..{} during backfill",
                from,
                start
            );
        }
        for number in start..=to {
            let fetched = timeout(
                self.config.block_timeout,
                self.sources[source].get_block(BlockTag::Number(number)),
            )
            .await;
            match fetched {
                Ok(Ok(Some(block))) => self.accept(block),
                Ok(Ok(None)) => log::warn!(target: LOG_TARGET, "Block {} not found during backfill", number),
                Ok(Err(e)) => log::warn!(target: LOG_TARGET, "Failed to backfill block {}: {}", number, e),
                Err(_) => log::warn!(target: LOG_TARGET, "Timed out backfilling block {}", number),
            }
        }
    }

    fn accept(&mut self, block: Block) {
        log::debug!(target: LOG_TARGET, "New block {} ({})", block.number, block.hash);
        self.history.record(&block);
        self.last_new_block = Instant::now();
        CURRENT_BLOCK.set(block.number as i64);
        self.current.send_replace(Some(block.clone()));
        // no receivers just means nobody is waiting for a receipt
        let _ = self.blocks.send(block);
    }
}
