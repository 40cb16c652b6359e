//! Ties included ledger transactions back to the boops they carried.
//!
//! One ledger transaction may carry several boops. The entry point emits `BoopSubmitted` before
//! executing a boop and `BoopExecutionCompleted` after it, so the logs of one boop are the ones
//! between its own `BoopSubmitted` marker (recognized by recomputing the boop hash from the event)
//! and the next completion marker.
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::sol_types::SolEvent;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::{sleep, timeout_at, Instant};

use crate::constants::RECEIPT_FETCH_ATTEMPTS;
use crate::models::entry_point::IEntryPoint;
use crate::models::{Block, Boop, BoopReceipt, EvmLog, EvmReceipt, OnchainStatus, SubmitterError};
use crate::services::LedgerProvider;

const LOG_TARGET: &str = "receipts";

/// What came of waiting for a ledger transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum InclusionOutcome {
    Included(EvmReceipt),
    /// Seen in a block but the receipt could not be fetched.
    CantFetch,
    TimedOut,
}

pub struct ReceiptMatcher<P: LedgerProvider> {
    provider: Arc<P>,
    entry_point: Address,
    chain_id: u64,
    blocks: broadcast::Sender<Block>,
    retry_delay: Duration,
}

impl<P: LedgerProvider> ReceiptMatcher<P> {
    pub fn new(
        provider: Arc<P>,
        entry_point: Address,
        chain_id: u64,
        blocks: broadcast::Sender<Block>,
        retry_delay: Duration,
    ) -> Self {
        Self {
            provider,
            entry_point,
            chain_id,
            blocks,
            retry_delay,
        }
    }

    /// Logs emitted while executing the boop with `boop_hash`, marker events excluded.
    ///
    /// `None` when the receipt does not contain the boop.
    pub fn filter_logs(&self, logs: &[EvmLog], boop_hash: B256) -> Option<Vec<EvmLog>> {
        self.select(logs, boop_hash).map(|(_, selected)| selected)
    }

    /// The boop as executed, read back from its `BoopSubmitted` marker, with its logs.
    fn select(&self, logs: &[EvmLog], boop_hash: B256) -> Option<(Boop, Vec<EvmLog>)> {
        let mut executed = None;
        let mut selected = Vec::new();
        for log in logs {
            let from_entry_point = log.address == self.entry_point;
            let topic = log.topics.first();
            if executed.is_some() {
                if from_entry_point
                    && topic == Some(&IEntryPoint::BoopExecutionCompleted::SIGNATURE_HASH)
                {
                    return executed.map(|boop| (boop, selected));
                }
                selected.push(log.clone());
            } else if from_entry_point && topic == Some(&IEntryPoint::BoopSubmitted::SIGNATURE_HASH) {
                executed = self
                    .submitted_boop(log)
                    .filter(|boop| boop.hash(self.chain_id) == boop_hash);
            }
        }
        let executed = executed?;
        log::error!(
            target: LOG_TARGET,
            "Boop {} has a BoopSubmitted event but no BoopExecutionCompleted event",
            boop_hash
        );
        Some((executed, selected))
    }

    fn submitted_boop(&self, log: &EvmLog) -> Option<Boop> {
        let event = IEntryPoint::BoopSubmitted::decode_raw_log(
            log.topics.iter().copied(),
            &log.data,
            true,
        )
        .map_err(|e| {
            log::warn!(target: LOG_TARGET, "Undecodable BoopSubmitted event: {}", e);
        })
        .ok()?;
        Some(Boop::from(event))
    }

    /// Receipt of the boop with `boop_hash` carried by a successful ledger transaction.
    pub fn build_receipt(
        &self,
        boop_hash: B256,
        evm_receipt: &EvmReceipt,
    ) -> Result<BoopReceipt, SubmitterError> {
        let (boop, logs) = self.select(&evm_receipt.logs, boop_hash).ok_or_else(|| {
            SubmitterError::TransactionManagement(format!(
                "transaction {} does not contain boop {}",
                evm_receipt.transaction_hash, boop_hash
            ))
        })?;

        let mut status = OnchainStatus::Success;
        let mut revert_data = Bytes::new();
        for log in logs.iter().filter(|log| log.address == self.entry_point) {
            if let Some((log_status, data)) = execution_failure(log) {
                status = log_status;
                revert_data = data;
            }
        }

        Ok(self.receipt(&boop, boop_hash, evm_receipt, status, logs, revert_data))
    }

    /// Receipt of a boop whose ledger transaction reverted.
    ///
    /// Running out of exactly the simulated gas means the entry point ran out of gas.
    pub fn failed_receipt(
        &self,
        boop: &Boop,
        boop_hash: B256,
        evm_receipt: &EvmReceipt,
        simulated_gas: Option<u64>,
    ) -> BoopReceipt {
        let status = if simulated_gas == Some(evm_receipt.gas_used) {
            OnchainStatus::EntryPointOutOfGas
        } else {
            OnchainStatus::UnexpectedReverted
        };
        self.receipt(boop, boop_hash, evm_receipt, status, vec![], Bytes::new())
    }

    fn receipt(
        &self,
        boop: &Boop,
        boop_hash: B256,
        evm_receipt: &EvmReceipt,
        status: OnchainStatus,
        logs: Vec<EvmLog>,
        revert_data: Bytes,
    ) -> BoopReceipt {
        BoopReceipt {
            boop_hash,
            account: boop.account,
            nonce_track: boop.nonce_track,
            nonce_value: boop.nonce_value,
            entry_point: evm_receipt.to.unwrap_or(self.entry_point),
            status,
            description: status.description().to_string(),
            logs,
            revert_data,
            evm_tx_hash: evm_receipt.transaction_hash,
            block_hash: evm_receipt.block_hash,
            block_number: evm_receipt.block_number,
            gas_used: evm_receipt.gas_used,
            gas_cost: U256::from(evm_receipt.gas_used)
                * U256::from(evm_receipt.effective_gas_price),
            boop: boop.clone(),
        }
    }

    /// Waits for `tx_hash` to be included, checking each new block until `wait` elapses.
    pub async fn wait_for_inclusion(&self, tx_hash: B256, wait: Duration) -> InclusionOutcome {
        let deadline = Instant::now() + wait;
        let mut blocks = self.blocks.subscribe();

        if let Ok(Some(receipt)) = self.provider.get_transaction_receipt(tx_hash).await {
            return InclusionOutcome::Included(receipt);
        }

        loop {
            match timeout_at(deadline, blocks.recv()).await {
                Ok(Ok(block)) => {
                    // blocks from some nodes omit the hash list, check those anyway
                    if !block.transactions.is_empty() && !block.transactions.contains(&tx_hash) {
                        continue;
                    }
                    match self.fetch_with_retries(tx_hash).await {
                        Some(receipt) => return InclusionOutcome::Included(receipt),
                        None if block.transactions.contains(&tx_hash) => {
                            return InclusionOutcome::CantFetch
                        }
                        None => {}
                    }
                }
                Ok(Err(RecvError::Lagged(skipped))) => {
                    log::debug!(target: LOG_TARGET, "Receipt wait for {} skipped {} blocks", tx_hash, skipped);
                    if let Ok(Some(receipt)) = self.provider.get_transaction_receipt(tx_hash).await {
                        return InclusionOutcome::Included(receipt);
                    }
                }
                Ok(Err(RecvError::Closed)) => {
                    // no more blocks, fall back to polling until the deadline
                    while Instant::now() < deadline {
                        if let Ok(Some(receipt)) =
                            self.provider.get_transaction_receipt(tx_hash).await
                        {
                            return InclusionOutcome::Included(receipt);
                        }
                        sleep(self.retry_delay.max(Duration::from_millis(100))).await;
                    }
                    return InclusionOutcome::TimedOut;
                }
                Err(_) => {
                    // last look in case the block notification was missed
                    return match self.provider.get_transaction_receipt(tx_hash).await {
                        Ok(Some(receipt)) => {
                            log::info!(target: LOG_TARGET, "Found receipt of {} after the wait expired", tx_hash);
                            InclusionOutcome::Included(receipt)
                        }
                        _ => InclusionOutcome::TimedOut,
                    };
                }
            }
        }
    }

    /// Nodes do not always serve a receipt as soon as the block is out, so retry with a linear
    /// backoff.
    async fn fetch_with_retries(&self, tx_hash: B256) -> Option<EvmReceipt> {
        for attempt in 1..=RECEIPT_FETCH_ATTEMPTS {
            match self.provider.get_transaction_receipt(tx_hash).await {
                Ok(Some(receipt)) => return Some(receipt),
                Ok(None) => {}
                Err(e) => log::debug!(target: LOG_TARGET, "Fetching receipt of {} failed: {}", tx_hash, e),
            }
            if attempt < RECEIPT_FETCH_ATTEMPTS {
                sleep(self.retry_delay * attempt).await;
            }
        }
        None
    }
}

fn execution_failure(log: &EvmLog) -> Option<(OnchainStatus, Bytes)> {
    let topic = *log.topics.first()?;
    let topics = log.topics.iter().copied();
    if topic == IEntryPoint::CallReverted::SIGNATURE_HASH {
        IEntryPoint::CallReverted::decode_raw_log(topics, &log.data, true)
            .ok()
            .map(|e| (OnchainStatus::CallReverted, e.revertData))
    } else if topic == IEntryPoint::ExecutionRejected::SIGNATURE_HASH {
        IEntryPoint::ExecutionRejected::decode_raw_log(topics, &log.data, true)
            .ok()
            .map(|e| (OnchainStatus::ExecuteRejected, e.revertData))
    } else if topic == IEntryPoint::ExecutionReverted::SIGNATURE_HASH {
        IEntryPoint::ExecutionReverted::decode_raw_log(topics, &log.data, true)
            .ok()
            .map(|e| (OnchainStatus::ExecuteReverted, e.revertData))
    } else {
        None
    }
}
