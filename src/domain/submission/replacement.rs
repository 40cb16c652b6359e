//! Follow-up of sent boops: receipts once included, replacement and cancellation when stuck.
use alloy::primitives::{Address, Bytes, B256};

use super::SubmissionPipeline;
use crate::constants::{
    CANCEL_RETRY_BASE_DELAY_MS, CANCEL_RETRY_MAX_DELAY_MS, MAX_CANCEL_ATTEMPTS, TRANSFER_GAS_LIMIT,
};
use crate::domain::policy::{note_possible_misbehaviour, Stage};
use crate::domain::InclusionOutcome;
use crate::metrics::STUCK_TRANSACTIONS;
use crate::models::{Boop, EvmReceipt, FeeQuote, GasFill, SentTransaction, SubmitterError};
use crate::repositories::BoopReceiptRepository;
use crate::services::{calculate_retry_delay, LedgerProvider, ProviderError, Signer};

const LOG_TARGET: &str = "receipts";

fn rpc_message(error: &SubmitterError) -> Option<String> {
    match error {
        SubmitterError::Provider(ProviderError::RpcError { message, .. }) => {
            Some(message.to_lowercase())
        }
        _ => None,
    }
}

/// The node already has a transaction at this nonce paying at least as much.
fn is_underpriced(error: &SubmitterError) -> bool {
    rpc_message(error)
        .is_some_and(|message| message.contains("underpriced") || message.contains("replacement"))
}

/// The nonce was consumed by an included transaction.
fn is_nonce_too_low(error: &SubmitterError) -> bool {
    rpc_message(error).is_some_and(|message| message.contains("nonce too low"))
}

impl<P, S, R> SubmissionPipeline<P, S, R>
where
    P: LedgerProvider + 'static,
    S: Signer + 'static,
    R: BoopReceiptRepository + 'static,
{
    /// Follows a sent boop until its receipt is recorded or the relay gives up on it.
    ///
    /// `filled` is the variant first sent; replacements are filled again from the stored
    /// original with `fill`.
    pub(super) async fn track_inclusion(
        self,
        filled: Boop,
        boop_hash: B256,
        fill: GasFill,
        sent: SentTransaction,
        tx_gas: u64,
    ) {
        let stuck_wait = self.settings.limits.stuck_tx_wait_time;
        let outcome = match self.matcher.wait_for_inclusion(sent.tx_hash, stuck_wait).await {
            InclusionOutcome::TimedOut => {
                self.recover_stuck(&filled, boop_hash, &fill, &sent, tx_gas)
                    .await
            }
            outcome => outcome,
        };

        match outcome {
            InclusionOutcome::Included(evm_receipt) => {
                self.record_receipt(&filled, boop_hash, &evm_receipt, tx_gas)
                    .await
            }
            InclusionOutcome::CantFetch => log::warn!(
                target: LOG_TARGET,
                "Boop {} was included but its receipt could not be fetched",
                boop_hash
            ),
            InclusionOutcome::TimedOut => log::warn!(
                target: LOG_TARGET,
                "Gave up on boop {} after its transaction got stuck",
                boop_hash
            ),
        }
        self.retire(boop_hash);
    }

    async fn record_receipt(
        &self,
        filled: &Boop,
        boop_hash: B256,
        evm_receipt: &EvmReceipt,
        tx_gas: u64,
    ) {
        let receipt = if evm_receipt.status {
            match self.matcher.build_receipt(boop_hash, evm_receipt) {
                Ok(receipt) => receipt,
                Err(e) => {
                    log::error!(target: LOG_TARGET, "No receipt for boop {}: {}", boop_hash, e);
                    return;
                }
            }
        } else {
            self.matcher
                .failed_receipt(filled, boop_hash, evm_receipt, Some(tx_gas))
        };

        note_possible_misbehaviour(boop_hash, receipt.status, Stage::Execution);
        log::info!(
            target: LOG_TARGET,
            "Boop {} included in block {} by {}: {}",
            boop_hash,
            receipt.block_number,
            receipt.evm_tx_hash,
            receipt.status
        );
        if let Err(e) = self.receipts.save_receipt(&receipt).await {
            log::error!(target: LOG_TARGET, "Failed to store receipt of boop {}: {}", boop_hash, e);
        }
        self.publish_receipt(receipt);
    }

    /// Replaces a stuck transaction with better fees, and cancels its nonce when that does not
    /// land either.
    async fn recover_stuck(
        &self,
        filled: &Boop,
        boop_hash: B256,
        fill: &GasFill,
        sent: &SentTransaction,
        tx_gas: u64,
    ) -> InclusionOutcome {
        let stuck_wait = self.settings.limits.stuck_tx_wait_time;
        STUCK_TRANSACTIONS.with_label_values(&["replace"]).inc();
        log::warn!(
            "Transaction {} of boop {} not included after {:?}, replacing it",
            sent.tx_hash,
            boop_hash,
            stuck_wait
        );

        let mut latest_fees = sent.fees;
        match self.replace(boop_hash, fill, sent, tx_gas).await {
            Ok(replacement) => {
                latest_fees = replacement.fees;
                let outcome = self
                    .matcher
                    .wait_for_inclusion(replacement.tx_hash, stuck_wait)
                    .await;
                if outcome != InclusionOutcome::TimedOut {
                    return outcome;
                }
            }
            Err(e) => log::warn!("Replacing transaction {} failed: {}", sent.tx_hash, e),
        }

        // the original may have won the race against its replacement
        if let Ok(Some(evm_receipt)) = self.provider.get_transaction_receipt(sent.tx_hash).await {
            return InclusionOutcome::Included(evm_receipt);
        }

        self.cancel_stuck(filled, sent, latest_fees).await;
        InclusionOutcome::TimedOut
    }

    /// Resends the boop at the stuck transaction's nonce, refilled from the original so that
    /// relay-filled fees follow the new quote.
    async fn replace(
        &self,
        boop_hash: B256,
        fill: &GasFill,
        sent: &SentTransaction,
        tx_gas: u64,
    ) -> Result<SentTransaction, SubmitterError> {
        let original = self
            .store
            .get_by_hash(&boop_hash)
            .ok_or(SubmitterError::UnknownBoop(boop_hash))?;
        let estimate = self.quote(Some(&sent.fees)).await?;
        let fees = self.fees.fees_for_boop(&original, &estimate)?;
        let refilled = original.filled(fill, fees.max_fee_per_gas);
        let replacement = self
            .send_submit(sent.executor, &refilled, tx_gas, fees, Some(sent.nonce))
            .await?;
        log::info!(
            "Replaced transaction {} of boop {} with {}",
            sent.tx_hash,
            boop_hash,
            replacement.tx_hash
        );
        if let Err(e) = self
            .receipts
            .save_submission(boop_hash, replacement.tx_hash)
            .await
        {
            log::error!("Failed to record replacement of boop {}: {}", boop_hash, e);
        }
        Ok(replacement)
    }

    async fn cancel_stuck(&self, filled: &Boop, sent: &SentTransaction, fees: FeeQuote) {
        STUCK_TRANSACTIONS.with_label_values(&["cancel"]).inc();
        // the account's nonce did not move onchain
        self.gate.reset_local_nonce(&filled.nonce_key()).await;

        match self.cancel_nonce(sent.executor, sent.nonce, fees).await {
            Ok(Some(tx_hash)) => log::info!(
                "Cancelled nonce {} of executor {} with {}",
                sent.nonce,
                sent.executor,
                tx_hash
            ),
            Ok(None) => log::info!(
                "Nonce {} of executor {} was used before it could be cancelled",
                sent.nonce,
                sent.executor
            ),
            Err(e) => {
                self.executor_nonces.reset(sent.executor);
                log::error!(
                    "Failed to cancel nonce {} of executor {}: {}",
                    sent.nonce,
                    sent.executor,
                    e
                );
                self.alerts
                    .notify(format!(
                        "Executor {} may be stuck at nonce {}: cancellation failed: {}",
                        sent.executor, sent.nonce, e
                    ))
                    .await;
            }
        }
    }

    /// Uses up `nonce` of `executor` with an empty self-transfer outbidding `fees`.
    ///
    /// Returns `None` when the nonce turns out to be used already.
    pub(super) async fn cancel_nonce(
        &self,
        executor: Address,
        nonce: u64,
        fees: FeeQuote,
    ) -> Result<Option<B256>, SubmitterError> {
        let mut replaced = fees;
        let mut last_error = None;

        for attempt in 0..MAX_CANCEL_ATTEMPTS {
            let bumped = self.quote(Some(&replaced)).await?.quote;
            let result = self
                .send_transaction(
                    executor,
                    executor,
                    Bytes::new(),
                    TRANSFER_GAS_LIMIT,
                    bumped,
                    Some(nonce),
                )
                .await;
            let error = match result {
                Ok(cancellation) => return Ok(Some(cancellation.tx_hash)),
                Err(e) if is_nonce_too_low(&e) => return Ok(None),
                Err(e) => e,
            };

            if is_underpriced(&error) {
                replaced = bumped;
            } else {
                let delay = calculate_retry_delay(
                    u8::try_from(attempt).unwrap_or(u8::MAX),
                    CANCEL_RETRY_BASE_DELAY_MS,
                    CANCEL_RETRY_MAX_DELAY_MS,
                );
                tokio::time::sleep(delay).await;
            }
            log::debug!(
                "Cancellation attempt {} for nonce {} of {} failed: {}",
                attempt + 1,
                nonce,
                executor,
                error
            );
            last_error = Some(error);
        }

        Err(last_error.unwrap_or_else(|| {
            SubmitterError::TransactionManagement(format!(
                "could not cancel nonce {} of executor {}",
                nonce, executor
            ))
        }))
    }
}
