use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use alloy::consensus::TxEip1559;
use alloy::primitives::{Address, Bytes, TxKind, B256, U256};
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{broadcast, watch};

use super::{BoopState, BoopValidator, SubmitResponse, SubmitterTrait};
use crate::config::{AccountFactoryConfig, FeeConfig, GasConfig, LimitsConfig, ServerConfig};
use crate::constants::ENTRYPOINT_GAS_BUFFER;
use crate::domain::policy::{note_possible_misbehaviour, Stage};
use crate::domain::{
    AccountFactory, ExecutorPool, ExecutorStats, FeeOracle, NonceGate, NonceGateLimits, ReceiptMatcher,
};
use crate::metrics::SUBMISSIONS;
use crate::models::entry_point::IEntryPoint;
use crate::models::{
    Block, Boop, BoopReceipt, CreateAccountResponse, FeeEstimate, FeeQuote, GasFill,
    OnchainStatus, PendingBoop, SentTransaction, SimulationReport, SubmitterError,
};
use crate::repositories::{
    BoopReceiptRepository, BoopStore, ExecutorNonceCounterTrait, InMemoryExecutorNonceCounter,
    SimulationCache,
};
use crate::services::{AlertManager, LedgerProvider, Signer};

/// Chain and policy settings of the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub chain_id: u64,
    pub entry_point: Address,
    pub fees: FeeConfig,
    pub gas: GasConfig,
    pub limits: LimitsConfig,
    /// Base delay between receipt fetch attempts.
    pub receipt_retry_delay: Duration,
    pub simulation_cache_size: usize,
    /// Account creation is refused without a factory.
    pub accounts: Option<AccountFactoryConfig>,
}

impl From<&ServerConfig> for PipelineSettings {
    fn from(config: &ServerConfig) -> Self {
        Self {
            chain_id: config.chain_id,
            entry_point: config.entry_point,
            fees: config.fees.clone(),
            gas: config.gas.clone(),
            limits: config.limits.clone(),
            receipt_retry_delay: Duration::from_millis(config.linear_retry_delay_ms),
            simulation_cache_size: crate::constants::SIMULATION_CACHE_SIZE,
            accounts: config.accounts.clone(),
        }
    }
}

/// The relay's submission flow over the core components.
///
/// Cloning is cheap: every component is shared, which lets each sent boop be followed by its
/// own background task.
pub struct SubmissionPipeline<P, S, R>
where
    P: LedgerProvider + 'static,
    S: Signer + 'static,
    R: BoopReceiptRepository + 'static,
{
    pub(super) provider: Arc<P>,
    pub(super) signer: Arc<S>,
    pub(super) receipts: Arc<R>,
    pub(super) store: Arc<BoopStore>,
    pub(super) simulations: Arc<SimulationCache>,
    pub(super) gate: Arc<NonceGate<P>>,
    pub(super) executors: Arc<ExecutorPool>,
    pub(super) executor_nonces: Arc<dyn ExecutorNonceCounterTrait>,
    pub(super) fees: Arc<FeeOracle>,
    pub(super) matcher: Arc<ReceiptMatcher<P>>,
    pub(super) alerts: Arc<AlertManager>,
    pub(super) current_block: watch::Receiver<Option<Block>>,
    /// One entry per admitted boop until its flow ends, carrying the receipt when there is one.
    pub(super) receipt_waiters: Arc<DashMap<B256, watch::Sender<Option<BoopReceipt>>>>,
    pub(super) accounts: Option<Arc<AccountFactory<P>>>,
    pub(super) settings: Arc<PipelineSettings>,
}

impl<P, S, R> Clone for SubmissionPipeline<P, S, R>
where
    P: LedgerProvider + 'static,
    S: Signer + 'static,
    R: BoopReceiptRepository + 'static,
{
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            signer: self.signer.clone(),
            receipts: self.receipts.clone(),
            store: self.store.clone(),
            simulations: self.simulations.clone(),
            gate: self.gate.clone(),
            executors: self.executors.clone(),
            executor_nonces: self.executor_nonces.clone(),
            fees: self.fees.clone(),
            matcher: self.matcher.clone(),
            alerts: self.alerts.clone(),
            current_block: self.current_block.clone(),
            receipt_waiters: self.receipt_waiters.clone(),
            accounts: self.accounts.clone(),
            settings: self.settings.clone(),
        }
    }
}

impl<P, S, R> SubmissionPipeline<P, S, R>
where
    P: LedgerProvider + 'static,
    S: Signer + 'static,
    R: BoopReceiptRepository + 'static,
{
    pub fn new(
        provider: Arc<P>,
        signer: Arc<S>,
        receipts: Arc<R>,
        alerts: Arc<AlertManager>,
        current_block: watch::Receiver<Option<Block>>,
        blocks: broadcast::Sender<Block>,
        settings: PipelineSettings,
    ) -> Self {
        let executors = ExecutorPool::new(&signer.executors(), settings.limits.executor_binding_ttl);
        let gate = NonceGate::new(provider.clone(), NonceGateLimits::from(&settings.limits));
        let matcher = ReceiptMatcher::new(
            provider.clone(),
            settings.entry_point,
            settings.chain_id,
            blocks,
            settings.receipt_retry_delay,
        );
        let accounts = settings
            .accounts
            .clone()
            .map(|config| Arc::new(AccountFactory::new(provider.clone(), config)));
        Self {
            provider,
            signer,
            receipts,
            store: Arc::new(BoopStore::new()),
            simulations: Arc::new(SimulationCache::new(settings.simulation_cache_size)),
            gate: Arc::new(gate),
            executors: Arc::new(executors),
            executor_nonces: Arc::new(InMemoryExecutorNonceCounter::new()),
            fees: Arc::new(FeeOracle::new(settings.fees.clone())),
            matcher: Arc::new(matcher),
            alerts,
            current_block,
            receipt_waiters: Arc::new(DashMap::new()),
            accounts,
            settings: Arc::new(settings),
        }
    }

    pub fn executor_pool(&self) -> Arc<ExecutorPool> {
        self.executors.clone()
    }

    /// Fees on top of the latest block's base fee, or the node's gas price when the block has
    /// none.
    pub(super) async fn quote(
        &self,
        replaced: Option<&FeeQuote>,
    ) -> Result<FeeEstimate, SubmitterError> {
        let head_base_fee = self
            .current_block
            .borrow()
            .as_ref()
            .and_then(|block| block.base_fee_per_gas);
        let base_fee = match head_base_fee {
            Some(base_fee) => base_fee,
            None => self.provider.get_gas_price().await?,
        };
        self.fees.quote(base_fee, replaced)
    }

    async fn run_simulation(
        &self,
        boop: &Boop,
        boop_hash: B256,
    ) -> Result<SimulationReport, SubmitterError> {
        let mut output = self.provider.simulate(boop).await?;
        if output.status.is_success() {
            output.submitter_fee = self.fees.submitter_fee(boop);
        }
        let mut report = SimulationReport {
            boop_hash,
            output,
            fees: None,
            fee_too_low: false,
            fee_too_high: false,
        };

        if report.output.status.is_success() {
            match self.quote(None).await {
                Ok(estimate) => {
                    report.fee_too_low = self.fees.is_fee_too_low(boop, &estimate);
                    report.fees = Some(estimate);
                }
                Err(SubmitterError::GasPriceTooHigh { .. }) => report.fee_too_high = true,
                Err(e) => return Err(e),
            }
        } else {
            note_possible_misbehaviour(boop_hash, report.output.status, Stage::Simulation);
        }

        log::debug!(
            "Simulated boop {}: {} (future nonce: {})",
            boop_hash,
            report.output.status,
            report.output.future_nonce
        );
        self.simulations.insert(report.clone());
        Ok(report)
    }

    fn check_simulation(report: &SimulationReport) -> Result<(), SubmitterError> {
        let output = &report.output;
        if !output.status.is_success() {
            return Err(SubmitterError::onchain(
                output.status,
                output.revert_data.clone(),
            ));
        }
        if output.validity_unknown || output.payment_validity_unknown {
            return Err(SubmitterError::Onchain {
                status: OnchainStatus::ValidationReverted,
                description: "More information is needed for the boop to pass validation, most likely a signature."
                    .to_string(),
                revert_data: output.revert_data.clone(),
            });
        }
        Ok(())
    }

    /// Admits the boop, or rejects it when the same hash is already being processed.
    async fn admit_and_process(
        &self,
        boop: &Boop,
        boop_hash: B256,
    ) -> Result<SubmitResponse, SubmitterError> {
        BoopValidator::validate(boop, &self.settings.gas)?;
        let previous = self
            .store
            .get_by_nonce(boop.account, boop.nonce_track, boop.nonce_value);
        if !self.store.set(boop_hash, boop) {
            return Err(SubmitterError::AlreadyProcessing(boop_hash));
        }
        if let Some(previous) = previous {
            log::info!(
                "Boop {} competes with boop {} for nonce {} of {}",
                boop_hash,
                previous.hash(self.settings.chain_id),
                boop.nonce_value,
                boop.nonce_key()
            );
        }
        self.receipt_waiters
            .insert(boop_hash, watch::channel(None).0);

        let result = self.process(boop, boop_hash).await;
        if result.is_err() {
            self.retire(boop_hash);
        }
        result
    }

    async fn process(
        &self,
        boop: &Boop,
        boop_hash: B256,
    ) -> Result<SubmitResponse, SubmitterError> {
        let mut report = self.run_simulation(boop, boop_hash).await?;
        Self::check_simulation(&report)?;

        if report.output.future_nonce && self.gate.is_blocked(boop).await? {
            log::debug!("Boop {} waits for earlier nonces", boop_hash);
            self.gate.wait_until_unblocked(boop, boop_hash).await?;
            // the chain moved while waiting
            report = self.run_simulation(boop, boop_hash).await?;
            Self::check_simulation(&report)?;
        }

        let estimate = self.quote(None).await?;
        let tx_fees = self.fees.fees_for_boop(boop, &estimate)?;
        let fill = GasFill::from_simulation(&report.output, self.settings.gas.safety_margin);
        let filled = boop.filled(&fill, tx_fees.max_fee_per_gas);
        let tx_gas = u64::from(filled.gas_limit) + ENTRYPOINT_GAS_BUFFER;

        let executor = self.executors.acquire(boop_hash, boop.nonce_key())?;
        let sent = match self
            .send_submit(executor, &filled, tx_gas, tx_fees, None)
            .await
        {
            Ok(sent) => sent,
            Err(e) => {
                // the local view of the lane may be stale now
                self.gate.reset_local_nonce(&boop.nonce_key()).await;
                return Err(e);
            }
        };
        log::info!(
            "Sent boop {} in transaction {} from executor {} at nonce {}",
            boop_hash,
            sent.tx_hash,
            executor,
            sent.nonce
        );

        self.gate.increment_local_nonce(boop).await;
        if let Err(e) = self.receipts.save_submission(boop_hash, sent.tx_hash).await {
            log::error!(
                "Failed to record transaction {} of boop {}: {}",
                sent.tx_hash,
                boop_hash,
                e
            );
        }

        let response = SubmitResponse {
            status: OnchainStatus::Success,
            boop_hash,
            tx_hash: sent.tx_hash,
        };
        let tracker = self.clone();
        tokio::spawn(async move {
            tracker
                .track_inclusion(filled, boop_hash, fill, sent, tx_gas)
                .await
        });
        Ok(response)
    }

    /// Sends `filled` to the entry point from `executor`. `nonce` is only given for replacements.
    pub(super) async fn send_submit(
        &self,
        executor: Address,
        filled: &Boop,
        gas_limit: u64,
        fees: FeeQuote,
        nonce: Option<u64>,
    ) -> Result<SentTransaction, SubmitterError> {
        let input = IEntryPoint::submitCall {
            encodedBoop: filled.encode(),
        }
        .abi_encode();
        self.send_transaction(
            executor,
            self.settings.entry_point,
            input.into(),
            gas_limit,
            fees,
            nonce,
        )
        .await
    }

    /// Signs and sends a transaction. Without an explicit `nonce` the executor's next local nonce
    /// is used, and dropped again if the transaction does not go out.
    pub(super) async fn send_transaction(
        &self,
        executor: Address,
        to: Address,
        input: Bytes,
        gas_limit: u64,
        fees: FeeQuote,
        nonce: Option<u64>,
    ) -> Result<SentTransaction, SubmitterError> {
        let (nonce, fresh) = match nonce {
            Some(nonce) => (nonce, false),
            None => (self.next_executor_nonce(executor).await?, true),
        };
        let transaction = TxEip1559 {
            chain_id: self.settings.chain_id,
            nonce,
            gas_limit,
            max_fee_per_gas: fees.max_fee_per_gas,
            max_priority_fee_per_gas: fees.max_priority_fee_per_gas,
            to: TxKind::Call(to),
            value: U256::ZERO,
            access_list: Default::default(),
            input,
        };

        let result = match self.signer.sign_transaction(executor, transaction).await {
            Ok(signed) => self
                .provider
                .send_raw_transaction(&signed.raw)
                .await
                .map_err(SubmitterError::from),
            Err(e) => Err(e.into()),
        };
        match result {
            Ok(tx_hash) => Ok(SentTransaction {
                executor,
                nonce,
                tx_hash,
                fees,
            }),
            Err(e) => {
                if fresh {
                    self.executor_nonces.reset(executor);
                }
                log::warn!(
                    "Sending transaction from {} at nonce {} failed: {}",
                    executor,
                    nonce,
                    e
                );
                Err(e)
            }
        }
    }

    async fn next_executor_nonce(&self, executor: Address) -> Result<u64, SubmitterError> {
        if self.executor_nonces.get(executor).is_none() {
            let pending = self
                .provider
                .get_transaction_count(executor, true)
                .await?;
            self.executor_nonces.seed(executor, pending);
        }
        self.executor_nonces
            .get_and_increment(executor)
            .map_err(|e| SubmitterError::TransactionManagement(e.to_string()))
    }

    /// Ends the relay's involvement with a boop. Receipt waiters still subscribed see the channel
    /// close.
    pub(super) fn retire(&self, boop_hash: B256) {
        self.store.delete(&boop_hash);
        self.receipt_waiters.remove(&boop_hash);
    }

    /// Hands a receipt to everyone waiting for it.
    pub(super) fn publish_receipt(&self, receipt: BoopReceipt) {
        if let Some((_, waiter)) = self.receipt_waiters.remove(&receipt.boop_hash) {
            waiter.send_replace(Some(receipt));
        }
    }
}

fn outcome_label(result: &Result<SubmitResponse, SubmitterError>) -> &'static str {
    let Err(error) = result else {
        return "success";
    };
    match error {
        SubmitterError::InvalidNonce(_) => "invalid_nonce",
        SubmitterError::InvalidBoop(_) => "invalid_boop",
        SubmitterError::MissingGasValues(_) => "missing_gas_values",
        SubmitterError::GasPriceTooHigh { .. } => "gas_price_too_high",
        SubmitterError::GasPriceTooLow { .. } => "gas_price_too_low",
        SubmitterError::AlreadyProcessing(_) => "already_processing",
        SubmitterError::Onchain { .. } => "onchain_failure",
        SubmitterError::BufferExceeded => "buffer_exceeded",
        SubmitterError::OverCapacity => "over_capacity",
        SubmitterError::NonceTooFarAhead { .. } => "nonce_too_far_ahead",
        SubmitterError::Replaced => "replaced",
        SubmitterError::SubmitTimeout => "submit_timeout",
        SubmitterError::ReceiptTimeout(_) => "receipt_timeout",
        SubmitterError::UnknownBoop(_) => "unknown_boop",
        SubmitterError::AccountCreationDisabled => "account_creation_disabled",
        SubmitterError::Provider(_) => "provider_error",
        SubmitterError::Signer(_) => "signer_error",
        SubmitterError::Repository(_) => "repository_error",
        SubmitterError::TransactionManagement(_) => "transaction_management",
        SubmitterError::Unexpected(_) => "unexpected",
    }
}

#[async_trait]
impl<P, S, R> SubmitterTrait for SubmissionPipeline<P, S, R>
where
    P: LedgerProvider + 'static,
    S: Signer + 'static,
    R: BoopReceiptRepository + 'static,
{
    async fn simulate(&self, boop: Boop) -> Result<SimulationReport, SubmitterError> {
        let boop_hash = boop.hash(self.settings.chain_id);
        self.run_simulation(&boop, boop_hash).await
    }

    async fn submit(&self, boop: Boop) -> Result<SubmitResponse, SubmitterError> {
        let boop_hash = boop.hash(self.settings.chain_id);
        let result = self.admit_and_process(&boop, boop_hash).await;
        SUBMISSIONS
            .with_label_values(&[outcome_label(&result)])
            .inc();
        if let Err(e) = &result {
            log::info!("Submission of boop {} failed: {}", boop_hash, e);
        }
        result
    }

    async fn execute(&self, boop: Boop) -> Result<BoopReceipt, SubmitterError> {
        let submitted = self.submit(boop).await?;
        self.wait_for_receipt(submitted.boop_hash, self.settings.limits.receipt_timeout)
            .await
    }

    async fn get_state(&self, boop_hash: B256) -> Result<BoopState, SubmitterError> {
        if let Some(receipt) = self.receipts.find_receipt(boop_hash).await? {
            return Ok(BoopState::Included {
                receipt: Box::new(receipt),
            });
        }
        match self.simulations.get(&boop_hash) {
            Some(simulation) => Ok(BoopState::NotIncluded {
                simulation,
                in_flight: self.store.contains(&boop_hash),
            }),
            None => Err(SubmitterError::UnknownBoop(boop_hash)),
        }
    }

    async fn get_pending(&self, account: Address) -> Result<Vec<PendingBoop>, SubmitterError> {
        let blocked: HashSet<B256> = self
            .gate
            .pending_for(account)
            .await
            .into_iter()
            .map(|pending| pending.boop_hash)
            .collect();
        Ok(self
            .store
            .get_by_account(account)
            .into_iter()
            .map(|(boop_hash, boop)| PendingBoop {
                nonce_track: boop.nonce_track,
                nonce_value: boop.nonce_value,
                boop_hash,
                blocked: blocked.contains(&boop_hash),
            })
            .collect())
    }

    async fn wait_for_receipt(
        &self,
        boop_hash: B256,
        timeout: Duration,
    ) -> Result<BoopReceipt, SubmitterError> {
        let timeout = timeout.min(self.settings.limits.max_receipt_timeout);
        // subscribe before looking at the repository so that a receipt published in between is
        // not missed
        let waiter = self
            .receipt_waiters
            .get(&boop_hash)
            .map(|sender| sender.subscribe());

        if let Some(receipt) = self.receipts.find_receipt(boop_hash).await? {
            return Ok(receipt);
        }

        let Some(mut waiter) = waiter else {
            // sent earlier but no receipt was recorded
            if self.receipts.find_tx_hash(boop_hash).await?.is_some() {
                return Err(SubmitterError::ReceiptTimeout(boop_hash));
            }
            return Err(SubmitterError::UnknownBoop(boop_hash));
        };

        let waited = tokio::time::timeout(timeout, waiter.wait_for(|receipt| receipt.is_some()))
            .await
            .map(|changed| changed.map(|receipt| receipt.clone()));
        match waited {
            Ok(Ok(Some(receipt))) => Ok(receipt),
            // the flow ended without a receipt, unless it was stored in between
            Ok(Ok(None)) | Ok(Err(_)) => match self.receipts.find_receipt(boop_hash).await? {
                Some(receipt) => Ok(receipt),
                None => Err(SubmitterError::ReceiptTimeout(boop_hash)),
            },
            Err(_) => Err(SubmitterError::ReceiptTimeout(boop_hash)),
        }
    }

    async fn create_account(
        &self,
        salt: B256,
        owner: Address,
    ) -> Result<CreateAccountResponse, SubmitterError> {
        self.deploy_account(salt, owner).await
    }

    fn executor_stats(&self) -> Vec<ExecutorStats> {
        self.executors.stats()
    }
}


#[cfg(test)]
mod tests {
    use super::test_utils::*;
    use super::*;
    use crate::domain::receipt::test_utils::{boop_logs, create_test_receipt};
    use crate::models::block::test_utils::create_test_block;
    use crate::models::boop::test_utils::{create_sponsored_boop, create_test_boop, TEST_CHAIN_ID};
    use crate::models::{EvmReceipt, SimulationOutput};
    use crate::services::{MockLedgerProvider, MockSigner, ProviderError};
    use alloy::primitives::{keccak256, I256};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn provider_with_simulation(output: SimulationOutput) -> MockLedgerProvider {
        let mut provider = MockLedgerProvider::new();
        provider
            .expect_simulate()
            .returning(move |_| Ok(output.clone()));
        provider.expect_get_nonce().returning(|_, _| Ok(0));
        provider
            .expect_get_transaction_count()
            .returning(|_, _| Ok(5));
        provider.expect_get_gas_price().returning(|| Ok(1_000_000_000));
        provider
    }

    #[tokio::test]
    async fn test_simulate_reports_fee_flags() {
        let provider = provider_with_simulation(successful_simulation());
        let harness = setup_pipeline(provider, nonce_encoding_signer());

        let mut boop = create_test_boop(0);
        boop.max_fee_per_gas = U256::from(1_000u64);
        let report = harness.pipeline.simulate(boop.clone()).await.unwrap();

        assert_eq!(report.boop_hash, boop.hash(TEST_CHAIN_ID));
        assert!(report.fee_too_low);
        assert!(!report.fee_too_high);
        assert!(report.fees.is_some());

        // the simulation is kept for getState
        let state = harness
            .pipeline
            .get_state(report.boop_hash)
            .await
            .unwrap();
        assert!(matches!(state, BoopState::NotIncluded { in_flight: false, .. }));
    }

    #[tokio::test]
    async fn test_simulate_fee_too_high() {
        let provider = provider_with_simulation(successful_simulation());
        let harness = setup_pipeline(provider, nonce_encoding_signer());
        let mut expensive = create_test_block(11, 0);
        expensive.base_fee_per_gas = Some(FeeConfig::default().max_basefee * 2);
        harness.head.send_replace(Some(expensive));

        let report = harness
            .pipeline
            .simulate(create_sponsored_boop(0))
            .await
            .unwrap();
        assert!(report.fee_too_high);
        assert!(report.fees.is_none());
    }

    #[tokio::test]
    async fn test_submit_sends_transaction() {
        let mut provider = provider_with_simulation(successful_simulation());
        let sent = Arc::new(Mutex::new(Vec::<Bytes>::new()));
        let recorded = sent.clone();
        provider.expect_send_raw_transaction().returning(move |raw| {
            recorded.lock().push(raw.clone());
            Ok(keccak256(raw))
        });
        provider
            .expect_get_transaction_receipt()
            .returning(|_| Ok(None));
        let harness = setup_pipeline(provider, nonce_encoding_signer());

        let boop = create_sponsored_boop(0);
        let response = harness.pipeline.submit(boop.clone()).await.unwrap();

        assert_eq!(response.status, OnchainStatus::Success);
        assert_eq!(response.boop_hash, boop.hash(TEST_CHAIN_ID));
        let raws = sent.lock().clone();
        assert_eq!(raws.len(), 1);
        assert_eq!(response.tx_hash, keccak256(&raws[0]));
        // executor nonce seeded from the pending count
        assert_eq!(&raws[0][..8], &5u64.to_be_bytes());

        assert_eq!(
            harness
                .receipts
                .find_tx_hash(response.boop_hash)
                .await
                .unwrap(),
            Some(response.tx_hash)
        );
        assert_eq!(
            harness.pipeline.gate.local_nonce(&boop.nonce_key()).await,
            Some(1)
        );

        let pending = harness.pipeline.get_pending(boop.account).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert!(!pending[0].blocked);
        assert_eq!(harness.pipeline.executor_stats()[0].jobs, 1);
    }

    #[tokio::test]
    async fn test_duplicate_submission_rejected() {
        let provider = provider_with_simulation(successful_simulation());
        let harness = setup_pipeline(provider, nonce_encoding_signer());
        let boop = create_test_boop(0);
        let hash = boop.hash(TEST_CHAIN_ID);
        harness.pipeline.store.set(hash, &boop);

        let result = harness.pipeline.submit(boop).await;
        assert!(matches!(result, Err(SubmitterError::AlreadyProcessing(h)) if h == hash));
        // the boop being processed is left alone
        assert!(harness.pipeline.store.contains(&hash));
    }

    #[tokio::test]
    async fn test_failed_simulation_is_returned() {
        let provider = provider_with_simulation(SimulationOutput {
            status: OnchainStatus::InvalidSignature,
            ..Default::default()
        });
        let harness = setup_pipeline(provider, nonce_encoding_signer());
        let boop = create_test_boop(0);

        let result = harness.pipeline.submit(boop.clone()).await;
        assert!(matches!(
            result,
            Err(SubmitterError::Onchain {
                status: OnchainStatus::InvalidSignature,
                ..
            })
        ));
        assert!(harness.pipeline.store.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_validity_rejected() {
        let provider = provider_with_simulation(SimulationOutput {
            validity_unknown: true,
            ..successful_simulation()
        });
        let harness = setup_pipeline(provider, nonce_encoding_signer());

        let result = harness.pipeline.submit(create_test_boop(0)).await;
        assert!(matches!(
            result,
            Err(SubmitterError::Onchain {
                status: OnchainStatus::ValidationReverted,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_fee_too_low_rejected_before_sending() {
        let provider = provider_with_simulation(successful_simulation());
        let harness = setup_pipeline(provider, executor_only_signer());
        let mut boop = create_test_boop(0);
        boop.max_fee_per_gas = U256::from(1u64);

        let result = harness.pipeline.submit(boop).await;
        assert!(matches!(result, Err(SubmitterError::GasPriceTooLow { .. })));
    }

    #[tokio::test]
    async fn test_send_failure_resets_nonces() {
        let mut provider = provider_with_simulation(successful_simulation());
        provider.expect_send_raw_transaction().returning(|_| {
            Err(ProviderError::RpcError {
                code: -32000,
                message: "insufficient funds".to_string(),
            })
        });
        let harness = setup_pipeline(provider, nonce_encoding_signer());
        let boop = create_test_boop(0);

        let result = harness.pipeline.submit(boop.clone()).await;
        assert!(matches!(result, Err(SubmitterError::Provider(_))));
        assert_eq!(harness.pipeline.gate.local_nonce(&boop.nonce_key()).await, None);
        assert_eq!(harness.pipeline.executor_nonces.get(EXECUTOR), None);
        assert!(harness.pipeline.store.is_empty());
        assert!(matches!(
            harness
                .pipeline
                .wait_for_receipt(boop.hash(TEST_CHAIN_ID), Duration::from_secs(1))
                .await,
            Err(SubmitterError::UnknownBoop(_))
        ));
    }

    #[tokio::test]
    async fn test_execute_returns_receipt_after_inclusion() {
        let boop = create_test_boop(0);
        let included: Arc<Mutex<Option<EvmReceipt>>> = Arc::new(Mutex::new(None));

        let mut provider = provider_with_simulation(successful_simulation());
        provider
            .expect_send_raw_transaction()
            .returning(|raw| Ok(keccak256(raw)));
        let lookup = included.clone();
        provider
            .expect_get_transaction_receipt()
            .returning(move |_| Ok(lookup.lock().clone()));
        let harness = setup_pipeline(provider, nonce_encoding_signer());

        let pipeline = harness.pipeline.clone();
        let execution = tokio::spawn({
            let boop = boop.clone();
            async move { pipeline.execute(boop).await }
        });

        // wait for the transaction to go out, then include it
        let boop_hash = boop.hash(TEST_CHAIN_ID);
        let tx_hash = loop {
            if let Some(tx_hash) = harness.receipts.find_tx_hash(boop_hash).await.unwrap() {
                break tx_hash;
            }
            tokio::task::yield_now().await;
        };
        *included.lock() = Some(create_test_receipt(
            tx_hash,
            boop_logs(ENTRY_POINT, &boop, vec![]),
            true,
        ));
        let mut block = create_test_block(11, 0);
        block.transactions = vec![tx_hash];
        let _ = harness.blocks.send(block);

        let receipt = execution.await.unwrap().unwrap();
        assert_eq!(receipt.boop_hash, boop_hash);
        assert_eq!(receipt.status, OnchainStatus::Success);
        assert_eq!(receipt.evm_tx_hash, tx_hash);

        let state = harness.pipeline.get_state(boop_hash).await.unwrap();
        assert!(matches!(state, BoopState::Included { .. }));
    }

    #[tokio::test]
    async fn test_self_paying_boop_is_sent_and_receipted_as_signed() {
        let mut boop = create_test_boop(0);
        boop.validate_payment_gas_limit = 0;
        let boop_hash = boop.hash(TEST_CHAIN_ID);
        let included: Arc<Mutex<Option<EvmReceipt>>> = Arc::new(Mutex::new(None));

        let mut provider = provider_with_simulation(successful_simulation());
        provider
            .expect_send_raw_transaction()
            .returning(|raw| Ok(keccak256(raw)));
        let lookup = included.clone();
        provider
            .expect_get_transaction_receipt()
            .returning(move |_| Ok(lookup.lock().clone()));
        let inputs = Arc::new(Mutex::new(Vec::new()));
        let harness = setup_pipeline(provider, input_recording_signer(inputs.clone()));

        let pipeline = harness.pipeline.clone();
        let execution = tokio::spawn({
            let boop = boop.clone();
            async move { pipeline.execute(boop).await }
        });

        let tx_hash = loop {
            if let Some(tx_hash) = harness.receipts.find_tx_hash(boop_hash).await.unwrap() {
                break tx_hash;
            }
            tokio::task::yield_now().await;
        };
        let input = inputs.lock()[0].clone();
        assert_eq!(sent_boop(&input), boop.encode());

        *included.lock() = Some(create_test_receipt(
            tx_hash,
            boop_logs(ENTRY_POINT, &boop, vec![]),
            true,
        ));
        let mut block = create_test_block(11, 0);
        block.transactions = vec![tx_hash];
        let _ = harness.blocks.send(block);

        let receipt = execution.await.unwrap().unwrap();
        assert_eq!(receipt.boop_hash, boop_hash);
        assert_eq!(receipt.boop.validate_payment_gas_limit, 0);
        assert!(matches!(
            harness.pipeline.get_state(boop_hash).await.unwrap(),
            BoopState::Included { .. }
        ));
    }

    #[tokio::test]
    async fn test_sponsored_boop_is_charged_the_submitter_fee() {
        let mut provider = provider_with_simulation(successful_simulation());
        provider
            .expect_send_raw_transaction()
            .returning(|raw| Ok(keccak256(raw)));
        provider
            .expect_get_transaction_receipt()
            .returning(|_| Ok(None));
        let inputs = Arc::new(Mutex::new(Vec::new()));
        let mut settings = test_settings();
        settings.fees.submitter_fee = 500;
        let harness =
            setup_pipeline_with(provider, input_recording_signer(inputs.clone()), settings);

        let boop = create_sponsored_boop(0);
        let report = harness.pipeline.simulate(boop.clone()).await.unwrap();
        assert_eq!(report.output.submitter_fee, I256::try_from(500i64).unwrap());

        let response = harness.pipeline.submit(boop.clone()).await.unwrap();
        let sent = sent_boop(&inputs.lock()[0]);
        // packed layout: addresses and nonce (124 bytes), maxFeePerGas, submitterFee, gasLimit
        let fee_offset = 124 + 32;
        assert_eq!(
            &sent[fee_offset..fee_offset + 32],
            &I256::try_from(500i64).unwrap().to_be_bytes::<32>()
        );
        let fill = GasFill::from_simulation(
            &successful_simulation(),
            GasConfig::default().safety_margin,
        );
        assert_eq!(
            &sent[fee_offset + 32..fee_offset + 36],
            &fill.gas_limit.to_be_bytes()
        );
        assert_eq!(response.boop_hash, boop.hash(TEST_CHAIN_ID));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stuck_transaction_is_replaced_then_cancelled() {
        let sends = Arc::new(AtomicUsize::new(0));
        let mut provider = provider_with_simulation(successful_simulation());
        let counter = sends.clone();
        provider.expect_send_raw_transaction().returning(move |raw| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(keccak256(raw))
        });
        provider
            .expect_get_transaction_receipt()
            .returning(|_| Ok(None));
        let harness = setup_pipeline(provider, nonce_encoding_signer());

        let boop = create_test_boop(0);
        let boop_hash = boop.hash(TEST_CHAIN_ID);
        harness.pipeline.submit(boop.clone()).await.unwrap();

        let result = harness
            .pipeline
            .wait_for_receipt(boop_hash, Duration::from_secs(30))
            .await;
        assert!(matches!(result, Err(SubmitterError::ReceiptTimeout(_))));

        // let the tracking task finish
        tokio::time::sleep(Duration::from_secs(30)).await;
        // submit, replacement, cancellation
        assert_eq!(sends.load(Ordering::SeqCst), 3);
        assert!(!harness.pipeline.store.contains(&boop_hash));
        assert_eq!(harness.pipeline.gate.local_nonce(&boop.nonce_key()).await, None);
    }

    fn executor_only_signer() -> MockSigner {
        let mut signer = MockSigner::new();
        signer.expect_executors().returning(|| vec![EXECUTOR]);
        signer
    }
}
