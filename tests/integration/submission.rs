//! End-to-end submission flows against an in-process ledger.
//!
//! `FakeLedger` keeps a mempool of submitted boops, mines them into blocks on demand and serves
//! the receipts the entry point would emit. `FakeSigner` does not sign: the raw transaction is the
//! nonce followed by the calldata, which is all the ledger needs to tell transactions apart.
use std::{
    collections::HashMap,
    sync::Arc,
    time::Duration,
};

use alloy::{
    consensus::TxEip1559,
    primitives::{address, aliases::U192, keccak256, Address, Bytes, I256, B256, U256},
    sol_types::{SolCall, SolEvent},
};
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};

use boop_submitter::{
    config::{FeeConfig, GasConfig, LimitsConfig},
    domain::{BoopState, PipelineSettings, SubmissionPipeline, SubmitterTrait},
    models::{
        entry_point::IEntryPoint, Block, BlockTag, Boop, EvmLog, EvmReceipt, OnchainStatus,
        SignerError, SimulationOutput, SubmitterError,
    },
    repositories::InMemoryBoopReceiptRepository,
    services::{AlertManager, LedgerProvider, ProviderError, SignedTransaction, Signer},
};

const CHAIN_ID: u64 = 216;
const ENTRY_POINT: Address = address!("0xeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee");
const EXECUTOR: Address = address!("0xe1e1e1e1e1e1e1e1e1e1e1e1e1e1e1e1e1e1e1e1");
const ACCOUNT: Address = address!("0x1111111111111111111111111111111111111111");
const BASE_FEE: u128 = 1_000_000_000;

fn create_boop(nonce_value: u64) -> Boop {
    Boop {
        account: ACCOUNT,
        dest: address!("0x2222222222222222222222222222222222222222"),
        payer: ACCOUNT,
        value: U256::ZERO,
        nonce_track: U192::ZERO,
        nonce_value,
        max_fee_per_gas: U256::from(2_000_000_000u64),
        submitter_fee: I256::ZERO,
        gas_limit: 400_000,
        validate_gas_limit: 100_000,
        validate_payment_gas_limit: 100_000,
        execute_gas_limit: 150_000,
        call_data: Bytes::from_static(&[0xde, 0xad, 0xbe, 0xef]),
        validator_data: Bytes::from_static(&[0x01; 65]),
        extra_data: Bytes::new(),
    }
}

fn entry_point_log<E: SolEvent>(event: &E) -> EvmLog {
    let data = event.encode_log_data();
    EvmLog {
        address: ENTRY_POINT,
        topics: data.topics().to_vec(),
        data: data.data,
    }
}

struct PendingTx {
    hash: B256,
    boop: Boop,
}

#[derive(Default)]
struct LedgerState {
    known: Vec<Boop>,
    account_nonce: u64,
    executor_nonce: u64,
    mempool: Vec<PendingTx>,
    receipts: HashMap<B256, EvmReceipt>,
    executed: Vec<u64>,
    block_number: u64,
}

/// Entry point ledger kept in memory.
#[derive(Default)]
struct FakeLedger {
    state: Mutex<LedgerState>,
}

impl FakeLedger {
    /// Makes `boop` recognizable in the calldata of incoming transactions.
    fn expect_boop(&self, boop: &Boop) {
        self.state.lock().known.push(boop.clone());
    }

    fn head(&self) -> Block {
        let number = self.state.lock().block_number;
        block(number, vec![])
    }

    /// Includes the whole mempool in a new block.
    fn mine(&self) -> Block {
        let mut state = self.state.lock();
        state.block_number += 1;
        let number = state.block_number;
        let pending = std::mem::take(&mut state.mempool);
        let mut hashes = Vec::with_capacity(pending.len());
        for tx in pending {
            let logs = vec![
                entry_point_log(&IEntryPoint::BoopSubmitted::from(&tx.boop)),
                entry_point_log(&IEntryPoint::BoopExecutionCompleted {}),
            ];
            state.account_nonce = tx.boop.nonce_value + 1;
            state.executor_nonce += 1;
            state.executed.push(tx.boop.nonce_value);
            state.receipts.insert(
                tx.hash,
                EvmReceipt {
                    transaction_hash: tx.hash,
                    block_hash: block_hash(number),
                    block_number: number,
                    from: EXECUTOR,
                    to: Some(ENTRY_POINT),
                    status: true,
                    gas_used: 250_000,
                    effective_gas_price: BASE_FEE,
                    logs,
                },
            );
            hashes.push(tx.hash);
        }
        block(number, hashes)
    }

    fn mempool_nonces(&self) -> Vec<u64> {
        self.state
            .lock()
            .mempool
            .iter()
            .map(|tx| tx.boop.nonce_value)
            .collect()
    }

    /// Nonce value and boop hash of every pending transaction, in arrival order.
    fn mempool_boops(&self) -> Vec<(u64, B256)> {
        self.state
            .lock()
            .mempool
            .iter()
            .map(|tx| (tx.boop.nonce_value, tx.boop.hash(CHAIN_ID)))
            .collect()
    }

    fn executed(&self) -> Vec<u64> {
        self.state.lock().executed.clone()
    }
}

fn block_hash(number: u64) -> B256 {
    keccak256(number.to_be_bytes())
}

fn block(number: u64, transactions: Vec<B256>) -> Block {
    Block {
        number,
        hash: block_hash(number),
        parent_hash: block_hash(number.saturating_sub(1)),
        base_fee_per_gas: Some(BASE_FEE),
        gas_used: 15_000_000,
        gas_limit: 30_000_000,
        timestamp: 1_700_000_000 + number,
        transactions,
    }
}

#[async_trait]
impl LedgerProvider for FakeLedger {
    async fn simulate(&self, boop: &Boop) -> Result<SimulationOutput, ProviderError> {
        let onchain = self.state.lock().account_nonce;
        if boop.nonce_value < onchain {
            return Ok(SimulationOutput {
                status: OnchainStatus::InvalidNonce,
                ..Default::default()
            });
        }
        Ok(SimulationOutput {
            status: OnchainStatus::Success,
            gas: 200_000,
            validate_gas: 40_000,
            validate_payment_gas: 30_000,
            execute_gas: 100_000,
            future_nonce: boop.nonce_value > onchain,
            ..Default::default()
        })
    }

    async fn get_nonce(&self, _account: Address, _nonce_track: U192) -> Result<u64, ProviderError> {
        Ok(self.state.lock().account_nonce)
    }

    async fn get_transaction_count(
        &self,
        _address: Address,
        pending: bool,
    ) -> Result<u64, ProviderError> {
        let state = self.state.lock();
        let included = state.executor_nonce;
        Ok(if pending {
            included + state.mempool.len() as u64
        } else {
            included
        })
    }

    async fn send_raw_transaction(&self, raw: &Bytes) -> Result<B256, ProviderError> {
        let mut state = self.state.lock();
        let input = &raw[8..];
        let boop = state
            .known
            .iter()
            .find(|boop| {
                IEntryPoint::submitCall {
                    encodedBoop: boop.encode(),
                }
                .abi_encode()
                    == input
            })
            .cloned()
            .ok_or_else(|| ProviderError::RpcError {
                code: -32000,
                message: "execution reverted".to_string(),
            })?;
        let hash = keccak256(raw);
        state.mempool.push(PendingTx { hash, boop });
        Ok(hash)
    }

    async fn get_transaction_receipt(
        &self,
        tx_hash: B256,
    ) -> Result<Option<EvmReceipt>, ProviderError> {
        Ok(self.state.lock().receipts.get(&tx_hash).cloned())
    }

    async fn get_block(&self, _tag: BlockTag) -> Result<Option<Block>, ProviderError> {
        Ok(Some(self.head()))
    }

    async fn get_gas_price(&self) -> Result<u128, ProviderError> {
        Ok(BASE_FEE)
    }

    async fn get_code(&self, _address: Address) -> Result<Bytes, ProviderError> {
        Ok(Bytes::new())
    }

    async fn call(&self, _to: Address, _input: Bytes) -> Result<Bytes, ProviderError> {
        Err(ProviderError::Reverted { data: Bytes::new() })
    }
}

struct FakeSigner;

#[async_trait]
impl Signer for FakeSigner {
    fn executors(&self) -> Vec<Address> {
        vec![EXECUTOR]
    }

    async fn sign_transaction(
        &self,
        _executor: Address,
        transaction: TxEip1559,
    ) -> Result<SignedTransaction, SignerError> {
        let mut raw = transaction.nonce.to_be_bytes().to_vec();
        raw.extend_from_slice(&transaction.input);
        let raw = Bytes::from(raw);
        Ok(SignedTransaction {
            hash: keccak256(&raw),
            raw,
        })
    }
}

type TestSubmitter = SubmissionPipeline<FakeLedger, FakeSigner, InMemoryBoopReceiptRepository>;

struct Harness {
    submitter: Arc<TestSubmitter>,
    ledger: Arc<FakeLedger>,
    blocks: broadcast::Sender<Block>,
    _head: watch::Sender<Option<Block>>,
}

impl Harness {
    fn new(limits: LimitsConfig) -> Self {
        let ledger = Arc::new(FakeLedger::default());
        let (blocks, _) = broadcast::channel(16);
        let (head, current_block) = watch::channel(Some(ledger.head()));
        let submitter = SubmissionPipeline::new(
            ledger.clone(),
            Arc::new(FakeSigner),
            Arc::new(InMemoryBoopReceiptRepository::new()),
            Arc::new(AlertManager::new(vec![], Duration::from_secs(60))),
            current_block,
            blocks.clone(),
            PipelineSettings {
                chain_id: CHAIN_ID,
                entry_point: ENTRY_POINT,
                fees: FeeConfig::default(),
                gas: GasConfig::default(),
                limits,
                receipt_retry_delay: Duration::from_millis(10),
                simulation_cache_size: 100,
                accounts: None,
            },
        );
        Self {
            submitter: Arc::new(submitter),
            ledger,
            blocks,
            _head: head,
        }
    }

    /// Mines a block every few milliseconds until the returned handle is aborted.
    fn start_mining(&self) -> tokio::task::JoinHandle<()> {
        let ledger = self.ledger.clone();
        let blocks = self.blocks.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_millis(20)).await;
                let _ = blocks.send(ledger.mine());
            }
        })
    }

    async fn wait_for_mempool(&self, len: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.ledger.mempool_nonces().len() < len {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("transactions were not sent");
    }
}

#[tokio::test]
async fn test_execute_returns_included_receipt() {
    let harness = Harness::new(LimitsConfig::default());
    let boop = create_boop(0);
    harness.ledger.expect_boop(&boop);
    let miner = harness.start_mining();

    let receipt = harness.submitter.execute(boop.clone()).await.unwrap();
    miner.abort();

    assert_eq!(receipt.boop_hash, boop.hash(CHAIN_ID));
    assert_eq!(receipt.status, OnchainStatus::Success);
    assert_eq!(receipt.entry_point, ENTRY_POINT);
    assert_eq!(receipt.nonce_value, 0);

    let state = harness
        .submitter
        .get_state(boop.hash(CHAIN_ID))
        .await
        .unwrap();
    assert!(matches!(state, BoopState::Included { .. }));
}

#[tokio::test]
async fn test_future_nonce_waits_for_its_predecessor() {
    let harness = Harness::new(LimitsConfig::default());
    let first = create_boop(0);
    let second = create_boop(1);
    harness.ledger.expect_boop(&first);
    harness.ledger.expect_boop(&second);

    let submitter = harness.submitter.clone();
    let waiting = tokio::spawn({
        let second = second.clone();
        async move { submitter.submit(second).await }
    });

    // the later nonce is held back while the lane has a gap
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(harness.ledger.mempool_nonces().is_empty());
    let pending = harness.submitter.get_pending(ACCOUNT).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].nonce_value, 1);

    harness.submitter.submit(first).await.unwrap();
    let response = waiting.await.unwrap().unwrap();
    assert_eq!(response.boop_hash, second.hash(CHAIN_ID));

    harness.wait_for_mempool(2).await;
    assert_eq!(harness.ledger.mempool_nonces(), vec![0, 1]);

    let miner = harness.start_mining();
    let receipt = harness
        .submitter
        .wait_for_receipt(second.hash(CHAIN_ID), Duration::from_secs(5))
        .await
        .unwrap();
    miner.abort();
    assert_eq!(receipt.nonce_value, 1);
    assert_eq!(harness.ledger.executed(), vec![0, 1]);
}

#[tokio::test]
async fn test_waiting_boop_is_replaced_by_same_nonce() {
    let harness = Harness::new(LimitsConfig::default());
    let original = create_boop(2);
    let resubmitted = Boop {
        call_data: Bytes::from_static(&[0xca, 0xfe]),
        ..create_boop(2)
    };
    for boop in [create_boop(0), create_boop(1), resubmitted.clone()] {
        harness.ledger.expect_boop(&boop);
    }

    let submitter = harness.submitter.clone();
    let waiting = tokio::spawn(async move { submitter.submit(original).await });
    tokio::time::sleep(Duration::from_millis(100)).await;

    let submitter = harness.submitter.clone();
    let replacing = tokio::spawn({
        let resubmitted = resubmitted.clone();
        async move { submitter.submit(resubmitted).await }
    });

    let result = waiting.await.unwrap();
    assert!(matches!(result, Err(SubmitterError::Replaced)));

    // filling the gap releases the replacement
    harness.submitter.submit(create_boop(0)).await.unwrap();
    harness.submitter.submit(create_boop(1)).await.unwrap();
    let response = replacing.await.unwrap().unwrap();
    assert_eq!(response.boop_hash, resubmitted.hash(CHAIN_ID));

    harness.wait_for_mempool(3).await;
    let mempool = harness.ledger.mempool_boops();
    assert_eq!(mempool[2], (2, resubmitted.hash(CHAIN_ID)));
}

#[tokio::test]
async fn test_out_of_order_submissions_are_sent_in_nonce_order() {
    let harness = Harness::new(LimitsConfig::default());
    for value in 0..5 {
        harness.ledger.expect_boop(&create_boop(value));
    }

    let mut waiting = Vec::new();
    for value in [4, 2, 3, 1] {
        let submitter = harness.submitter.clone();
        waiting.push(tokio::spawn(async move {
            submitter.submit(create_boop(value)).await
        }));
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(harness.ledger.mempool_nonces().is_empty());
    let pending = harness.submitter.get_pending(ACCOUNT).await.unwrap();
    assert_eq!(pending.len(), 4);
    assert!(pending.iter().all(|boop| boop.blocked));

    harness.submitter.submit(create_boop(0)).await.unwrap();
    for handle in waiting {
        handle.await.unwrap().unwrap();
    }

    harness.wait_for_mempool(5).await;
    assert_eq!(harness.ledger.mempool_nonces(), vec![0, 1, 2, 3, 4]);
}

#[tokio::test]
async fn test_self_paying_boop_without_payment_gas_is_executed() {
    let harness = Harness::new(LimitsConfig::default());
    let boop = Boop {
        validate_payment_gas_limit: 0,
        ..create_boop(0)
    };
    harness.ledger.expect_boop(&boop);
    let miner = harness.start_mining();

    let receipt = harness.submitter.execute(boop.clone()).await.unwrap();
    miner.abort();

    assert_eq!(receipt.boop_hash, boop.hash(CHAIN_ID));
    assert_eq!(receipt.boop, boop);
    assert!(matches!(
        harness.submitter.get_state(boop.hash(CHAIN_ID)).await.unwrap(),
        BoopState::Included { .. }
    ));
}

#[tokio::test]
async fn test_admission_ceilings() {
    let harness = Harness::new(LimitsConfig {
        max_pending_per_track: 1,
        ..LimitsConfig::default()
    });

    let submitter = harness.submitter.clone();
    let waiting = tokio::spawn(async move { submitter.submit(create_boop(1)).await });
    tokio::time::sleep(Duration::from_millis(100)).await;

    let result = harness.submitter.submit(create_boop(2)).await;
    assert!(matches!(result, Err(SubmitterError::BufferExceeded)));
    assert!(harness.ledger.mempool_nonces().is_empty());
    waiting.abort();
}

#[tokio::test]
async fn test_nonce_too_far_ahead() {
    let harness = Harness::new(LimitsConfig {
        max_pending_per_track: 2,
        ..LimitsConfig::default()
    });

    let result = harness.submitter.submit(create_boop(3)).await;
    assert!(matches!(
        result,
        Err(SubmitterError::NonceTooFarAhead {
            value: 3,
            expected: 0
        })
    ));
}

#[tokio::test]
async fn test_duplicate_submission_is_rejected() {
    let harness = Harness::new(LimitsConfig::default());
    let boop = create_boop(1);

    let submitter = harness.submitter.clone();
    let first = tokio::spawn({
        let boop = boop.clone();
        async move { submitter.submit(boop).await }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    let result = harness.submitter.submit(boop.clone()).await;
    assert!(matches!(result, Err(SubmitterError::AlreadyProcessing(hash)) if hash == boop.hash(CHAIN_ID)));
    first.abort();
}
