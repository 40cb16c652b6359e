//! Ledger provider backed by EVM JSON-RPC endpoints.
//!
//! Every call is routed through [`retry_rpc_call`], so transient failures are retried and
//! failing endpoints are cooled down. Entry point calls are ABI encoded with the bindings in
//! [`crate::models::entry_point`].
use std::time::Duration;

use alloy::{
    eips::BlockId,
    primitives::{aliases::U192, Address, Bytes, TxKind, B256},
    providers::{Provider, ProviderBuilder, RootProvider},
    rpc::{
        client::ClientBuilder,
        types::{
            Block as RpcBlock, BlockNumberOrTag, BlockTransactionsKind, TransactionInput,
            TransactionReceipt, TransactionRequest,
        },
    },
    sol_types::SolCall,
    transports::http::{Client, Http},
};
use async_trait::async_trait;
use reqwest::ClientBuilder as ReqwestClientBuilder;

use super::{retry_rpc_call, BlockSource, LedgerProvider, ProviderError, RetryConfig, RpcSelector};
use crate::models::{
    entry_point::{status_from_revert, IEntryPoint},
    Block, BlockTag, Boop, EvmLog, EvmReceipt, RpcConfig, SimulationOutput,
};

type HttpProvider = RootProvider<Http<Client>>;

/// Builds an HTTP provider for `url` whose requests give up after `timeout`.
fn build_http_provider(url: &str, timeout: Duration) -> Result<HttpProvider, ProviderError> {
    let rpc_url = url
        .parse()
        .map_err(|e| ProviderError::NetworkConfiguration(format!("Invalid URL {}: {}", url, e)))?;

    let client = ReqwestClientBuilder::default()
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::Other(format!("Failed to build HTTP client: {}", e)))?;

    let mut transport = Http::new(rpc_url);
    transport.set_client(client);
    let is_local = transport.guess_local();
    let client = ClientBuilder::default().transport(transport, is_local);

    Ok(ProviderBuilder::new().on_client(client))
}

fn block_number_or_tag(tag: BlockTag) -> BlockNumberOrTag {
    match tag {
        BlockTag::Latest => BlockNumberOrTag::Latest,
        BlockTag::Number(number) => BlockNumberOrTag::Number(number),
    }
}

impl From<RpcBlock> for Block {
    fn from(block: RpcBlock) -> Self {
        Self {
            number: block.header.number,
            hash: block.header.hash,
            parent_hash: block.header.parent_hash,
            base_fee_per_gas: block.header.base_fee_per_gas.map(u128::from),
            gas_used: block.header.gas_used,
            gas_limit: block.header.gas_limit,
            timestamp: block.header.timestamp,
            transactions: block.transactions.hashes().collect(),
        }
    }
}

impl TryFrom<TransactionReceipt> for EvmReceipt {
    type Error = ProviderError;

    fn try_from(receipt: TransactionReceipt) -> Result<Self, Self::Error> {
        let (Some(block_hash), Some(block_number)) = (receipt.block_hash, receipt.block_number)
        else {
            return Err(ProviderError::InvalidResponse(format!(
                "receipt for {} has no block",
                receipt.transaction_hash
            )));
        };
        let logs = receipt
            .inner
            .logs()
            .iter()
            .map(|log| EvmLog {
                address: log.inner.address,
                topics: log.inner.data.topics().to_vec(),
                data: log.inner.data.data.clone(),
            })
            .collect();
        Ok(Self {
            transaction_hash: receipt.transaction_hash,
            block_hash,
            block_number,
            from: receipt.from,
            to: receipt.to,
            status: receipt.status(),
            gas_used: receipt.gas_used as u64,
            effective_gas_price: receipt.effective_gas_price,
            logs,
        })
    }
}

/// [`LedgerProvider`] talking to one or more JSON-RPC endpoints with failover.
#[derive(Clone)]
pub struct EvmLedgerProvider {
    selector: RpcSelector,
    entry_point: Address,
    timeout: Duration,
    retry_config: RetryConfig,
}

impl EvmLedgerProvider {
    /// # Arguments
    /// * `configs` - endpoints with their selection weights
    /// * `entry_point` - entry point contract the boops are submitted to
    /// * `timeout` - per-request timeout
    /// * `cooldown` - how long a failing endpoint is skipped
    /// * `retry_config` - retry and failover limits
    pub fn new(
        configs: Vec<RpcConfig>,
        entry_point: Address,
        timeout: Duration,
        cooldown: Duration,
        retry_config: RetryConfig,
    ) -> Result<Self, ProviderError> {
        for config in &configs {
            config
                .url
                .parse::<reqwest::Url>()
                .map_err(|e| ProviderError::NetworkConfiguration(format!("Invalid URL: {}", e)))?;
        }
        let selector = RpcSelector::new(configs, cooldown).map_err(|e| {
            ProviderError::NetworkConfiguration(format!("Failed to create RPC selector: {}", e))
        })?;

        Ok(Self {
            selector,
            entry_point,
            timeout,
            retry_config,
        })
    }

    /// One single-endpoint client per configured endpoint, for the block monitor.
    pub fn block_sources(&self, timeout: Duration) -> Result<Vec<EvmBlockSource>, ProviderError> {
        self.selector
            .urls()
            .map(|url| EvmBlockSource::new(url, timeout))
            .collect()
    }

    async fn retry_rpc_call<T, F, Fut>(
        &self,
        operation_name: &str,
        operation: F,
    ) -> Result<T, ProviderError>
    where
        F: Fn(HttpProvider) -> Fut,
        Fut: std::future::Future<Output = Result<T, ProviderError>>,
    {
        retry_rpc_call(
            &self.selector,
            operation_name,
            ProviderError::is_transient,
            ProviderError::is_endpoint_failure,
            |url| build_http_provider(url, self.timeout),
            operation,
            &self.retry_config,
        )
        .await
    }

    async fn eth_call(&self, operation_name: &str, input: Vec<u8>) -> Result<Bytes, ProviderError> {
        self.eth_call_to(operation_name, self.entry_point, input.into())
            .await
    }

    async fn eth_call_to(
        &self,
        operation_name: &str,
        to: Address,
        input: Bytes,
    ) -> Result<Bytes, ProviderError> {
        let request = TransactionRequest {
            from: Some(Address::ZERO),
            to: Some(TxKind::Call(to)),
            input: TransactionInput::new(input),
            ..Default::default()
        };
        self.retry_rpc_call(operation_name, move |provider| {
            let request = request.clone();
            async move { provider.call(&request).await.map_err(ProviderError::from) }
        })
        .await
    }
}

#[async_trait]
impl LedgerProvider for EvmLedgerProvider {
    async fn simulate(&self, boop: &Boop) -> Result<SimulationOutput, ProviderError> {
        let input = IEntryPoint::simulateCall {
            encodedBoop: boop.encode(),
        }
        .abi_encode();

        match self.eth_call("simulate", input).await {
            Ok(output) => {
                let decoded = IEntryPoint::simulateCall::abi_decode_returns(&output, true)
                    .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
                Ok(decoded.result.into())
            }
            Err(ProviderError::Reverted { data }) => {
                let (status, revert_data) = status_from_revert(&data);
                Ok(SimulationOutput {
                    status,
                    revert_data,
                    ..Default::default()
                })
            }
            Err(e) => Err(e),
        }
    }

    async fn get_nonce(&self, account: Address, nonce_track: U192) -> Result<u64, ProviderError> {
        let input = IEntryPoint::nonceValuesCall {
            account,
            nonceTrack: nonce_track,
        }
        .abi_encode();
        let output = self.eth_call("nonce_values", input).await?;
        let decoded = IEntryPoint::nonceValuesCall::abi_decode_returns(&output, true)
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        Ok(decoded.nonceValue)
    }

    async fn get_transaction_count(
        &self,
        address: Address,
        pending: bool,
    ) -> Result<u64, ProviderError> {
        let block = if pending {
            BlockId::pending()
        } else {
            BlockId::latest()
        };
        self.retry_rpc_call("get_transaction_count", move |provider| async move {
            provider
                .get_transaction_count(address)
                .block_id(block)
                .await
                .map_err(ProviderError::from)
        })
        .await
    }

    async fn send_raw_transaction(&self, raw: &Bytes) -> Result<B256, ProviderError> {
        let pending_tx = self
            .retry_rpc_call("send_raw_transaction", move |provider| {
                let raw = raw.clone();
                async move {
                    provider
                        .send_raw_transaction(&raw)
                        .await
                        .map_err(ProviderError::from)
                }
            })
            .await?;
        Ok(*pending_tx.tx_hash())
    }

    async fn get_transaction_receipt(
        &self,
        tx_hash: B256,
    ) -> Result<Option<EvmReceipt>, ProviderError> {
        let receipt = self
            .retry_rpc_call("get_transaction_receipt", move |provider| async move {
                provider
                    .get_transaction_receipt(tx_hash)
                    .await
                    .map_err(ProviderError::from)
            })
            .await?;
        receipt.map(EvmReceipt::try_from).transpose()
    }

    async fn get_block(&self, tag: BlockTag) -> Result<Option<Block>, ProviderError> {
        let block = self
            .retry_rpc_call("get_block_by_number", move |provider| async move {
                provider
                    .get_block_by_number(block_number_or_tag(tag), BlockTransactionsKind::Hashes)
                    .await
                    .map_err(ProviderError::from)
            })
            .await?;
        Ok(block.map(Block::from))
    }

    async fn get_gas_price(&self) -> Result<u128, ProviderError> {
        self.retry_rpc_call("get_gas_price", |provider| async move {
            provider.get_gas_price().await.map_err(ProviderError::from)
        })
        .await
    }

    async fn get_code(&self, address: Address) -> Result<Bytes, ProviderError> {
        self.retry_rpc_call("get_code", move |provider| async move {
            provider
                .get_code_at(address)
                .await
                .map_err(ProviderError::from)
        })
        .await
    }

    async fn call(&self, to: Address, input: Bytes) -> Result<Bytes, ProviderError> {
        self.eth_call_to("call", to, input).await
    }
}

/// A single endpoint polled by the block monitor. No retries: the monitor decides what to do
/// with failures.
#[derive(Clone)]
pub struct EvmBlockSource {
    url: String,
    provider: HttpProvider,
}

impl EvmBlockSource {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, ProviderError> {
        Ok(Self {
            url: url.to_string(),
            provider: build_http_provider(url, timeout)?,
        })
    }
}

#[async_trait]
impl BlockSource for EvmBlockSource {
    fn name(&self) -> String {
        self.url.clone()
    }

    async fn get_block(&self, tag: BlockTag) -> Result<Option<Block>, ProviderError> {
        let block = self
            .provider
            .get_block_by_number(block_number_or_tag(tag), BlockTransactionsKind::Hashes)
            .await?;
        Ok(block.map(Block::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::boop::test_utils::create_test_boop;
    use crate::models::OnchainStatus;
    use alloy::primitives::{address, U256};
    use alloy::sol_types::{SolError, SolValue};
    use serde_json::{json, Value};
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    const ENTRY_POINT: Address = address!("4444444444444444444444444444444444444444");

    /// Answers a JSON-RPC request with `result`, echoing the request id.
    fn rpc_result(result: Value) -> impl Fn(&Request) -> ResponseTemplate {
        move |request: &Request| {
            let body: Value = serde_json::from_slice(&request.body).unwrap_or_default();
            ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": body["id"],
                "result": result,
            }))
        }
    }

    fn rpc_error(code: i64, message: &'static str, data: Option<String>) -> impl Fn(&Request) -> ResponseTemplate {
        move |request: &Request| {
            let body: Value = serde_json::from_slice(&request.body).unwrap_or_default();
            ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": body["id"],
                "error": { "code": code, "message": message, "data": data },
            }))
        }
    }

    fn provider_for(servers: &[&MockServer]) -> EvmLedgerProvider {
        let configs = servers
            .iter()
            .map(|server| RpcConfig::new(server.uri()))
            .collect();
        EvmLedgerProvider::new(
            configs,
            ENTRY_POINT,
            Duration::from_secs(2),
            Duration::from_secs(60),
            RetryConfig::new(2, 1, 0, 0),
        )
        .unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_url() {
        let result = EvmLedgerProvider::new(
            vec![RpcConfig::new("not a url".to_string())],
            ENTRY_POINT,
            Duration::from_secs(1),
            Duration::from_secs(1),
            RetryConfig::new(1, 0, 0, 0),
        );
        assert!(matches!(result, Err(ProviderError::NetworkConfiguration(_))));
    }

    #[tokio::test]
    async fn test_get_gas_price() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "eth_gasPrice" })))
            .respond_with(rpc_result(json!("0x3b9aca00")))
            .mount(&server)
            .await;

        let provider = provider_for(&[&server]);
        assert_eq!(provider.get_gas_price().await.unwrap(), 1_000_000_000);
    }

    #[tokio::test]
    async fn test_get_nonce_decodes_entry_point_output() {
        let server = MockServer::start().await;
        let output = Bytes::from(12u64.abi_encode());
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "eth_call" })))
            .respond_with(rpc_result(json!(output)))
            .mount(&server)
            .await;

        let provider = provider_for(&[&server]);
        let nonce = provider
            .get_nonce(Address::repeat_byte(0x11), U192::from(3))
            .await
            .unwrap();
        assert_eq!(nonce, 12);
    }

    #[tokio::test]
    async fn test_simulate_revert_maps_to_status() {
        let server = MockServer::start().await;
        let revert = Bytes::from(IEntryPoint::InvalidNonce {}.abi_encode());
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "eth_call" })))
            .respond_with(rpc_error(3, "execution reverted", Some(revert.to_string())))
            .mount(&server)
            .await;

        let provider = provider_for(&[&server]);
        let output = provider.simulate(&create_test_boop(0)).await.unwrap();
        assert_eq!(output.status, OnchainStatus::InvalidNonce);
    }

    #[tokio::test]
    async fn test_simulate_success() {
        let server = MockServer::start().await;
        let result = IEntryPoint::SimulationResult {
            status: 0,
            gas: 100_000,
            validateGas: 20_000,
            validatePaymentGas: 0,
            executeGas: 50_000,
            validityUnknownDuringSimulation: false,
            paymentValidityUnknownDuringSimulation: false,
            futureNonceDuringSimulation: true,
            revertData: Bytes::new(),
        };
        let output = Bytes::from((result,).abi_encode_params());
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "eth_call" })))
            .respond_with(rpc_result(json!(output)))
            .mount(&server)
            .await;

        let provider = provider_for(&[&server]);
        let output = provider.simulate(&create_test_boop(0)).await.unwrap();
        assert_eq!(output.status, OnchainStatus::Success);
        assert_eq!(output.gas, 100_000);
        assert!(output.future_nonce);
    }

    #[tokio::test]
    async fn test_fails_over_to_second_endpoint() {
        let failing = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&failing)
            .await;
        let healthy = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "eth_getTransactionCount" })))
            .respond_with(rpc_result(json!("0x5")))
            .mount(&healthy)
            .await;

        let provider = provider_for(&[&failing, &healthy]);
        let count = provider
            .get_transaction_count(Address::repeat_byte(0x01), true)
            .await
            .unwrap();
        assert_eq!(count, 5);
    }

    #[tokio::test]
    async fn test_missing_receipt_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "eth_getTransactionReceipt" })))
            .respond_with(rpc_result(Value::Null))
            .mount(&server)
            .await;

        let provider = provider_for(&[&server]);
        assert_eq!(
            provider.get_transaction_receipt(B256::ZERO).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_get_code_of_empty_address() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "eth_getCode" })))
            .respond_with(rpc_result(json!("0x")))
            .mount(&server)
            .await;

        let provider = provider_for(&[&server]);
        let code = provider.get_code(Address::repeat_byte(0x77)).await.unwrap();
        assert!(code.is_empty());
    }

    #[tokio::test]
    async fn test_call_returns_raw_output() {
        let server = MockServer::start().await;
        let output = Bytes::from_static(&[0x60, 0x80, 0x60, 0x40]);
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "eth_call" })))
            .respond_with(rpc_result(json!(output)))
            .mount(&server)
            .await;

        let provider = provider_for(&[&server]);
        let result = provider
            .call(Address::repeat_byte(0x77), Bytes::from_static(&[0x01]))
            .await
            .unwrap();
        assert_eq!(result, output);
    }

    #[tokio::test]
    async fn test_block_source_reads_block() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "eth_getBlockByNumber" })))
            .respond_with(rpc_result(json!({
                "number": "0x10",
                "hash": B256::repeat_byte(0x10),
                "parentHash": B256::repeat_byte(0x0f),
                "sha3Uncles": B256::ZERO,
                "miner": Address::ZERO,
                "stateRoot": B256::ZERO,
                "transactionsRoot": B256::ZERO,
                "receiptsRoot": B256::ZERO,
                "logsBloom": format!("0x{}", "00".repeat(256)),
                "difficulty": "0x0",
                "gasLimit": "0x1c9c380",
                "gasUsed": "0x5208",
                "timestamp": "0x64",
                "extraData": "0x",
                "mixHash": B256::ZERO,
                "nonce": "0x0000000000000000",
                "baseFeePerGas": "0x3b9aca00",
                "uncles": [],
                "transactions": [B256::repeat_byte(0xaa)],
            })))
            .mount(&server)
            .await;

        let source = EvmBlockSource::new(&server.uri(), Duration::from_secs(2)).unwrap();
        let block = source.get_block(BlockTag::Latest).await.unwrap().unwrap();
        assert_eq!(block.number, 16);
        assert_eq!(block.hash, B256::repeat_byte(0x10));
        assert_eq!(block.base_fee_per_gas, Some(1_000_000_000));
        assert_eq!(block.transactions, vec![B256::repeat_byte(0xaa)]);
        assert_eq!(U256::from(block.gas_used), U256::from(21_000));
    }
}
