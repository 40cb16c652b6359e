//! Access to the ledger: the entry point calls the relay makes, transaction submission,
//! receipts and blocks.
use alloy::{
    primitives::{aliases::U192, Address, Bytes, B256},
    transports::{RpcError, TransportErrorKind},
};
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::models::{Block, BlockTag, Boop, EvmReceipt, SimulationOutput};

#[cfg(test)]
use mockall::automock;

mod evm;
pub use evm::*;

mod retry;
pub use retry::*;

mod rpc_selector;
pub use rpc_selector::*;

#[derive(Error, Debug, Serialize, Clone, PartialEq)]
pub enum ProviderError {
    #[error("Request timed out")]
    Timeout,
    #[error("Rate limited by the endpoint")]
    RateLimited,
    #[error("Bad gateway")]
    BadGateway,
    #[error("Request failed with status {status_code}: {error}")]
    RequestError { error: String, status_code: u16 },
    #[error("RPC error {code}: {message}")]
    RpcError { code: i64, message: String },
    #[error("Call reverted")]
    Reverted { data: Bytes },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Network configuration error: {0}")]
    NetworkConfiguration(String),
    #[error("Provider error: {0}")]
    Other(String),
}

impl From<String> for ProviderError {
    fn from(message: String) -> Self {
        ProviderError::Other(message)
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return ProviderError::Timeout;
        }
        match err.status().map(|status| status.as_u16()) {
            Some(429) => ProviderError::RateLimited,
            Some(502) => ProviderError::BadGateway,
            Some(504) => ProviderError::Timeout,
            Some(status_code) => ProviderError::RequestError {
                error: err.to_string(),
                status_code,
            },
            None => ProviderError::Other(err.to_string()),
        }
    }
}

impl From<RpcError<TransportErrorKind>> for ProviderError {
    fn from(err: RpcError<TransportErrorKind>) -> Self {
        match err {
            RpcError::ErrorResp(payload) => {
                // execution reverts carry the revert data in `data`
                if let Some(data) = payload.as_revert_data() {
                    return ProviderError::Reverted { data };
                }
                ProviderError::RpcError {
                    code: payload.code,
                    message: payload.message.to_string(),
                }
            }
            RpcError::Transport(TransportErrorKind::HttpError(http)) => match http.status {
                429 => ProviderError::RateLimited,
                502 => ProviderError::BadGateway,
                504 => ProviderError::Timeout,
                status_code => ProviderError::RequestError {
                    error: http.body,
                    status_code,
                },
            },
            RpcError::NullResp => ProviderError::InvalidResponse("null response".to_string()),
            RpcError::DeserError { err, .. } => ProviderError::InvalidResponse(err.to_string()),
            other => ProviderError::Other(other.to_string()),
        }
    }
}

impl ProviderError {
    /// Errors worth retrying on the same endpoint.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Timeout | ProviderError::RateLimited | ProviderError::BadGateway => true,
            ProviderError::Reverted { .. } | ProviderError::RpcError { .. } => false,
            _ => {
                let message = self.to_string().to_lowercase();
                message.contains("timeout")
                    || message.contains("timed out")
                    || message.contains("connection")
                    || message.contains("reset")
            }
        }
    }

    /// Errors that say something about the endpoint rather than the request.
    pub fn is_endpoint_failure(&self) -> bool {
        matches!(
            self,
            ProviderError::RequestError { .. }
                | ProviderError::InvalidResponse(_)
                | ProviderError::NetworkConfiguration(_)
        )
    }
}

/// Ledger operations the submission pipeline depends on.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait LedgerProvider: Send + Sync {
    /// Dry-runs the boop through the entry point.
    async fn simulate(&self, boop: &Boop) -> Result<SimulationOutput, ProviderError>;

    /// Next nonce value the entry point expects for the account's track.
    async fn get_nonce(&self, account: Address, nonce_track: U192) -> Result<u64, ProviderError>;

    /// Transaction count of an executor, including the mempool when `pending` is set.
    async fn get_transaction_count(
        &self,
        address: Address,
        pending: bool,
    ) -> Result<u64, ProviderError>;

    async fn send_raw_transaction(&self, raw: &Bytes) -> Result<B256, ProviderError>;

    async fn get_transaction_receipt(
        &self,
        tx_hash: B256,
    ) -> Result<Option<EvmReceipt>, ProviderError>;

    async fn get_block(&self, tag: BlockTag) -> Result<Option<Block>, ProviderError>;

    async fn get_gas_price(&self) -> Result<u128, ProviderError>;

    /// Deployed bytecode at `address`, empty when nothing is deployed there.
    async fn get_code(&self, address: Address) -> Result<Bytes, ProviderError>;

    /// Read-only call to any contract. Reverts surface as [`ProviderError::Reverted`].
    async fn call(&self, to: Address, input: Bytes) -> Result<Bytes, ProviderError>;
}

/// A single endpoint the block monitor can poll, without retries or failover.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait BlockSource: Send + Sync {
    fn name(&self) -> String;

    async fn get_block(&self, tag: BlockTag) -> Result<Option<Block>, ProviderError>;
}
