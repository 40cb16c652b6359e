//! Boop submission: the operations exposed to the API and the pipeline implementing them.
//!
//! ```text
//! submit ─ validate ─ simulate ─ nonce gate ─ re-simulate ─ executor ─ fees ─ sign/send
//!                                                                              │
//!                          receipt ◄─ match logs ◄─ inclusion (replace/cancel if stuck)
//! ```
use std::time::Duration;

use alloy::primitives::{Address, B256};
use async_trait::async_trait;
use serde::Serialize;

use crate::domain::ExecutorStats;
use crate::models::{
    Boop, BoopReceipt, CreateAccountResponse, OnchainStatus, PendingBoop, SimulationReport,
    SubmitterError,
};

#[cfg(test)]
use mockall::automock;

mod account;

mod pipeline;
pub use pipeline::*;

mod replacement;

mod resync;

mod validation;
pub use validation::*;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub status: OnchainStatus,
    pub boop_hash: B256,
    /// Ledger transaction carrying the boop.
    pub tx_hash: B256,
}

/// What the relay knows about a boop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum BoopState {
    Included {
        receipt: Box<BoopReceipt>,
    },
    #[serde(rename_all = "camelCase")]
    NotIncluded {
        simulation: SimulationReport,
        /// Still held by the relay, waiting or in flight.
        in_flight: bool,
    },
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait SubmitterTrait: Send + Sync {
    async fn simulate(&self, boop: Boop) -> Result<SimulationReport, SubmitterError>;

    /// Returns once the carrying transaction was sent, not included.
    async fn submit(&self, boop: Boop) -> Result<SubmitResponse, SubmitterError>;

    /// Submits and waits for the receipt.
    async fn execute(&self, boop: Boop) -> Result<BoopReceipt, SubmitterError>;

    async fn get_state(&self, boop_hash: B256) -> Result<BoopState, SubmitterError>;

    async fn get_pending(&self, account: Address) -> Result<Vec<PendingBoop>, SubmitterError>;

    async fn wait_for_receipt(
        &self,
        boop_hash: B256,
        timeout: Duration,
    ) -> Result<BoopReceipt, SubmitterError>;

    /// Deploys the factory account of `owner` for `salt`, or reports the existing one.
    async fn create_account(
        &self,
        salt: B256,
        owner: Address,
    ) -> Result<CreateAccountResponse, SubmitterError>;

    fn executor_stats(&self) -> Vec<ExecutorStats>;
}
