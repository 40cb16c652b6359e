use alloy::primitives::{aliases::U192, Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

use super::{Boop, OnchainStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvmLog {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
}

/// The parts of a ledger transaction receipt the relay reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvmReceipt {
    pub transaction_hash: B256,
    pub block_hash: B256,
    pub block_number: u64,
    pub from: Address,
    pub to: Option<Address>,
    /// False when the ledger transaction reverted.
    pub status: bool,
    pub gas_used: u64,
    pub effective_gas_price: u128,
    pub logs: Vec<EvmLog>,
}

/// What happened to a boop once its carrying transaction was included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoopReceipt {
    pub boop_hash: B256,
    pub account: Address,
    pub nonce_track: U192,
    pub nonce_value: u64,
    pub entry_point: Address,
    pub status: OnchainStatus,
    pub description: String,
    /// Logs emitted while executing this boop, marker events excluded.
    pub logs: Vec<EvmLog>,
    pub revert_data: Bytes,
    pub evm_tx_hash: B256,
    pub block_hash: B256,
    pub block_number: u64,
    pub gas_used: u64,
    pub gas_cost: U256,
    pub boop: Boop,
}
