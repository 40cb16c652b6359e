use alloy::primitives::{Address, B256};
use serde::{Deserialize, Serialize};

/// Fees attached to a ledger transaction, in wei per gas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeQuote {
    pub max_fee_per_gas: u128,
    pub max_priority_fee_per_gas: u128,
}

/// A fee quote together with the floors the relay would still accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeEstimate {
    #[serde(flatten)]
    pub quote: FeeQuote,
    /// Lowest max fee that beats both the block floor and any replaced transaction.
    pub min_fee: u128,
    /// Lowest max fee likely to be included in the next block.
    pub min_block_fee: u128,
}

/// A ledger transaction sent by an executor, kept so it can be replaced or cancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentTransaction {
    pub executor: Address,
    pub nonce: u64,
    pub tx_hash: B256,
    #[serde(flatten)]
    pub fees: FeeQuote,
}
