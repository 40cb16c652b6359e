use std::fmt;

use alloy::primitives::{Bytes, B256, I256};
use serde::{Deserialize, Serialize};

use super::FeeEstimate;

/// Outcome of a boop as reported by the entry point, onchain or during simulation.
///
/// The discriminants follow the entry point's status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum OnchainStatus {
    #[default]
    Success,
    MissingValidationInformation,
    MissingGasValues,
    GasPriceTooLow,
    GasPriceTooHigh,
    InvalidNonce,
    InsufficientStake,
    InvalidSignature,
    InvalidExtensionValue,
    ExtensionAlreadyRegistered,
    ExtensionNotRegistered,
    ValidationReverted,
    ValidationRejected,
    PaymentValidationReverted,
    PaymentValidationRejected,
    ExecuteReverted,
    ExecuteRejected,
    CallReverted,
    PayoutFailed,
    EntryPointOutOfGas,
    UnexpectedReverted,
}

impl OnchainStatus {
    const ALL: [OnchainStatus; 21] = [
        OnchainStatus::Success,
        OnchainStatus::MissingValidationInformation,
        OnchainStatus::MissingGasValues,
        OnchainStatus::GasPriceTooLow,
        OnchainStatus::GasPriceTooHigh,
        OnchainStatus::InvalidNonce,
        OnchainStatus::InsufficientStake,
        OnchainStatus::InvalidSignature,
        OnchainStatus::InvalidExtensionValue,
        OnchainStatus::ExtensionAlreadyRegistered,
        OnchainStatus::ExtensionNotRegistered,
        OnchainStatus::ValidationReverted,
        OnchainStatus::ValidationRejected,
        OnchainStatus::PaymentValidationReverted,
        OnchainStatus::PaymentValidationRejected,
        OnchainStatus::ExecuteReverted,
        OnchainStatus::ExecuteRejected,
        OnchainStatus::CallReverted,
        OnchainStatus::PayoutFailed,
        OnchainStatus::EntryPointOutOfGas,
        OnchainStatus::UnexpectedReverted,
    ];

    /// Maps an entry point status code, treating unknown codes as an unexpected revert.
    pub fn from_code(code: u8) -> Self {
        Self::ALL
            .get(code as usize)
            .copied()
            .unwrap_or(OnchainStatus::UnexpectedReverted)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, OnchainStatus::Success)
    }

    /// Human readable explanation returned alongside failures.
    pub fn description(&self) -> &'static str {
        match self {
            OnchainStatus::Success => "Boop executed successfully.",
            OnchainStatus::MissingValidationInformation => {
                "The account or paymaster did not return the information needed for validation."
            }
            OnchainStatus::MissingGasValues => {
                "A self-paying boop must specify its gas limits and maxFeePerGas."
            }
            OnchainStatus::GasPriceTooLow => "The boop's maxFeePerGas is below the current network fee.",
            OnchainStatus::GasPriceTooHigh => {
                "The network fee is above the maximum the submitter is willing to pay."
            }
            OnchainStatus::InvalidNonce => "The nonce is not valid for this account and track.",
            OnchainStatus::InsufficientStake => "The paymaster does not have enough stake.",
            OnchainStatus::InvalidSignature => "The validator rejected the boop's signature.",
            OnchainStatus::InvalidExtensionValue => "An extension value is invalid.",
            OnchainStatus::ExtensionAlreadyRegistered => "The extension is already registered.",
            OnchainStatus::ExtensionNotRegistered => "The extension is not registered.",
            OnchainStatus::ValidationReverted => "Account validation reverted.",
            OnchainStatus::ValidationRejected => "Account validation rejected the boop.",
            OnchainStatus::PaymentValidationReverted => "Paymaster validation reverted.",
            OnchainStatus::PaymentValidationRejected => "Paymaster validation rejected the boop.",
            OnchainStatus::ExecuteReverted => "The account's execute function reverted.",
            OnchainStatus::ExecuteRejected => "The account's execute function rejected the call.",
            OnchainStatus::CallReverted => "The call made by the account reverted.",
            OnchainStatus::PayoutFailed => "The payer failed to pay the submitter.",
            OnchainStatus::EntryPointOutOfGas => {
                "The boop was included onchain but ran out of gas."
            }
            OnchainStatus::UnexpectedReverted => "The entry point reverted unexpectedly.",
        }
    }
}

impl fmt::Display for OnchainStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Raw result of running a boop through the entry point's simulation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationOutput {
    pub status: OnchainStatus,
    pub gas: u32,
    pub validate_gas: u32,
    pub validate_payment_gas: u32,
    pub execute_gas: u32,
    /// Fee the relay charges the payer. Always the boop's own fee for self-paying boops.
    #[serde(default)]
    pub submitter_fee: I256,
    /// The boop's nonce is ahead of the account's onchain nonce for its track.
    pub future_nonce: bool,
    /// Validation could not be decided offchain (e.g. signature checks skipped).
    pub validity_unknown: bool,
    pub payment_validity_unknown: bool,
    pub revert_data: Bytes,
}

/// Simulation result as cached for `getState` and returned by `simulate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationReport {
    pub boop_hash: B256,
    pub output: SimulationOutput,
    /// Absent when the fee oracle refused to quote.
    pub fees: Option<FeeEstimate>,
    pub fee_too_low: bool,
    pub fee_too_high: bool,
}
