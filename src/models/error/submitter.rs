use alloy::primitives::{Bytes, B256};
use thiserror::Error;

use super::{ApiError, RepositoryError, SignerError};
use crate::models::OnchainStatus;
use crate::services::ProviderError;

/// Broad classes of submission failures, used to pick the caller-facing response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The boop breaks a relay or protocol rule; resubmitting it unchanged will fail again.
    RejectedByPolicy,
    /// The entry point reported a failure during simulation or execution.
    LedgerRevert,
    /// The relay is at one of its admission ceilings.
    Admission,
    /// A wait expired; the boop may still land.
    Timeout,
    /// RPC or internal failure.
    Transient,
}

#[derive(Error, Debug)]
pub enum SubmitterError {
    #[error("Invalid nonce: {0}")]
    InvalidNonce(String),

    #[error("Invalid boop: {0}")]
    InvalidBoop(String),

    #[error("Missing gas values: {0}")]
    MissingGasValues(String),

    #[error("Gas price too high: maxFeePerGas {max_fee_per_gas}, maxPriorityFeePerGas {max_priority_fee_per_gas}")]
    GasPriceTooHigh {
        max_fee_per_gas: u128,
        max_priority_fee_per_gas: u128,
    },

    #[error("Gas price too low: boop allows {provided}, network requires at least {required}")]
    GasPriceTooLow { provided: u128, required: u128 },

    #[error("Boop {0} is already being processed")]
    AlreadyProcessing(B256),

    #[error("{status}: {description}")]
    Onchain {
        status: OnchainStatus,
        description: String,
        revert_data: Bytes,
    },

    #[error("Too many pending boops for this nonce track")]
    BufferExceeded,

    #[error("The submitter is at capacity, try again later")]
    OverCapacity,

    #[error("Nonce {value} is too far ahead of the expected nonce {expected}")]
    NonceTooFarAhead { value: u64, expected: u64 },

    #[error("Boop was replaced by a newer boop with the same nonce")]
    Replaced,

    #[error("Timed out waiting for earlier nonces to be submitted")]
    SubmitTimeout,

    #[error("Timed out waiting for the receipt of boop {0}")]
    ReceiptTimeout(B256),

    #[error("Unknown boop {0}")]
    UnknownBoop(B256),

    #[error("Account creation is not enabled on this submitter")]
    AccountCreationDisabled,

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Signer error: {0}")]
    Signer(#[from] SignerError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Transaction management error: {0}")]
    TransactionManagement(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl SubmitterError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SubmitterError::InvalidNonce(_)
            | SubmitterError::InvalidBoop(_)
            | SubmitterError::MissingGasValues(_)
            | SubmitterError::GasPriceTooHigh { .. }
            | SubmitterError::GasPriceTooLow { .. }
            | SubmitterError::AlreadyProcessing(_)
            | SubmitterError::UnknownBoop(_)
            | SubmitterError::AccountCreationDisabled => ErrorKind::RejectedByPolicy,
            SubmitterError::Onchain { .. } => ErrorKind::LedgerRevert,
            SubmitterError::BufferExceeded
            | SubmitterError::OverCapacity
            | SubmitterError::NonceTooFarAhead { .. } => ErrorKind::Admission,
            SubmitterError::Replaced
            | SubmitterError::SubmitTimeout
            | SubmitterError::ReceiptTimeout(_) => ErrorKind::Timeout,
            SubmitterError::Provider(_)
            | SubmitterError::Signer(_)
            | SubmitterError::Repository(_)
            | SubmitterError::TransactionManagement(_)
            | SubmitterError::Unexpected(_) => ErrorKind::Transient,
        }
    }

    /// Builds the failure for an entry point status, using its stock description.
    pub fn onchain(status: OnchainStatus, revert_data: Bytes) -> Self {
        SubmitterError::Onchain {
            status,
            description: status.description().to_string(),
            revert_data,
        }
    }
}

impl From<SubmitterError> for ApiError {
    fn from(error: SubmitterError) -> Self {
        let message = error.to_string();
        match error {
            SubmitterError::UnknownBoop(_) => ApiError::NotFound(message),
            // a replaced wait is final for the caller, unlike the other timeouts
            SubmitterError::Replaced => ApiError::BadRequest(message),
            _ => match error.kind() {
                ErrorKind::RejectedByPolicy | ErrorKind::LedgerRevert => {
                    ApiError::BadRequest(message)
                }
                ErrorKind::Admission => ApiError::TooManyRequests(message),
                ErrorKind::Timeout => ApiError::Timeout(message),
                ErrorKind::Transient => ApiError::InternalError(message),
            },
        }
    }
}
