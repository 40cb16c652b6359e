//! Classification of outcomes that hint at an account or paymaster not playing by the rules.
//!
//! Nothing is blocked on this basis yet; flagged outcomes are logged under the `misbehaviour`
//! target so that a reputation policy can be layered on top.
use alloy::primitives::B256;

use crate::models::OnchainStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Simulation,
    Execution,
}

/// Statuses that a correctly implemented account and paymaster should never produce.
pub fn is_possible_misbehaviour(status: OnchainStatus) -> bool {
    matches!(
        status,
        // rejections are expected during simulation but cost the submitter when they happen onchain
        OnchainStatus::ExecuteRejected
            | OnchainStatus::ValidationRejected
            | OnchainStatus::PaymentValidationRejected
            // validation and execute must return encoded errors, never revert
            | OnchainStatus::ValidationReverted
            | OnchainStatus::PaymentValidationReverted
            | OnchainStatus::ExecuteReverted
            | OnchainStatus::UnexpectedReverted
            | OnchainStatus::EntryPointOutOfGas
            | OnchainStatus::InsufficientStake
            | OnchainStatus::PayoutFailed
    )
}

/// Logs the outcome when it is worth tracking. Returns whether it was flagged.
pub fn note_possible_misbehaviour(boop_hash: B256, status: OnchainStatus, stage: Stage) -> bool {
    if !is_possible_misbehaviour(status) {
        return false;
    }
    match stage {
        Stage::Simulation => log::info!(
            target: "misbehaviour",
            "Possible account or paymaster misbehaviour during simulation of {}: {}",
            boop_hash,
            status
        ),
        Stage::Execution => log::warn!(
            target: "misbehaviour",
            "Possible account or paymaster misbehaviour during execution of {}: {}",
            boop_hash,
            status
        ),
    }
    true
}
