//! Entry point contract interface: the calls the relay makes and the events it reads back.
use alloy::primitives::Bytes;
use alloy::sol;
use alloy::sol_types::SolInterface;

use super::{Boop, OnchainStatus, SimulationOutput};

sol! {
    interface IEntryPoint {
        struct SimulationResult {
            uint8 status;
            uint32 gas;
            uint32 validateGas;
            uint32 validatePaymentGas;
            uint32 executeGas;
            bool validityUnknownDuringSimulation;
            bool paymentValidityUnknownDuringSimulation;
            bool futureNonceDuringSimulation;
            bytes revertData;
        }

        function nonceValues(address account, uint192 nonceTrack) external view returns (uint64 nonceValue);
        function simulate(bytes calldata encodedBoop) external returns (SimulationResult memory result);
        function submit(bytes calldata encodedBoop) external;

        event BoopSubmitted(
            address account,
            address dest,
            address payer,
            uint256 value,
            uint192 nonceTrack,
            uint64 nonceValue,
            uint256 maxFeePerGas,
            int256 submitterFee,
            uint32 gasLimit,
            uint32 validateGasLimit,
            uint32 validatePaymentGasLimit,
            uint32 executeGasLimit,
            bytes callData,
            bytes validatorData,
            bytes extraData
        );
        event BoopExecutionCompleted();
        event CallReverted(bytes revertData);
        event ExecutionRejected(bytes revertData);
        event ExecutionReverted(bytes revertData);

        error InvalidNonce();
        error InsufficientStake();
        error PayoutFailed();
        error GasPriceTooHigh();
        error ValidationReverted(bytes revertData);
        error ValidationRejected(bytes reason);
        error PaymentValidationReverted(bytes revertData);
        error PaymentValidationRejected(bytes reason);
        error InvalidSignature();
        error InvalidExtensionValue();
        error ExtensionAlreadyRegistered();
        error ExtensionNotRegistered();
    }
}

/// Maps revert data of a failed entry point call to a status.
///
/// Rejections carry the validator's reason, which is decoded one level further when it is one
/// of the well-known reasons. Anything unrecognized is an unexpected revert.
pub fn status_from_revert(data: &[u8]) -> (OnchainStatus, Bytes) {
    use IEntryPoint::IEntryPointErrors as E;

    let raw = Bytes::copy_from_slice(data);
    let Ok(error) = E::abi_decode(data, true) else {
        return (OnchainStatus::UnexpectedReverted, raw);
    };
    match error {
        E::InvalidNonce(_) => (OnchainStatus::InvalidNonce, raw),
        E::InsufficientStake(_) => (OnchainStatus::InsufficientStake, raw),
        E::PayoutFailed(_) => (OnchainStatus::PayoutFailed, raw),
        E::GasPriceTooHigh(_) => (OnchainStatus::GasPriceTooHigh, raw),
        E::ValidationReverted(e) => (OnchainStatus::ValidationReverted, e.revertData),
        E::PaymentValidationReverted(e) => (OnchainStatus::PaymentValidationReverted, e.revertData),
        E::ValidationRejected(e) => (
            rejection_reason(&e.reason).unwrap_or(OnchainStatus::ValidationRejected),
            e.reason,
        ),
        E::PaymentValidationRejected(e) => (OnchainStatus::PaymentValidationRejected, e.reason),
        _ => (OnchainStatus::UnexpectedReverted, raw),
    }
}

fn rejection_reason(reason: &[u8]) -> Option<OnchainStatus> {
    use IEntryPoint::IEntryPointErrors as E;

    match E::abi_decode(reason, true).ok()? {
        E::InvalidSignature(_) => Some(OnchainStatus::InvalidSignature),
        E::InvalidExtensionValue(_) => Some(OnchainStatus::InvalidExtensionValue),
        E::ExtensionAlreadyRegistered(_) => Some(OnchainStatus::ExtensionAlreadyRegistered),
        E::ExtensionNotRegistered(_) => Some(OnchainStatus::ExtensionNotRegistered),
        _ => None,
    }
}

impl From<IEntryPoint::SimulationResult> for SimulationOutput {
    fn from(result: IEntryPoint::SimulationResult) -> Self {
        Self {
            status: OnchainStatus::from_code(result.status),
            gas: result.gas,
            validate_gas: result.validateGas,
            validate_payment_gas: result.validatePaymentGas,
            execute_gas: result.executeGas,
            // the entry point charges no fee of its own, the relay's policy sets it
            submitter_fee: Default::default(),
            future_nonce: result.futureNonceDuringSimulation,
            validity_unknown: result.validityUnknownDuringSimulation,
            payment_validity_unknown: result.paymentValidityUnknownDuringSimulation,
            revert_data: result.revertData,
        }
    }
}

impl From<IEntryPoint::BoopSubmitted> for Boop {
    fn from(event: IEntryPoint::BoopSubmitted) -> Self {
        Self {
            account: event.account,
            dest: event.dest,
            payer: event.payer,
            value: event.value,
            nonce_track: event.nonceTrack,
            nonce_value: event.nonceValue,
            max_fee_per_gas: event.maxFeePerGas,
            submitter_fee: event.submitterFee,
            gas_limit: event.gasLimit,
            validate_gas_limit: event.validateGasLimit,
            validate_payment_gas_limit: event.validatePaymentGasLimit,
            execute_gas_limit: event.executeGasLimit,
            call_data: event.callData,
            validator_data: event.validatorData,
            extra_data: event.extraData,
        }
    }
}

impl From<&Boop> for IEntryPoint::BoopSubmitted {
    fn from(boop: &Boop) -> Self {
        Self {
            account: boop.account,
            dest: boop.dest,
            payer: boop.payer,
            value: boop.value,
            nonceTrack: boop.nonce_track,
            nonceValue: boop.nonce_value,
            maxFeePerGas: boop.max_fee_per_gas,
            submitterFee: boop.submitter_fee,
            gasLimit: boop.gas_limit,
            validateGasLimit: boop.validate_gas_limit,
            validatePaymentGasLimit: boop.validate_payment_gas_limit,
            executeGasLimit: boop.execute_gas_limit,
            callData: boop.call_data.clone(),
            validatorData: boop.validator_data.clone(),
            extraData: boop.extra_data.clone(),
        }
    }
}
