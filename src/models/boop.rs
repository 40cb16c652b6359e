//! The boop: a user-signed intent executed by the entry point on behalf of an account.
//!
//! A boop is identified by the keccak256 hash of its packed encoding followed by the chain id.
//! The validator data (which carries the user's signature) never takes part in the hash. For
//! sponsored boops (payer differs from the account) the gas and fee fields are zeroed before
//! hashing, because the relay is allowed to fill them in after the user signed.
use std::fmt;

use alloy::primitives::{aliases::U192, keccak256, Address, Bytes, B256, I256, U256};
use serde::{Deserialize, Serialize};

use super::SimulationOutput;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Boop {
    pub account: Address,
    pub dest: Address,
    pub payer: Address,
    pub value: U256,
    pub nonce_track: U192,
    pub nonce_value: u64,
    pub max_fee_per_gas: U256,
    pub submitter_fee: I256,
    pub gas_limit: u32,
    pub validate_gas_limit: u32,
    pub validate_payment_gas_limit: u32,
    pub execute_gas_limit: u32,
    pub call_data: Bytes,
    pub validator_data: Bytes,
    pub extra_data: Bytes,
}

/// An ordering lane: one account's nonce track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NonceKey {
    pub account: Address,
    pub track: U192,
}

impl NonceKey {
    pub fn new(account: Address, track: U192) -> Self {
        Self { account, track }
    }
}

impl fmt::Display for NonceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.account, self.track)
    }
}

/// Gas figures reported by a simulation, after the safety margin was applied, and the submitter
/// fee the relay charges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GasFill {
    pub gas_limit: u32,
    pub validate_gas_limit: u32,
    pub validate_payment_gas_limit: u32,
    pub execute_gas_limit: u32,
    pub submitter_fee: I256,
}

impl GasFill {
    /// Scales the simulated figures by `margin` percent, saturating at `u32::MAX`.
    pub fn from_simulation(output: &SimulationOutput, margin: u64) -> Self {
        let scale = |gas: u32| -> u32 {
            let scaled = u64::from(gas) * (100 + margin) / 100;
            u32::try_from(scaled).unwrap_or(u32::MAX)
        };
        Self {
            gas_limit: scale(output.gas),
            validate_gas_limit: scale(output.validate_gas),
            validate_payment_gas_limit: scale(output.validate_payment_gas),
            execute_gas_limit: scale(output.execute_gas),
            submitter_fee: output.submitter_fee,
        }
    }
}

impl Boop {
    pub fn nonce_key(&self) -> NonceKey {
        NonceKey::new(self.account, self.nonce_track)
    }

    pub fn is_self_paying(&self) -> bool {
        self.payer == self.account
    }

    pub fn is_sponsored(&self) -> bool {
        !self.is_self_paying()
    }

    /// True when any gas or fee field was left for the relay to fill. Self-paying boops skip
    /// payment validation, so they need no payment gas limit.
    pub fn has_missing_gas_values(&self) -> bool {
        self.gas_limit == 0
            || self.validate_gas_limit == 0
            || (self.is_sponsored() && self.validate_payment_gas_limit == 0)
            || self.execute_gas_limit == 0
            || self.max_fee_per_gas.is_zero()
    }

    /// Computes the boop hash on the given chain.
    pub fn hash(&self, chain_id: u64) -> B256 {
        let mut hashed = self.clone();
        hashed.validator_data = Bytes::new();
        if hashed.is_sponsored() {
            hashed.gas_limit = 0;
            hashed.validate_gas_limit = 0;
            hashed.validate_payment_gas_limit = 0;
            hashed.execute_gas_limit = 0;
            hashed.max_fee_per_gas = U256::ZERO;
            hashed.submitter_fee = I256::ZERO;
        }
        let mut preimage = hashed.encode().to_vec();
        preimage.extend_from_slice(&U256::from(chain_id).to_be_bytes::<32>());
        keccak256(preimage)
    }

    /// Packed encoding understood by the entry point: fixed-size fields in declaration order,
    /// followed by each dynamic field prefixed with its length as a big-endian `u32`.
    pub fn encode(&self) -> Bytes {
        let mut out = Vec::with_capacity(
            240 + self.call_data.len() + self.validator_data.len() + self.extra_data.len(),
        );
        out.extend_from_slice(self.account.as_slice());
        out.extend_from_slice(self.dest.as_slice());
        out.extend_from_slice(self.payer.as_slice());
        out.extend_from_slice(&self.value.to_be_bytes::<32>());
        out.extend_from_slice(&self.nonce_track.to_be_bytes::<24>());
        out.extend_from_slice(&self.nonce_value.to_be_bytes());
        out.extend_from_slice(&self.max_fee_per_gas.to_be_bytes::<32>());
        out.extend_from_slice(&self.submitter_fee.to_be_bytes::<32>());
        out.extend_from_slice(&self.gas_limit.to_be_bytes());
        out.extend_from_slice(&self.validate_gas_limit.to_be_bytes());
        out.extend_from_slice(&self.validate_payment_gas_limit.to_be_bytes());
        out.extend_from_slice(&self.execute_gas_limit.to_be_bytes());
        for field in [&self.call_data, &self.validator_data, &self.extra_data] {
            out.extend_from_slice(&(field.len() as u32).to_be_bytes());
            out.extend_from_slice(field);
        }
        out.into()
    }

    /// Returns the variant sent onchain: zero gas fields take the simulated values, a zero
    /// `maxFeePerGas` takes the quoted fee and a zero `submitterFee` the relay's fee. Non-zero
    /// fields are kept as the user signed them.
    ///
    /// Self-paying boops are hashed with their gas and fee fields, so they are sent unchanged.
    pub fn filled(&self, gas: &GasFill, max_fee_per_gas: u128) -> Boop {
        if self.is_self_paying() {
            return self.clone();
        }
        let pick = |own: u32, simulated: u32| if own == 0 { simulated } else { own };
        let mut filled = self.clone();
        filled.gas_limit = pick(self.gas_limit, gas.gas_limit);
        filled.validate_gas_limit = pick(self.validate_gas_limit, gas.validate_gas_limit);
        filled.validate_payment_gas_limit =
            pick(self.validate_payment_gas_limit, gas.validate_payment_gas_limit);
        filled.execute_gas_limit = pick(self.execute_gas_limit, gas.execute_gas_limit);
        if filled.max_fee_per_gas.is_zero() {
            filled.max_fee_per_gas = U256::from(max_fee_per_gas);
        }
        if filled.submitter_fee.is_zero() {
            filled.submitter_fee = gas.submitter_fee;
        }
        filled
    }
}

/// A boop as listed by `getPending`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingBoop {
    pub nonce_track: U192,
    pub nonce_value: u64,
    pub boop_hash: B256,
    /// True while the boop waits in the nonce gate for its predecessors.
    pub blocked: bool,
}
