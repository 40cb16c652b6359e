//! Fee computation for ledger transactions.
//!
//! Quotes are derived from the latest base fee every time they are needed and never cached. A
//! quote for a replacement must beat the replaced transaction by the configured bump, which is
//! what nodes require before accepting a transaction at an already used nonce.
use alloy::primitives::{I256, U256};

use crate::{
    config::FeeConfig,
    models::{Boop, FeeEstimate, FeeQuote, SubmitterError},
};

/// Adds `percent` to `value`, plus one unit so that an exact margin boundary is never truncated.
pub fn bump(value: u128, percent: u64) -> u128 {
    value
        .saturating_mul(100 + u128::from(percent))
        .checked_div(100)
        .unwrap_or(u128::MAX)
        .saturating_add(1)
}

#[derive(Debug, Clone)]
pub struct FeeOracle {
    config: FeeConfig,
}

impl FeeOracle {
    pub fn new(config: FeeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FeeConfig {
        &self.config
    }

    /// Quotes fees for a transaction on top of `base_fee`, beating `replaced` when given.
    ///
    /// When the regular margin lands above `max_basefee`, the smaller minimum margin is used
    /// instead if that fits. Otherwise the over-ceiling values are returned in the error.
    pub fn quote(
        &self,
        base_fee: u128,
        replaced: Option<&FeeQuote>,
    ) -> Result<FeeEstimate, SubmitterError> {
        let config = &self.config;

        let replacement_priority = replaced
            .map(|r| bump(r.max_priority_fee_per_gas, config.fee_bump_percent))
            .unwrap_or(0);
        let priority = config.initial_priority_fee.max(replacement_priority);
        if priority > config.max_priority_fee {
            return Err(SubmitterError::GasPriceTooHigh {
                max_fee_per_gas: bump(base_fee, config.basefee_margin).saturating_add(priority),
                max_priority_fee_per_gas: priority,
            });
        }

        let normal_fee = bump(base_fee, config.basefee_margin).saturating_add(priority);
        let min_block_fee = bump(base_fee, config.min_basefee_margin).saturating_add(priority);
        let replacement_floor = replaced
            .map(|r| bump(r.max_fee_per_gas, config.fee_bump_percent))
            .unwrap_or(0);

        let max_fee = normal_fee.max(replacement_floor);
        let min_fee = min_block_fee.max(replacement_floor);

        let chosen = if max_fee <= config.max_basefee {
            max_fee
        } else if min_fee <= config.max_basefee {
            log::info!(
                "Fee with the regular margin ({}) is above the ceiling ({}), using the minimum margin ({})",
                max_fee,
                config.max_basefee,
                min_fee
            );
            min_fee
        } else {
            return Err(SubmitterError::GasPriceTooHigh {
                max_fee_per_gas: max_fee,
                max_priority_fee_per_gas: priority,
            });
        };

        Ok(FeeEstimate {
            quote: FeeQuote {
                max_fee_per_gas: chosen,
                max_priority_fee_per_gas: priority,
            },
            min_fee,
            min_block_fee,
        })
    }

    /// Fees for the transaction carrying `boop`.
    ///
    /// A boop that sets its own `maxFeePerGas` caps what the transaction may pay, and must allow
    /// at least the fee needed to get into the next block.
    pub fn fees_for_boop(
        &self,
        boop: &Boop,
        estimate: &FeeEstimate,
    ) -> Result<FeeQuote, SubmitterError> {
        if boop.max_fee_per_gas.is_zero() {
            return Ok(estimate.quote);
        }
        let allowed = u128::try_from(boop.max_fee_per_gas).unwrap_or(u128::MAX);
        if allowed < estimate.min_block_fee {
            return Err(SubmitterError::GasPriceTooLow {
                provided: allowed,
                required: estimate.min_block_fee,
            });
        }
        let max_fee_per_gas = estimate.quote.max_fee_per_gas.min(allowed);
        Ok(FeeQuote {
            max_fee_per_gas,
            max_priority_fee_per_gas: estimate.quote.max_priority_fee_per_gas.min(max_fee_per_gas),
        })
    }

    /// Submitter fee the payer is charged. Boops that set their own fee keep it, and self-paying
    /// boops are never charged more than they signed for.
    pub fn submitter_fee(&self, boop: &Boop) -> I256 {
        if boop.is_self_paying() || !boop.submitter_fee.is_zero() {
            return boop.submitter_fee;
        }
        I256::from_raw(U256::from(self.config.submitter_fee))
    }

    /// Whether a boop's own fee limit is below what the network currently requires.
    pub fn is_fee_too_low(&self, boop: &Boop, estimate: &FeeEstimate) -> bool {
        !boop.max_fee_per_gas.is_zero()
            && boop.max_fee_per_gas < U256::from(estimate.min_block_fee)
    }
}
