use crate::{
    config::GasConfig,
    models::{Boop, SubmitterError},
};

pub struct BoopValidator {}

impl BoopValidator {
    /// Checks the boop against the relay's gas policy before anything is simulated.
    ///
    /// Zero limits are left for the relay to fill and are not checked here. A self-paying boop
    /// must set every value itself, since its hash covers them.
    pub fn validate(boop: &Boop, gas: &GasConfig) -> Result<(), SubmitterError> {
        if boop.is_self_paying() && boop.has_missing_gas_values() {
            return Err(SubmitterError::MissingGasValues(
                "self-paying boops must specify gasLimit, validateGasLimit, executeGasLimit and maxFeePerGas"
                    .to_string(),
            ));
        }

        if boop.gas_limit > gas.max_gas_limit {
            return Err(SubmitterError::InvalidBoop(format!(
                "gasLimit {} is above the maximum of {}",
                boop.gas_limit, gas.max_gas_limit
            )));
        }

        Self::check_minimum("validateGasLimit", boop.validate_gas_limit, gas.minimum_validate_gas)?;
        Self::check_minimum(
            "validatePaymentGasLimit",
            boop.validate_payment_gas_limit,
            gas.minimum_validate_payment_gas,
        )?;
        Self::check_minimum("executeGasLimit", boop.execute_gas_limit, gas.minimum_execute_gas)?;

        for (name, limit) in [
            ("validateGasLimit", boop.validate_gas_limit),
            ("validatePaymentGasLimit", boop.validate_payment_gas_limit),
            ("executeGasLimit", boop.execute_gas_limit),
        ] {
            if boop.gas_limit != 0 && limit > boop.gas_limit {
                return Err(SubmitterError::InvalidBoop(format!(
                    "{} {} is above gasLimit {}",
                    name, limit, boop.gas_limit
                )));
            }
        }

        Ok(())
    }

    fn check_minimum(name: &str, value: u32, minimum: u32) -> Result<(), SubmitterError> {
        if value != 0 && value < minimum {
            return Err(SubmitterError::InvalidBoop(format!(
                "{} {} is below the minimum of {}",
                name, value, minimum
            )));
        }
        Ok(())
    }
}
