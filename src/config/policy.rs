//! Policy settings consumed by the core components.
//!
//! Every setting has a default from [`crate::constants`]; values that fail to parse fall back
//! to the default, the same way the server settings do.
use std::{env, str::FromStr, time::Duration};

use alloy::primitives::Address;

use crate::constants::*;

use super::ConfigError;

/// Reads `name` from the environment, falling back to `default` when unset or unparsable.
pub(crate) fn env_parse<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

fn env_duration_ms(name: &str, default_ms: u64) -> Duration {
    Duration::from_millis(env_parse(name, default_ms))
}

/// Factory deploying accounts on request. Account creation is disabled unless both the factory
/// and the beacon are set.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountFactoryConfig {
    pub factory: Address,
    pub beacon: Address,
    pub gas_limit: u64,
}

impl AccountFactoryConfig {
    pub fn from_env() -> Option<Self> {
        let factory = env_parse("ACCOUNT_FACTORY_ADDRESS", Address::ZERO);
        let beacon = env_parse("ACCOUNT_BEACON_ADDRESS", Address::ZERO);
        if factory == Address::ZERO || beacon == Address::ZERO {
            return None;
        }
        Some(Self {
            factory,
            beacon,
            gas_limit: env_parse(
                "ACCOUNT_CREATION_GAS_LIMIT",
                DEFAULT_ACCOUNT_CREATION_GAS_LIMIT,
            ),
        })
    }
}

/// Fee margins (percent) and ceilings (wei) used by the fee oracle.
#[derive(Debug, Clone, PartialEq)]
pub struct FeeConfig {
    pub basefee_margin: u64,
    pub min_basefee_margin: u64,
    pub fee_bump_percent: u64,
    pub max_basefee: u128,
    pub initial_priority_fee: u128,
    pub max_priority_fee: u128,
    pub submitter_fee: u128,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            basefee_margin: DEFAULT_BASEFEE_MARGIN,
            min_basefee_margin: DEFAULT_MIN_BASEFEE_MARGIN,
            fee_bump_percent: DEFAULT_FEE_BUMP_PERCENT,
            max_basefee: DEFAULT_MAX_BASEFEE,
            initial_priority_fee: DEFAULT_INITIAL_PRIORITY_FEE,
            max_priority_fee: DEFAULT_MAX_PRIORITY_FEE,
            submitter_fee: DEFAULT_SUBMITTER_FEE,
        }
    }
}

impl FeeConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            basefee_margin: env_parse("BASEFEE_MARGIN", defaults.basefee_margin),
            min_basefee_margin: env_parse("MIN_BASEFEE_MARGIN", defaults.min_basefee_margin),
            fee_bump_percent: env_parse("FEE_BUMP_PERCENT", defaults.fee_bump_percent),
            max_basefee: env_parse("MAX_BASEFEE", defaults.max_basefee),
            initial_priority_fee: env_parse("INITIAL_PRIORITY_FEE", defaults.initial_priority_fee),
            max_priority_fee: env_parse("MAX_PRIORITY_FEE", defaults.max_priority_fee),
            submitter_fee: env_parse("SUBMITTER_FEE", defaults.submitter_fee),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_basefee_margin > self.basefee_margin {
            return Err(ConfigError::invalid(
                "MIN_BASEFEE_MARGIN",
                format!(
                    "{} is above BASEFEE_MARGIN ({})",
                    self.min_basefee_margin, self.basefee_margin
                ),
            ));
        }
        if self.fee_bump_percent < MIN_FEE_BUMP_PERCENT {
            return Err(ConfigError::invalid(
                "FEE_BUMP_PERCENT",
                format!("must be at least {}", MIN_FEE_BUMP_PERCENT),
            ));
        }
        if self.initial_priority_fee > self.max_priority_fee {
            return Err(ConfigError::invalid(
                "INITIAL_PRIORITY_FEE",
                "is above MAX_PRIORITY_FEE",
            ));
        }
        Ok(())
    }
}

/// Gas limits enforced on incoming boops and applied to simulated figures.
#[derive(Debug, Clone, PartialEq)]
pub struct GasConfig {
    pub safety_margin: u64,
    pub max_gas_limit: u32,
    pub minimum_validate_gas: u32,
    pub minimum_validate_payment_gas: u32,
    pub minimum_execute_gas: u32,
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            safety_margin: DEFAULT_GAS_SAFETY_MARGIN,
            max_gas_limit: DEFAULT_MAX_GAS_LIMIT,
            minimum_validate_gas: DEFAULT_MINIMUM_VALIDATE_GAS,
            minimum_validate_payment_gas: DEFAULT_MINIMUM_VALIDATE_PAYMENT_GAS,
            minimum_execute_gas: DEFAULT_MINIMUM_EXECUTE_GAS,
        }
    }
}

impl GasConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            safety_margin: env_parse("GAS_SAFETY_MARGIN", defaults.safety_margin),
            max_gas_limit: env_parse("MAX_GAS_LIMIT", defaults.max_gas_limit),
            minimum_validate_gas: env_parse("MINIMUM_VALIDATE_GAS", defaults.minimum_validate_gas),
            minimum_validate_payment_gas: env_parse(
                "MINIMUM_VALIDATE_PAYMENT_GAS",
                defaults.minimum_validate_payment_gas,
            ),
            minimum_execute_gas: env_parse("MINIMUM_EXECUTE_GAS", defaults.minimum_execute_gas),
        }
    }
}

/// Admission ceilings and the timings of the submission flow.
#[derive(Debug, Clone, PartialEq)]
pub struct LimitsConfig {
    pub max_pending_per_track: usize,
    pub max_total_pending: usize,
    pub max_submit_pending_time: Duration,
    pub stuck_tx_wait_time: Duration,
    pub receipt_timeout: Duration,
    pub max_receipt_timeout: Duration,
    pub executor_binding_ttl: Duration,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_pending_per_track: DEFAULT_MAX_PENDING_PER_TRACK,
            max_total_pending: DEFAULT_MAX_TOTAL_PENDING,
            max_submit_pending_time: Duration::from_millis(DEFAULT_MAX_SUBMIT_PENDING_TIME_MS),
            stuck_tx_wait_time: Duration::from_millis(DEFAULT_STUCK_TX_WAIT_TIME_MS),
            receipt_timeout: Duration::from_millis(DEFAULT_RECEIPT_TIMEOUT_MS),
            max_receipt_timeout: Duration::from_millis(DEFAULT_MAX_RECEIPT_TIMEOUT_MS),
            executor_binding_ttl: Duration::from_millis(DEFAULT_EXECUTOR_BINDING_TTL_MS),
        }
    }
}

impl LimitsConfig {
    pub fn from_env() -> Self {
        Self {
            max_pending_per_track: env_parse("MAX_PENDING_PER_TRACK", DEFAULT_MAX_PENDING_PER_TRACK),
            max_total_pending: env_parse("MAX_TOTAL_PENDING", DEFAULT_MAX_TOTAL_PENDING),
            max_submit_pending_time: env_duration_ms(
                "MAX_SUBMIT_PENDING_TIME_MS",
                DEFAULT_MAX_SUBMIT_PENDING_TIME_MS,
            ),
            stuck_tx_wait_time: env_duration_ms("STUCK_TX_WAIT_TIME_MS", DEFAULT_STUCK_TX_WAIT_TIME_MS),
            receipt_timeout: env_duration_ms("RECEIPT_TIMEOUT_MS", DEFAULT_RECEIPT_TIMEOUT_MS),
            max_receipt_timeout: env_duration_ms(
                "MAX_RECEIPT_TIMEOUT_MS",
                DEFAULT_MAX_RECEIPT_TIMEOUT_MS,
            ),
            executor_binding_ttl: env_duration_ms(
                "EXECUTOR_BINDING_TTL_MS",
                DEFAULT_EXECUTOR_BINDING_TTL_MS,
            ),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_pending_per_track == 0 {
            return Err(ConfigError::invalid("MAX_PENDING_PER_TRACK", "must be positive"));
        }
        if self.max_total_pending == 0 {
            return Err(ConfigError::invalid("MAX_TOTAL_PENDING", "must be positive"));
        }
        if self.receipt_timeout > self.max_receipt_timeout {
            return Err(ConfigError::invalid(
                "RECEIPT_TIMEOUT_MS",
                "is above MAX_RECEIPT_TIMEOUT_MS",
            ));
        }
        Ok(())
    }
}

/// Block monitor timings and history bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockMonitorConfig {
    pub polling_interval: Duration,
    pub block_timeout: Duration,
    pub max_attempts: u32,
    pub retry_base_delay: Duration,
    pub retry_max_delay: Duration,
    pub halted_poll_interval: Duration,
    pub endpoint_cooldown: Duration,
    pub request_timeout: Duration,
    pub short_request_timeout: Duration,
    pub history_size: usize,
    pub max_backfill: u64,
}

impl Default for BlockMonitorConfig {
    fn default() -> Self {
        Self {
            polling_interval: Duration::from_millis(DEFAULT_BLOCK_POLLING_INTERVAL_MS),
            block_timeout: Duration::from_millis(DEFAULT_BLOCK_TIMEOUT_MS),
            max_attempts: DEFAULT_BLOCK_MAX_ATTEMPTS,
            retry_base_delay: Duration::from_millis(DEFAULT_BLOCK_RETRY_BASE_DELAY_MS),
            retry_max_delay: Duration::from_millis(DEFAULT_BLOCK_RETRY_MAX_DELAY_MS),
            halted_poll_interval: Duration::from_millis(DEFAULT_BLOCK_HALTED_POLL_MS),
            endpoint_cooldown: Duration::from_millis(DEFAULT_RPC_TIMED_OUT_PERIOD_MS),
            request_timeout: Duration::from_millis(DEFAULT_RPC_REQUEST_TIMEOUT_MS),
            short_request_timeout: Duration::from_millis(DEFAULT_RPC_SHORT_REQUEST_TIMEOUT_MS),
            history_size: DEFAULT_BLOCK_HISTORY_SIZE,
            max_backfill: DEFAULT_MAX_BLOCK_BACKFILL,
        }
    }
}

impl BlockMonitorConfig {
    pub fn from_env() -> Self {
        Self {
            polling_interval: env_duration_ms(
                "BLOCK_MONITORING_POLLING_INTERVAL_MS",
                DEFAULT_BLOCK_POLLING_INTERVAL_MS,
            ),
            block_timeout: env_duration_ms("BLOCK_MONITORING_TIMEOUT_MS", DEFAULT_BLOCK_TIMEOUT_MS),
            max_attempts: env_parse("BLOCK_MONITORING_MAX_ATTEMPTS", DEFAULT_BLOCK_MAX_ATTEMPTS),
            retry_base_delay: env_duration_ms(
                "BLOCK_MONITORING_BASE_DELAY_MS",
                DEFAULT_BLOCK_RETRY_BASE_DELAY_MS,
            ),
            retry_max_delay: env_duration_ms(
                "BLOCK_MONITORING_MAX_DELAY_MS",
                DEFAULT_BLOCK_RETRY_MAX_DELAY_MS,
            ),
            halted_poll_interval: env_duration_ms(
                "BLOCK_MONITORING_HALTED_POLL_MS",
                DEFAULT_BLOCK_HALTED_POLL_MS,
            ),
            endpoint_cooldown: env_duration_ms(
                "RPC_TIMED_OUT_PERIOD_MS",
                DEFAULT_RPC_TIMED_OUT_PERIOD_MS,
            ),
            request_timeout: env_duration_ms("RPC_TIMEOUT_MS", DEFAULT_RPC_REQUEST_TIMEOUT_MS),
            short_request_timeout: env_duration_ms(
                "RPC_SHORT_REQUEST_TIMEOUT_MS",
                DEFAULT_RPC_SHORT_REQUEST_TIMEOUT_MS,
            ),
            history_size: env_parse("BLOCK_HISTORY_SIZE", DEFAULT_BLOCK_HISTORY_SIZE),
            max_backfill: env_parse("MAX_BLOCK_BACKFILL", DEFAULT_MAX_BLOCK_BACKFILL),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history_size == 0 {
            return Err(ConfigError::invalid("BLOCK_HISTORY_SIZE", "must be positive"));
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::invalid(
                "BLOCK_MONITORING_MAX_ATTEMPTS",
                "must be positive",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fee_config_validation() {
        assert!(FeeConfig::default().validate().is_ok());

        let config = FeeConfig {
            min_basefee_margin: 30,
            ..FeeConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { name, .. }) if name == "MIN_BASEFEE_MARGIN"
        ));

        let config = FeeConfig {
            fee_bump_percent: 5,
            ..FeeConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_limits_validation() {
        assert!(LimitsConfig::default().validate().is_ok());
        let config = LimitsConfig {
            max_pending_per_track: 0,
            ..LimitsConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_block_monitor_defaults() {
        let config = BlockMonitorConfig::default();
        assert_eq!(config.polling_interval, Duration::from_millis(200));
        assert_eq!(config.max_backfill, 15);
        assert!(config.validate().is_ok());
    }
}
