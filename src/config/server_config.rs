/// Configuration for the server, the ledger connection and the submission policies.
use std::env;

use alloy::primitives::Address;

use crate::constants::*;
use crate::models::{RpcConfig, SecretString};

use super::{
    env_parse, AccountFactoryConfig, BlockMonitorConfig, ConfigError, FeeConfig, GasConfig, LimitsConfig,
};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// The host address the server will bind to.
    pub host: String,
    /// The port number the server will listen on.
    pub port: u16,
    /// The API key used for authentication.
    pub api_key: SecretString,
    /// The number of requests allowed per second.
    pub rate_limit_requests_per_second: u64,
    /// The maximum burst size for rate limiting.
    pub rate_limit_burst_size: u32,
    /// Redis instance for receipts. Receipts are kept in memory when unset.
    pub redis_url: Option<String>,
    pub redis_key_prefix: String,
    pub redis_connection_timeout_ms: u64,
    pub chain_id: u64,
    pub entry_point: Address,
    /// Raw `RPC_URLS` entries in priority order, see [`ServerConfig::rpc_configs`].
    pub rpc_urls: Vec<String>,
    /// Private keys of the executor accounts.
    pub executor_keys: Vec<SecretString>,
    pub provider_max_retries: u8,
    pub provider_max_failovers: u8,
    pub provider_retry_base_delay_ms: u64,
    pub provider_retry_max_delay_ms: u64,
    pub linear_retry_delay_ms: u64,
    pub alert_webhook_url: Option<String>,
    pub alert_grace_period_ms: u64,
    pub fees: FeeConfig,
    pub gas: GasConfig,
    pub limits: LimitsConfig,
    pub block_monitor: BlockMonitorConfig,
    pub accounts: Option<AccountFactoryConfig>,
}

fn env_list(name: &str) -> Vec<String> {
    env::var(name)
        .map(|value| {
            value
                .split(',')
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn env_optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

impl ServerConfig {
    /// Creates a new `ServerConfig` instance from environment variables.
    ///
    /// # Panics
    ///
    /// This function will panic if the `API_KEY` environment variable is not set.
    ///
    /// # Defaults
    ///
    /// - `HOST` defaults to `"0.0.0.0"`.
    /// - `APP_PORT` defaults to `8080`.
    /// - `RATE_LIMIT_REQUESTS_PER_SECOND` defaults to `100`.
    /// - `RATE_LIMIT_BURST_SIZE` defaults to `300`.
    /// - `CHAIN_ID` defaults to `0` and `ENTRYPOINT_ADDRESS` to the zero address; both are
    ///   rejected by [`ServerConfig::validate`].
    pub fn from_env() -> Self {
        Self {
            host: env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string()),
            port: env_parse("APP_PORT", DEFAULT_PORT),
            api_key: SecretString::new(&env::var("API_KEY").expect("API_KEY must be set")),
            rate_limit_requests_per_second: env_parse(
                "RATE_LIMIT_REQUESTS_PER_SECOND",
                DEFAULT_RATE_LIMIT_REQUESTS_PER_SECOND,
            ),
            rate_limit_burst_size: env_parse(
                "RATE_LIMIT_BURST_SIZE",
                DEFAULT_RATE_LIMIT_BURST_SIZE,
            ),
            redis_url: env_optional("REDIS_URL"),
            redis_key_prefix: env::var("REDIS_KEY_PREFIX")
                .unwrap_or_else(|_| DEFAULT_REDIS_KEY_PREFIX.to_string()),
            redis_connection_timeout_ms: env_parse(
                "REDIS_CONNECTION_TIMEOUT_MS",
                DEFAULT_REDIS_CONNECTION_TIMEOUT_MS,
            ),
            chain_id: env_parse("CHAIN_ID", 0),
            entry_point: env_parse("ENTRYPOINT_ADDRESS", Address::ZERO),
            rpc_urls: env_list("RPC_URLS"),
            executor_keys: env_list("EXECUTOR_KEYS")
                .iter()
                .map(|key| SecretString::new(key))
                .collect(),
            provider_max_retries: env_parse("PROVIDER_MAX_RETRIES", DEFAULT_PROVIDER_MAX_RETRIES),
            provider_max_failovers: env_parse(
                "PROVIDER_MAX_FAILOVERS",
                DEFAULT_PROVIDER_MAX_FAILOVERS,
            ),
            provider_retry_base_delay_ms: env_parse(
                "PROVIDER_RETRY_BASE_DELAY_MS",
                DEFAULT_PROVIDER_RETRY_BASE_DELAY_MS,
            ),
            provider_retry_max_delay_ms: env_parse(
                "PROVIDER_RETRY_MAX_DELAY_MS",
                DEFAULT_PROVIDER_RETRY_MAX_DELAY_MS,
            ),
            linear_retry_delay_ms: env_parse("LINEAR_RETRY_DELAY_MS", DEFAULT_LINEAR_RETRY_DELAY_MS),
            alert_webhook_url: env_optional("ALERT_WEBHOOK_URL"),
            alert_grace_period_ms: env_parse("ALERT_GRACE_PERIOD_MS", DEFAULT_ALERT_GRACE_PERIOD_MS),
            fees: FeeConfig::from_env(),
            gas: GasConfig::from_env(),
            limits: LimitsConfig::from_env(),
            block_monitor: BlockMonitorConfig::from_env(),
            accounts: AccountFactoryConfig::from_env(),
        }
    }

    /// Parses `RPC_URLS` entries (`url` or `url|weight`).
    pub fn rpc_configs(&self) -> Result<Vec<RpcConfig>, ConfigError> {
        self.rpc_urls
            .iter()
            .map(|entry| {
                entry
                    .parse::<RpcConfig>()
                    .map_err(|e| ConfigError::invalid("RPC_URLS", e.to_string()))
            })
            .collect()
    }

    /// Checks the settings the service cannot start without, and the policy invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.is_empty() {
            return Err(ConfigError::MissingField("API_KEY".to_string()));
        }
        if self.chain_id == 0 {
            return Err(ConfigError::MissingField("CHAIN_ID".to_string()));
        }
        if self.entry_point == Address::ZERO {
            return Err(ConfigError::MissingField("ENTRYPOINT_ADDRESS".to_string()));
        }
        if self.rpc_urls.is_empty() {
            return Err(ConfigError::MissingField("RPC_URLS".to_string()));
        }
        self.rpc_configs()?;
        if self.executor_keys.is_empty() {
            return Err(ConfigError::MissingField("EXECUTOR_KEYS".to_string()));
        }
        if (self.provider_retry_base_delay_ms == 0) != (self.provider_retry_max_delay_ms == 0)
            || self.provider_retry_max_delay_ms < self.provider_retry_base_delay_ms
        {
            return Err(ConfigError::invalid(
                "PROVIDER_RETRY_MAX_DELAY_MS",
                "must be zero together with the base delay, or at least the base delay",
            ));
        }
        self.fees.validate()?;
        self.limits.validate()?;
        self.block_monitor.validate()?;
        Ok(())
    }
}
