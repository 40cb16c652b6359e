//! # Retries with endpoint failover
//!
//! Every ledger call goes through [`retry_rpc_call`]: the call is retried on the same endpoint
//! with exponential backoff and jitter while the error is transient, and once the retries on an
//! endpoint are used up the endpoint is put on cooldown and the next one is tried.
use rand::Rng;
use std::future::Future;
use std::time::Duration;

use super::rpc_selector::RpcSelector;
use crate::config::ServerConfig;
use crate::constants::RETRY_JITTER_PERCENT;

/// Exponential backoff for retry `attempt` (0-based), capped at `max_delay_ms`, with jitter.
pub fn calculate_retry_delay(attempt: u8, base_delay_ms: u64, max_delay_ms: u64) -> Duration {
    if base_delay_ms == 0 || max_delay_ms == 0 {
        return Duration::ZERO;
    }
    let multiplier = 1u64.checked_shl(attempt as u32).unwrap_or(u64::MAX);
    let delay_ms = base_delay_ms.saturating_mul(multiplier).min(max_delay_ms);
    apply_jitter(delay_ms)
}

/// Spreads `delay_ms` uniformly over `delay_ms * (1 ± RETRY_JITTER_PERCENT)`.
fn apply_jitter(delay_ms: u64) -> Duration {
    let jitter_range = (delay_ms as f64 * RETRY_JITTER_PERCENT).floor() as u64;
    if jitter_range == 0 {
        return Duration::from_millis(delay_ms);
    }
    let mut rng = rand::rng();
    let jitter = rng.random_range(0..=jitter_range);
    let delay_ms = if rng.random_bool(0.5) {
        delay_ms.saturating_add(jitter)
    } else {
        delay_ms.saturating_sub(jitter)
    };
    Duration::from_millis(delay_ms)
}

#[derive(Debug)]
enum InternalRetryError<E> {
    NonRetriable(E),
    RetriesExhausted(E),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Attempts per endpoint.
    pub max_retries: u8,
    /// Endpoint switches per call.
    pub max_failovers: u8,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl RetryConfig {
    pub fn new(max_retries: u8, max_failovers: u8, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_retries,
            max_failovers,
            base_delay_ms,
            max_delay_ms,
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(
            config.provider_max_retries,
            config.provider_max_failovers,
            config.provider_retry_base_delay_ms,
            config.provider_retry_max_delay_ms,
        )
    }
}

/// Runs `operation` against the endpoints of `selector`.
///
/// * `is_retriable_error` - whether the same endpoint should be tried again
/// * `should_mark_provider_failed` - whether a non-retriable error still says something about
///   the endpoint (as opposed to the request), and the endpoint should cool down
/// * `provider_initializer` - builds a client for an endpoint URL
///
/// Returns the last error once every allowed endpoint has been exhausted.
pub async fn retry_rpc_call<P, T, E, F, Fut, I>(
    selector: &RpcSelector,
    operation_name: &str,
    is_retriable_error: impl Fn(&E) -> bool,
    should_mark_provider_failed: impl Fn(&E) -> bool,
    provider_initializer: I,
    operation: F,
    config: &RetryConfig,
) -> Result<T, E>
where
    P: Clone,
    E: std::fmt::Display + From<String>,
    F: Fn(P) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    I: Fn(&str) -> Result<P, E>,
{
    let max_failovers = (config.max_failovers as usize).min(selector.provider_count() - 1);
    let mut failover_count = 0;
    let mut total_attempts = 0;
    let mut last_error: Option<E> = None;

    while failover_count <= max_failovers && selector.available_provider_count() > 0 {
        let (provider, provider_url) =
            match get_provider(selector, operation_name, &provider_initializer) {
                Ok(selected) => selected,
                Err(e) => {
                    last_error = Some(e);
                    failover_count += 1;
                    selector.mark_current_as_failed();
                    continue;
                }
            };

        let outcome = try_with_retries(
            &provider,
            &provider_url,
            operation_name,
            &operation,
            &is_retriable_error,
            config,
            &mut total_attempts,
        )
        .await;

        match outcome {
            Ok(result) => return Ok(result),
            Err(InternalRetryError::NonRetriable(e)) => {
                if should_mark_provider_failed(&e) && selector.available_provider_count() > 1 {
                    log::warn!(
                        "Endpoint {} failed '{}' with '{}', cooling it down",
                        provider_url,
                        operation_name,
                        e
                    );
                    selector.mark_current_as_failed();
                }
                return Err(e);
            }
            Err(InternalRetryError::RetriesExhausted(e)) => {
                if selector.available_provider_count() <= 1 {
                    log::warn!(
                        "Retries exhausted on the last available endpoint {} for '{}': {}",
                        provider_url,
                        operation_name,
                        e
                    );
                    last_error = Some(e);
                    break;
                }
                log::warn!(
                    "Retries exhausted on endpoint {} for '{}': {}. Failing over ({}/{})",
                    provider_url,
                    operation_name,
                    e,
                    failover_count + 1,
                    max_failovers
                );
                last_error = Some(e);
                selector.mark_current_as_failed();
                failover_count += 1;
            }
        }
    }

    log::error!(
        "RPC call '{}' failed after {} attempts across {} endpoints",
        operation_name,
        total_attempts,
        failover_count + 1
    );
    Err(last_error.unwrap_or_else(|| {
        E::from(format!(
            "RPC call '{}' failed: no endpoint available",
            operation_name
        ))
    }))
}

fn get_provider<P, E, I>(
    selector: &RpcSelector,
    operation_name: &str,
    provider_initializer: &I,
) -> Result<(P, String), E>
where
    E: std::fmt::Display + From<String>,
    I: Fn(&str) -> Result<P, E>,
{
    let provider_url = selector.get_current_url().map_err(|e| {
        E::from(format!(
            "No endpoint for '{}': {}",
            operation_name, e
        ))
    })?;
    let provider = provider_initializer(&provider_url).inspect_err(|e| {
        log::warn!("Failed to initialize client for {}: {}", provider_url, e);
    })?;
    Ok((provider, provider_url))
}

async fn try_with_retries<P, T, E, F, Fut>(
    provider: &P,
    provider_url: &str,
    operation_name: &str,
    operation: &F,
    is_retriable_error: &impl Fn(&E) -> bool,
    config: &RetryConfig,
    total_attempts: &mut usize,
) -> Result<T, InternalRetryError<E>>
where
    P: Clone,
    E: std::fmt::Display,
    F: Fn(P) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let attempts = config.max_retries.max(1);
    let mut attempt = 0;
    loop {
        *total_attempts += 1;
        let error = match operation(provider.clone()).await {
            Ok(result) => return Ok(result),
            Err(e) => e,
        };

        attempt += 1;
        let retriable = is_retriable_error(&error);
        log::debug!(
            "RPC call '{}' on {} failed (attempt {}/{}, {}): {}",
            operation_name,
            provider_url,
            attempt,
            attempts,
            if retriable { "retriable" } else { "final" },
            error
        );

        if !retriable {
            return Err(InternalRetryError::NonRetriable(error));
        }
        if attempt >= attempts {
            return Err(InternalRetryError::RetriesExhausted(error));
        }
        tokio::time::sleep(calculate_retry_delay(
            attempt,
            config.base_delay_ms,
            config.max_delay_ms,
        ))
        .await;
    }
}
