//! Application state initialization
//!
//! Builds the ledger provider, the executor signer, the receipt repository and the block monitor
//! from the server configuration, and ties them together in the submission pipeline.
use std::{sync::Arc, time::Duration};

use color_eyre::Result;
use eyre::WrapErr;
use log::{info, warn};

use crate::{
    config::ServerConfig,
    domain::{PipelineSettings, SubmissionPipeline},
    models::AppState,
    repositories::BoopReceiptRepositoryStorage,
    services::{
        AlertManager, BlockMonitor, EvmBlockSource, EvmLedgerProvider, LocalSigner, RetryConfig,
        Signer,
    },
    utils::initialize_redis_connection,
};

pub type DefaultSubmitter =
    SubmissionPipeline<EvmLedgerProvider, LocalSigner, BoopReceiptRepositoryStorage>;

/// Components that run next to the HTTP server.
pub struct BackgroundServices {
    pub submitter: Arc<DefaultSubmitter>,
    pub block_monitor: BlockMonitor<EvmBlockSource>,
}

/// Initializes the receipt repository: Redis when `REDIS_URL` is set, memory otherwise.
pub async fn initialize_receipt_repository(
    config: &ServerConfig,
) -> Result<BoopReceiptRepositoryStorage> {
    match &config.redis_url {
        Some(redis_url) => {
            let connection_manager =
                initialize_redis_connection(redis_url, config.redis_connection_timeout_ms).await?;
            info!("Storing receipts in Redis");
            Ok(BoopReceiptRepositoryStorage::new_redis(
                connection_manager,
                config.redis_key_prefix.clone(),
            )?)
        }
        None => {
            warn!("REDIS_URL is not set, receipts are kept in memory and lost on restart");
            Ok(BoopReceiptRepositoryStorage::new_in_memory())
        }
    }
}

/// Initializes the application state and the background services.
///
/// # Errors
///
/// Fails when an RPC URL or executor key is malformed, or when Redis cannot be reached.
pub async fn initialize_app_state(
    config: &ServerConfig,
) -> Result<(AppState, BackgroundServices)> {
    let monitor_config = config.block_monitor.clone();
    let provider = EvmLedgerProvider::new(
        config.rpc_configs()?,
        config.entry_point,
        monitor_config.request_timeout,
        monitor_config.endpoint_cooldown,
        RetryConfig::from_config(config),
    )
    .wrap_err("Failed to create the ledger provider")?;
    let block_sources = provider
        .block_sources(monitor_config.request_timeout)
        .wrap_err("Failed to create the block sources")?
        .into_iter()
        .map(Arc::new)
        .collect();

    let signer = LocalSigner::new(&config.executor_keys).wrap_err("Invalid executor key")?;
    info!("Loaded {} executors", signer.executors().len());

    let receipts = initialize_receipt_repository(config).await?;
    let alerts = Arc::new(AlertManager::from_webhook_url(
        config.alert_webhook_url.clone(),
        Duration::from_millis(config.alert_grace_period_ms),
    ));

    let block_monitor = BlockMonitor::new(block_sources, monitor_config, alerts.clone());
    let current_block = block_monitor.current_block();

    let submitter = Arc::new(SubmissionPipeline::new(
        Arc::new(provider),
        Arc::new(signer),
        Arc::new(receipts),
        alerts,
        current_block.clone(),
        block_monitor.block_stream(),
        PipelineSettings::from(config),
    ));

    let app_state = AppState {
        submitter: submitter.clone(),
        current_block,
        receipt_timeout: config.limits.receipt_timeout,
    };

    Ok((
        app_state,
        BackgroundServices {
            submitter,
            block_monitor,
        },
    ))
}
