//! Background workers
//!
//! Starts the block monitor and the executor binding sweep, then clears the executor nonces a
//! previous run left pending.
use std::time::Duration;

use color_eyre::Result;
use log::{info, warn};

use super::BackgroundServices;

const EXECUTOR_SWEEP_INTERVAL: Duration = Duration::from_secs(10);

pub async fn initialize_workers(services: BackgroundServices) -> Result<()> {
    let BackgroundServices {
        submitter,
        block_monitor,
    } = services;

    tokio::spawn(block_monitor.run());
    info!("Block monitor started");

    let executors = submitter.executor_pool();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(EXECUTOR_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            executors.sweep_expired();
        }
    });

    if let Err(e) = submitter.resync_executors().await {
        warn!("Executor resync incomplete: {}", e);
    }

    Ok(())
}
