use std::sync::Arc;
use std::time::Duration;

use color_eyre::Result;
use redis::aio::ConnectionManager;
use tokio::time::timeout;

/// Initializes a Redis connection manager.
///
/// # Arguments
///
/// * `redis_url` - The Redis instance to connect to.
/// * `connection_timeout_ms` - How long to wait for the first connection.
///
/// # Returns
///
/// A connection manager for the Redis connection.
pub async fn initialize_redis_connection(
    redis_url: &str,
    connection_timeout_ms: u64,
) -> Result<Arc<ConnectionManager>> {
    let redis_client = redis::Client::open(redis_url)?;
    let connection_manager = timeout(
        Duration::from_millis(connection_timeout_ms),
        ConnectionManager::new(redis_client),
    )
    .await
    .map_err(|_| eyre::eyre!("Redis connection timeout after {}ms", connection_timeout_ms))??;

    Ok(Arc::new(connection_manager))
}
