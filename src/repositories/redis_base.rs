//! Encoding and error mapping shared by the Redis-backed storage.
//!
//! Values are JSON strings keyed by boop hash. Redis failures are classified into unavailability,
//! which callers may retry later, and everything else.
use alloy::primitives::B256;
use log::{error, warn};
use redis::{ErrorKind, RedisError};
use serde::{de::DeserializeOwned, Serialize};

use crate::models::RepositoryError;

pub trait RedisRepository {
    fn encode_value<T: Serialize>(&self, value: &T, boop_hash: &B256) -> Result<String, RepositoryError> {
        serde_json::to_string(value).map_err(|e| {
            error!("Could not encode value stored for boop {}: {}", boop_hash, e);
            RepositoryError::InvalidData(format!("encoding value of boop {}: {}", boop_hash, e))
        })
    }

    fn decode_value<T: DeserializeOwned>(&self, json: &str, boop_hash: &B256) -> Result<T, RepositoryError> {
        serde_json::from_str(json).map_err(|e| {
            error!(
                "Could not decode {} bytes stored for boop {}: {}",
                json.len(),
                boop_hash,
                e
            );
            RepositoryError::InvalidData(format!("decoding value of boop {}: {}", boop_hash, e))
        })
    }

    fn map_redis_error(&self, error: RedisError, operation: &str) -> RepositoryError {
        warn!("Redis {} failed: {}", operation, error);

        let unavailable = error.is_connection_refusal()
            || error.is_connection_dropped()
            || error.is_timeout()
            || matches!(
                error.kind(),
                ErrorKind::AuthenticationFailed | ErrorKind::BusyLoadingError | ErrorKind::ReadOnly
            );
        if unavailable {
            return RepositoryError::ConnectionError(format!("{}: {}", operation, error));
        }
        match error.kind() {
            ErrorKind::TypeError => {
                RepositoryError::InvalidData(format!("{}: unexpected type: {}", operation, error))
            }
            _ => RepositoryError::Unknown(format!("{}: {}", operation, error)),
        }
    }
}
