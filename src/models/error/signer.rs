use alloy::primitives::Address;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Serialize)]
#[allow(clippy::enum_variant_names)]
pub enum SignerError {
    #[error("Failed to sign transaction: {0}")]
    SigningError(String),

    #[error("Invalid key format: {0}")]
    KeyError(String),

    #[error("No key loaded for executor {0}")]
    UnknownExecutor(Address),
}
