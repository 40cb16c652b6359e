//! RPC endpoint configuration.
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::DEFAULT_RPC_WEIGHT;

#[derive(Debug, Error, PartialEq)]
pub enum RpcConfigError {
    #[error("Invalid weight: {value}. Must be between 0 and 100.")]
    InvalidWeight { value: u8 },
    #[error("Invalid RPC endpoint '{0}': only http and https URLs are supported")]
    InvalidUrl(String),
}

/// Configuration for an RPC endpoint.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RpcConfig {
    pub url: String,
    /// The weight of this endpoint in weighted selection, between 0 and 100.
    pub weight: u8,
}

impl RpcConfig {
    pub fn new(url: String) -> Self {
        Self {
            url,
            weight: DEFAULT_RPC_WEIGHT,
        }
    }

    pub fn with_weight(url: String, weight: u8) -> Result<Self, RpcConfigError> {
        if weight > 100 {
            return Err(RpcConfigError::InvalidWeight { value: weight });
        }
        Ok(Self { url, weight })
    }

    pub fn get_weight(&self) -> u8 {
        self.weight
    }
}

/// Parses `url` or `url|weight`.
impl FromStr for RpcConfig {
    type Err = RpcConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (url, weight) = match s.trim().split_once('|') {
            Some((url, weight)) => {
                let weight = weight
                    .trim()
                    .parse::<u8>()
                    .map_err(|_| RpcConfigError::InvalidUrl(s.to_string()))?;
                (url.trim(), weight)
            }
            None => (s.trim(), DEFAULT_RPC_WEIGHT),
        };
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(RpcConfigError::InvalidUrl(url.to_string()));
        }
        Self::with_weight(url.to_string(), weight)
    }
}
