use std::collections::HashMap;

use alloy::{
    consensus::{SignableTransaction, TxEip1559, TxEnvelope},
    eips::eip2718::Encodable2718,
    network::TxSigner,
    primitives::{Address, B256},
    signers::local::PrivateKeySigner,
};
use async_trait::async_trait;

use super::{SignedTransaction, Signer};
use crate::models::{SecretString, SignerError};

/// Signs with private keys held in memory.
pub struct LocalSigner {
    order: Vec<Address>,
    keys: HashMap<Address, PrivateKeySigner>,
}

fn parse_key(key: &SecretString) -> Result<PrivateKeySigner, SignerError> {
    key.as_str(|raw| {
        let bytes = hex::decode(raw.trim().trim_start_matches("0x"))
            .map_err(|e| SignerError::KeyError(format!("key is not hex: {}", e)))?;
        if bytes.len() != 32 {
            return Err(SignerError::KeyError(format!(
                "expected 32 bytes, got {}",
                bytes.len()
            )));
        }
        PrivateKeySigner::from_bytes(&B256::from_slice(&bytes))
            .map_err(|e| SignerError::KeyError(e.to_string()))
    })
}

impl LocalSigner {
    pub fn new(keys: &[SecretString]) -> Result<Self, SignerError> {
        if keys.is_empty() {
            return Err(SignerError::KeyError("no executor keys".to_string()));
        }
        let mut order = Vec::with_capacity(keys.len());
        let mut signers = HashMap::with_capacity(keys.len());
        for key in keys {
            let signer = parse_key(key)?;
            let address = signer.address();
            if signers.insert(address, signer).is_some() {
                return Err(SignerError::KeyError(format!(
                    "duplicate executor key for {}",
                    address
                )));
            }
            order.push(address);
        }
        Ok(Self {
            order,
            keys: signers,
        })
    }
}

#[async_trait]
impl Signer for LocalSigner {
    fn executors(&self) -> Vec<Address> {
        self.order.clone()
    }

    async fn sign_transaction(
        &self,
        executor: Address,
        mut transaction: TxEip1559,
    ) -> Result<SignedTransaction, SignerError> {
        let signer = self
            .keys
            .get(&executor)
            .ok_or(SignerError::UnknownExecutor(executor))?;

        let signature = signer
            .sign_transaction(&mut transaction)
            .await
            .map_err(|e| SignerError::SigningError(format!("Failed to sign transaction: {e}")))?;

        let signed = transaction.into_signed(signature);
        let hash = *signed.hash();
        let envelope = TxEnvelope::from(signed);

        Ok(SignedTransaction {
            hash,
            raw: envelope.encoded_2718().into(),
        })
    }
}
