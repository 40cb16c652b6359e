//! Accounts deployed by the factory on behalf of their owners.
//!
//! The factory deploys a beacon proxy with CREATE2, salted with the owner, so the address of an
//! account is known before it exists. Predicting it locally needs the proxy creation code, which
//! is read from the factory once and kept.
use std::sync::Arc;

use alloy::primitives::{keccak256, Address, Bytes, B256};
use alloy::sol_types::{SolCall, SolEvent, SolValue};
use tokio::sync::OnceCell;

use crate::config::AccountFactoryConfig;
use crate::models::account::{IAccountFactory, IAccountInitializer};
use crate::models::EvmReceipt;
use crate::services::{LedgerProvider, ProviderError};

const LOG_TARGET: &str = "accounts";

/// Address the factory at `factory` deploys the account of `owner` to.
pub fn account_address(
    factory: Address,
    beacon: Address,
    creation_code: &[u8],
    salt: B256,
    owner: Address,
) -> Address {
    let mut packed = Vec::with_capacity(52);
    packed.extend_from_slice(salt.as_slice());
    packed.extend_from_slice(owner.as_slice());
    let combined_salt = keccak256(&packed);

    let init_data = Bytes::from(IAccountInitializer::initializeCall { owner }.abi_encode());
    let mut code = creation_code.to_vec();
    code.extend_from_slice(&(beacon, init_data).abi_encode_params());

    factory.create2(combined_salt.0, keccak256(&code).0)
}

pub struct AccountFactory<P: LedgerProvider> {
    provider: Arc<P>,
    config: AccountFactoryConfig,
    creation_code: OnceCell<Bytes>,
}

impl<P: LedgerProvider> AccountFactory<P> {
    pub fn new(provider: Arc<P>, config: AccountFactoryConfig) -> Self {
        Self {
            provider,
            config,
            creation_code: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &AccountFactoryConfig {
        &self.config
    }

    /// Proxy creation code of the factory. A failed read is retried on the next call.
    async fn creation_code(&self) -> Result<&Bytes, ProviderError> {
        self.creation_code
            .get_or_try_init(|| async {
                let input = IAccountFactory::getProxyCreationCodeCall {}.abi_encode();
                let output = self.provider.call(self.config.factory, input.into()).await?;
                let decoded =
                    IAccountFactory::getProxyCreationCodeCall::abi_decode_returns(&output, true)
                        .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
                log::debug!(
                    target: LOG_TARGET,
                    "Read {} bytes of proxy creation code from {}",
                    decoded.code.len(),
                    self.config.factory
                );
                Ok::<_, ProviderError>(decoded.code)
            })
            .await
    }

    pub async fn predict_address(&self, salt: B256, owner: Address) -> Result<Address, ProviderError> {
        let creation_code = self.creation_code().await?;
        Ok(account_address(
            self.config.factory,
            self.config.beacon,
            creation_code,
            salt,
            owner,
        ))
    }

    pub async fn is_deployed(&self, address: Address) -> Result<bool, ProviderError> {
        Ok(!self.provider.get_code(address).await?.is_empty())
    }

    /// Calldata of the factory call deploying the account.
    pub fn create_input(salt: B256, owner: Address) -> Bytes {
        IAccountFactory::createAccountCall { salt, owner }
            .abi_encode()
            .into()
    }

    /// Account announced by the factory's `Deployed` event in `receipt`.
    pub fn deployed_account(&self, receipt: &EvmReceipt) -> Option<Address> {
        receipt
            .logs
            .iter()
            .filter(|log| {
                log.address == self.config.factory
                    && log.topics.first() == Some(&IAccountFactory::Deployed::SIGNATURE_HASH)
            })
            .find_map(|log| {
                IAccountFactory::Deployed::decode_raw_log(log.topics.iter().copied(), &log.data, true)
                    .ok()
            })
            .map(|event| event.account)
    }
}
