use alloy::primitives::{aliases::U192, keccak256, Address, B256};

use super::SubmissionPipeline;
use crate::domain::{AccountFactory, InclusionOutcome};
use crate::models::{CreateAccountResponse, CreateAccountStatus, NonceKey, SubmitterError};
use crate::repositories::BoopReceiptRepository;
use crate::services::{LedgerProvider, Signer};

const LOG_TARGET: &str = "accounts";

impl<P, S, R> SubmissionPipeline<P, S, R>
where
    P: LedgerProvider + 'static,
    S: Signer + 'static,
    R: BoopReceiptRepository + 'static,
{
    /// Deploys the account of `owner` unless it already exists, and waits for the deployment.
    pub(super) async fn deploy_account(
        &self,
        salt: B256,
        owner: Address,
    ) -> Result<CreateAccountResponse, SubmitterError> {
        let factory = self
            .accounts
            .as_ref()
            .ok_or(SubmitterError::AccountCreationDisabled)?;

        let predicted = factory.predict_address(salt, owner).await?;
        log::debug!(target: LOG_TARGET, "Account of {} with salt {} is {}", owner, salt, predicted);

        if factory.is_deployed(predicted).await? {
            log::debug!(target: LOG_TARGET, "Account {} already exists", predicted);
            return Ok(CreateAccountResponse::created(
                CreateAccountStatus::AlreadyCreated,
                owner,
                salt,
                predicted,
            ));
        }

        let fees = self.quote(None).await?.quote;
        // the deployment takes the lane the account's first boops will use
        let job = keccak256([salt.as_slice(), owner.as_slice()].concat());
        let executor = self
            .executors
            .acquire(job, NonceKey::new(predicted, U192::ZERO))?;
        let sent = self
            .send_transaction(
                executor,
                factory.config().factory,
                AccountFactory::<P>::create_input(salt, owner),
                factory.config().gas_limit,
                fees,
                None,
            )
            .await?;
        log::info!(
            target: LOG_TARGET,
            "Sent creation of account {} in transaction {} from executor {}",
            predicted,
            sent.tx_hash,
            executor
        );

        let receipt = match self
            .matcher
            .wait_for_inclusion(sent.tx_hash, self.settings.limits.receipt_timeout)
            .await
        {
            InclusionOutcome::Included(receipt) => receipt,
            InclusionOutcome::CantFetch | InclusionOutcome::TimedOut => {
                log::warn!(
                    target: LOG_TARGET,
                    "No receipt for creation of account {} in transaction {}",
                    predicted,
                    sent.tx_hash
                );
                return Ok(CreateAccountResponse::failed(
                    CreateAccountStatus::Timeout,
                    owner,
                    salt,
                    "Timed out while waiting for receipt",
                ));
            }
        };

        if !receipt.status {
            log::error!(
                target: LOG_TARGET,
                "Creation of account {} reverted in transaction {}",
                predicted,
                sent.tx_hash
            );
            return Ok(CreateAccountResponse::failed(
                CreateAccountStatus::Failed,
                owner,
                salt,
                "Account creation failed onchain",
            ));
        }

        let address = match factory.deployed_account(&receipt) {
            Some(deployed) if deployed != predicted => {
                log::error!(
                    target: LOG_TARGET,
                    "Predicted account {} but the factory deployed {}",
                    predicted,
                    deployed
                );
                deployed
            }
            Some(deployed) => deployed,
            None => {
                log::warn!(
                    target: LOG_TARGET,
                    "No Deployed event in transaction {}",
                    sent.tx_hash
                );
                predicted
            }
        };
        log::info!(target: LOG_TARGET, "Created account {} for {}", address, owner);
        Ok(CreateAccountResponse::created(
            CreateAccountStatus::Success,
            owner,
            salt,
            address,
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use alloy::primitives::Bytes;
    use alloy::sol_types::SolCall;
    use parking_lot::Mutex;

    use super::super::pipeline::test_utils::*;
    use super::super::SubmitterTrait;
    use super::*;
    use crate::config::LimitsConfig;
    use crate::domain::account::account_address;
    use crate::domain::account::test_utils::{
        creation_code, creation_code_output, deployed_log, factory_config, BEACON, FACTORY,
    };
    use crate::domain::receipt::test_utils::create_test_receipt;
    use crate::models::account::IAccountFactory;
    use crate::services::MockLedgerProvider;

    const OWNER: Address = Address::repeat_byte(0x0a);
    const SALT: B256 = B256::repeat_byte(0x01);

    fn predicted() -> Address {
        account_address(FACTORY, BEACON, &creation_code(), SALT, OWNER)
    }

    fn factory_provider(code: Bytes) -> MockLedgerProvider {
        let mut provider = MockLedgerProvider::new();
        provider
            .expect_call()
            .returning(|_, _| Ok(creation_code_output()));
        provider
            .expect_get_code()
            .returning(move |_| Ok(code.clone()));
        provider
    }

    fn account_settings() -> crate::domain::PipelineSettings {
        let mut settings = test_settings();
        settings.accounts = Some(factory_config());
        settings.limits = LimitsConfig {
            receipt_timeout: Duration::from_millis(200),
            ..LimitsConfig::default()
        };
        settings
    }

    /// Expects one creation transaction and serves `receipt` for it, if any.
    fn expect_creation(
        provider: &mut MockLedgerProvider,
        receipt: Option<(Vec<crate::models::EvmLog>, bool)>,
    ) {
        provider
            .expect_get_transaction_count()
            .returning(|_, _| Ok(0));
        provider
            .expect_send_raw_transaction()
            .times(1)
            .returning(|raw| Ok(keccak256(raw)));
        provider
            .expect_get_transaction_receipt()
            .returning(move |tx_hash| {
                Ok(receipt
                    .clone()
                    .map(|(logs, status)| create_test_receipt(tx_hash, logs, status)))
            });
    }

    #[tokio::test]
    async fn test_existing_account_is_not_deployed_again() {
        let provider = factory_provider(Bytes::from_static(&[0x60, 0x80]));
        let harness = setup_pipeline_with(provider, nonce_encoding_signer(), account_settings());

        let response = harness.pipeline.create_account(SALT, OWNER).await.unwrap();

        assert_eq!(response.status, CreateAccountStatus::AlreadyCreated);
        assert_eq!(response.address, Some(predicted()));
    }

    #[tokio::test]
    async fn test_account_is_deployed_through_the_factory() {
        let mut provider = factory_provider(Bytes::new());
        expect_creation(&mut provider, Some((vec![deployed_log(predicted(), OWNER)], true)));
        let inputs = Arc::new(Mutex::new(Vec::new()));
        let harness = setup_pipeline_with(
            provider,
            input_recording_signer(inputs.clone()),
            account_settings(),
        );

        let response = harness.pipeline.create_account(SALT, OWNER).await.unwrap();

        assert_eq!(response.status, CreateAccountStatus::Success);
        assert_eq!(response.address, Some(predicted()));
        let inputs = inputs.lock();
        assert_eq!(inputs.len(), 1);
        let call = IAccountFactory::createAccountCall::abi_decode(&inputs[0], true).unwrap();
        assert_eq!(call.salt, SALT);
        assert_eq!(call.owner, OWNER);
    }

    #[tokio::test]
    async fn test_deployed_event_wins_over_prediction() {
        let other = Address::repeat_byte(0xac);
        let mut provider = factory_provider(Bytes::new());
        expect_creation(&mut provider, Some((vec![deployed_log(other, OWNER)], true)));
        let harness = setup_pipeline_with(provider, nonce_encoding_signer(), account_settings());

        let response = harness.pipeline.create_account(SALT, OWNER).await.unwrap();

        assert_eq!(response.status, CreateAccountStatus::Success);
        assert_eq!(response.address, Some(other));
    }

    #[tokio::test]
    async fn test_reverted_creation_fails() {
        let mut provider = factory_provider(Bytes::new());
        expect_creation(&mut provider, Some((vec![], false)));
        let harness = setup_pipeline_with(provider, nonce_encoding_signer(), account_settings());

        let response = harness.pipeline.create_account(SALT, OWNER).await.unwrap();

        assert_eq!(response.status, CreateAccountStatus::Failed);
        assert_eq!(response.address, None);
        assert_eq!(
            response.description.as_deref(),
            Some("Account creation failed onchain")
        );
    }

    #[tokio::test]
    async fn test_missing_receipt_times_out() {
        let mut provider = factory_provider(Bytes::new());
        expect_creation(&mut provider, None);
        let harness = setup_pipeline_with(provider, nonce_encoding_signer(), account_settings());

        let response = harness.pipeline.create_account(SALT, OWNER).await.unwrap();

        assert_eq!(response.status, CreateAccountStatus::Timeout);
        assert!(response.description.is_some());
    }

    #[tokio::test]
    async fn test_creation_without_factory_is_refused() {
        let harness = setup_pipeline(MockLedgerProvider::new(), nonce_encoding_signer());

        let result = harness.pipeline.create_account(SALT, OWNER).await;

        assert!(matches!(result, Err(SubmitterError::AccountCreationDisabled)));
    }
}
