//! Account factory interface and the outcome of an account creation request.
use alloy::primitives::{Address, B256};
use alloy::sol;
use serde::{Deserialize, Serialize};

sol! {
    interface IAccountFactory {
        function createAccount(bytes32 salt, address owner) external returns (address account);
        function getProxyCreationCode() external pure returns (bytes memory code);

        event Deployed(address account, address owner);
    }

    interface IAccountInitializer {
        function initialize(address owner) external;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CreateAccountStatus {
    Success,
    AlreadyCreated,
    /// The creation transaction was included but reverted.
    Failed,
    /// No receipt for the creation transaction arrived in time.
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountResponse {
    pub status: CreateAccountStatus,
    pub owner: Address,
    pub salt: B256,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CreateAccountResponse {
    pub fn created(status: CreateAccountStatus, owner: Address, salt: B256, address: Address) -> Self {
        Self {
            status,
            owner,
            salt,
            address: Some(address),
            description: None,
        }
    }

    pub fn failed(
        status: CreateAccountStatus,
        owner: Address,
        salt: B256,
        description: impl Into<String>,
    ) -> Self {
        Self {
            status,
            owner,
            salt,
            address: None,
            description: Some(description.into()),
        }
    }
}
