//! # Account Controller
//!
//! Deploys accounts through the factory on behalf of their owners.
use actix_web::{web, HttpResponse};
use alloy::primitives::{Address, B256};
use serde::{Deserialize, Serialize};

use crate::{
    models::{ApiResponse, CreateAccountResponse, CreateAccountStatus},
    ApiError, AppState,
};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CreateAccountRequest {
    pub salt: B256,
    pub owner: Address,
}

/// Creation is answered with 201, an existing account with 200. A failed or unconfirmed creation
/// still carries the response, flagged unsuccessful.
pub async fn create(
    request: CreateAccountRequest,
    state: web::ThinData<AppState>,
) -> Result<HttpResponse, ApiError> {
    let response = state
        .submitter()
        .create_account(request.salt, request.owner)
        .await?;
    Ok(match response.status {
        CreateAccountStatus::Success => HttpResponse::Created().json(ApiResponse::success(response)),
        CreateAccountStatus::AlreadyCreated => HttpResponse::Ok().json(ApiResponse::success(response)),
        CreateAccountStatus::Failed => HttpResponse::UnprocessableEntity().json(unsuccessful(response)),
        CreateAccountStatus::Timeout => HttpResponse::GatewayTimeout().json(unsuccessful(response)),
    })
}

fn unsuccessful(response: CreateAccountResponse) -> ApiResponse<CreateAccountResponse> {
    ApiResponse {
        success: false,
        error: response.description.clone(),
        data: Some(response),
    }
}
