//! # Boop Controller
//!
//! Handles the boop endpoints: simulation, submission, execution and the lookups of state,
//! pending boops and receipts.
use std::time::Duration;

use actix_web::{web, HttpResponse};
use alloy::primitives::{Address, B256};
use serde::{Deserialize, Serialize};

use crate::{
    models::{ApiResponse, Boop, BoopReceipt, OnchainStatus, PendingBoop},
    ApiError, AppState,
};

/// Request body of the endpoints taking a boop.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BoopRequest {
    pub boop: Boop,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReceiptQuery {
    /// Wait in milliseconds, capped by the configured maximum.
    pub timeout: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteResponse {
    pub status: OnchainStatus,
    pub receipt: BoopReceipt,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingResponse {
    pub account: Address,
    pub pending: Vec<PendingBoop>,
}

fn parse_hash(hash: &str) -> Result<B256, ApiError> {
    hash.trim()
        .parse::<B256>()
        .map_err(|_| ApiError::BadRequest(format!("Invalid boop hash: {}", hash)))
}

fn parse_address(address: &str) -> Result<Address, ApiError> {
    address
        .trim()
        .parse::<Address>()
        .map_err(|_| ApiError::BadRequest(format!("Invalid address: {}", address)))
}

pub async fn simulate(
    request: BoopRequest,
    state: web::ThinData<AppState>,
) -> Result<HttpResponse, ApiError> {
    let report = state.submitter().simulate(request.boop).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(report)))
}

pub async fn submit(
    request: BoopRequest,
    state: web::ThinData<AppState>,
) -> Result<HttpResponse, ApiError> {
    let response = state.submitter().submit(request.boop).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(response)))
}

pub async fn execute(
    request: BoopRequest,
    state: web::ThinData<AppState>,
) -> Result<HttpResponse, ApiError> {
    let receipt = state.submitter().execute(request.boop).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(ExecuteResponse {
        status: receipt.status,
        receipt,
    })))
}

pub async fn get_state(
    boop_hash: String,
    state: web::ThinData<AppState>,
) -> Result<HttpResponse, ApiError> {
    let boop_hash = parse_hash(&boop_hash)?;
    let boop_state = state.submitter().get_state(boop_hash).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(boop_state)))
}

pub async fn get_pending(
    account: String,
    state: web::ThinData<AppState>,
) -> Result<HttpResponse, ApiError> {
    let account = parse_address(&account)?;
    let pending = state.submitter().get_pending(account).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(PendingResponse { account, pending })))
}

pub async fn wait_for_receipt(
    boop_hash: String,
    query: ReceiptQuery,
    state: web::ThinData<AppState>,
) -> Result<HttpResponse, ApiError> {
    let boop_hash = parse_hash(&boop_hash)?;
    let timeout = query
        .timeout
        .map(Duration::from_millis)
        .unwrap_or(state.receipt_timeout);
    let receipt = state
        .submitter()
        .wait_for_receipt(boop_hash, timeout)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(receipt)))
}

pub async fn executor_stats(state: web::ThinData<AppState>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(ApiResponse::success(state.submitter().executor_stats())))
}
