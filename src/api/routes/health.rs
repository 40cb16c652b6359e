//! This module provides a health check endpoint for the API.
//!
//! The `/health` endpoint reports whether the service is running and how far the block monitor
//! got.
use actix_web::{get, web, HttpResponse};
use serde::Serialize;

use crate::models::{ApiResponse, AppState};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthStatus {
    status: &'static str,
    /// Latest accepted block, absent until the block monitor delivered one.
    current_block: Option<u64>,
}

/// Handles the `/health` endpoint.
///
/// Always `200 OK` while the server runs; a missing `currentBlock` means the relay cannot quote
/// fees from the chain head yet.
#[get("/health")]
async fn health(data: web::ThinData<AppState>) -> Result<HttpResponse, actix_web::Error> {
    let current_block = data.current_block().map(|block| block.number);
    Ok(HttpResponse::Ok().json(ApiResponse::success(HealthStatus {
        status: "ok",
        current_block,
    })))
}

/// Initializes the health check service.
///
/// Registers the `health` endpoint with the provided service configuration.
pub fn init(cfg: &mut web::ServiceConfig) {
    cfg.service(health);
}
