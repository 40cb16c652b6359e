//! This module defines the HTTP routes for account creation.
use crate::{
    api::controllers::account::{self, CreateAccountRequest},
    models::AppState,
};
use actix_web::{post, web, Responder};

/// Deploys the account of an owner, waiting for the deployment to be included.
#[post("/accounts/create")]
async fn create_account(
    request: web::Json<CreateAccountRequest>,
    data: web::ThinData<AppState>,
) -> impl Responder {
    account::create(request.into_inner(), data).await
}

/// Initializes the routes for the account module.
pub fn init(cfg: &mut web::ServiceConfig) {
    cfg.service(create_account);
}
