//! This module defines the HTTP routes for boop operations.
//! The routes are integrated with the Actix-web framework and interact with the boop controller.
use crate::{
    api::controllers::boop::{self, BoopRequest, ReceiptQuery},
    models::AppState,
};
use actix_web::{get, post, web, Responder};

/// Dry-runs a boop and reports its gas figures, validity and fee flags.
#[post("/boop/simulate")]
async fn simulate_boop(
    request: web::Json<BoopRequest>,
    data: web::ThinData<AppState>,
) -> impl Responder {
    boop::simulate(request.into_inner(), data).await
}

/// Submits a boop, answering once the carrying transaction was sent.
#[post("/boop/submit")]
async fn submit_boop(
    request: web::Json<BoopRequest>,
    data: web::ThinData<AppState>,
) -> impl Responder {
    boop::submit(request.into_inner(), data).await
}

/// Submits a boop and waits for its receipt.
#[post("/boop/execute")]
async fn execute_boop(
    request: web::Json<BoopRequest>,
    data: web::ThinData<AppState>,
) -> impl Responder {
    boop::execute(request.into_inner(), data).await
}

#[get("/boop/state/{boop_hash}")]
async fn get_boop_state(
    boop_hash: web::Path<String>,
    data: web::ThinData<AppState>,
) -> impl Responder {
    boop::get_state(boop_hash.into_inner(), data).await
}

#[get("/boop/pending/{account}")]
async fn get_pending_boops(
    account: web::Path<String>,
    data: web::ThinData<AppState>,
) -> impl Responder {
    boop::get_pending(account.into_inner(), data).await
}

#[get("/boop/receipt/{boop_hash}")]
async fn wait_for_receipt(
    boop_hash: web::Path<String>,
    query: web::Query<ReceiptQuery>,
    data: web::ThinData<AppState>,
) -> impl Responder {
    boop::wait_for_receipt(boop_hash.into_inner(), query.into_inner(), data).await
}

#[get("/executors")]
async fn executor_stats(data: web::ThinData<AppState>) -> impl Responder {
    boop::executor_stats(data).await
}

/// Initializes the routes for the boop module.
pub fn init(cfg: &mut web::ServiceConfig) {
    cfg.service(simulate_boop);
    cfg.service(submit_boop);
    cfg.service(execute_boop);
    cfg.service(get_boop_state);
    cfg.service(get_pending_boops);
    cfg.service(wait_for_receipt);
    cfg.service(executor_stats);
}
