//! # Boop Submitter
//!
//! HTTP service relaying boops to an entry point contract through a set of executor accounts.
//!
//! ## Features
//!
//! - Boop simulation, submission and execution
//! - Per-account nonce ordering
//! - Stuck transaction replacement and cancellation
//! - Receipt lookups with long polling
//!
//! ## Usage
//!
//! ```bash
//! cargo run
//! ```
use std::sync::Arc;

use actix_governor::{Governor, GovernorConfigBuilder};
use actix_web::{
    dev::Service,
    middleware::{self, from_fn, Logger},
    web, App, HttpResponse, HttpServer,
};
use color_eyre::{eyre::WrapErr, Result};
use dotenvy::dotenv;
use log::info;

use boop_submitter::{
    api,
    bootstrap::{initialize_app_state, initialize_workers},
    config::{ApiKeyRateLimit, ServerConfig},
    logging::setup_logging,
    metrics::middleware::record_request_metrics,
    utils::check_api_key_header,
};

#[actix_web::main]
async fn main() -> Result<()> {
    // Initialize error reporting with eyre
    color_eyre::install().wrap_err("Failed to initialize error reporting")?;

    dotenv().ok();
    setup_logging();

    let config = Arc::new(ServerConfig::from_env());
    config.validate().wrap_err("Invalid configuration")?;

    let (app_state, background) = initialize_app_state(&config).await?;
    initialize_workers(background).await?;

    let rate_limit_config = GovernorConfigBuilder::default()
        .requests_per_second(config.rate_limit_requests_per_second)
        .key_extractor(ApiKeyRateLimit)
        .burst_size(config.rate_limit_burst_size)
        .finish()
        .ok_or_else(|| eyre::eyre!("Invalid rate limit configuration"))?;

    let moved_cfg = Arc::clone(&config);
    info!("Starting server on {}:{}", config.host, config.port);
    HttpServer::new(move || {
        let config = Arc::clone(&moved_cfg);
        App::new()
            .wrap_fn(move |req, srv| {
                if check_api_key_header(&req, &config.api_key) {
                    return srv.call(req);
                }

                Box::pin(async move {
                    Ok(req.into_response(
                        HttpResponse::Unauthorized().body(
                            r#"{"success": false, "code":401, "error": "Unauthorized", "message": "Unauthorized"}"#.to_string(),
                        ),
                    ))
                })
            })
            .wrap(Governor::new(&rate_limit_config))
            .wrap(from_fn(record_request_metrics))
            .wrap(middleware::Compress::default())
            .wrap(middleware::NormalizePath::trim())
            .wrap(middleware::DefaultHeaders::new())
            .wrap(Logger::default())
            .app_data(web::ThinData(app_state.clone()))
            .service(web::scope("/api/v1").configure(api::routes::configure_routes))
    })
    .bind((config.host.as_str(), config.port))
    .wrap_err_with(|| format!("Failed to bind server to {}:{}", config.host, config.port))?
    .shutdown_timeout(5)
    .run()
    .await
    .wrap_err("Server runtime error")
}
