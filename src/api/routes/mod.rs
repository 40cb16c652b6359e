//! # API Routes Module
//!
//! Configures HTTP routes for the submitter service API.
//!
//! ## Routes
//!
//! * `/health` - Health check endpoint
//! * `/boop` - Boop endpoints
//! * `/accounts` - Account creation
//! * `/executors` - Executor load
//! * `/metrics` - Prometheus metrics

pub mod account;
pub mod boop;
pub mod health;
pub mod metrics;

use actix_web::web;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.configure(health::init)
        .configure(boop::init)
        .configure(account::init)
        .configure(metrics::init);
}
