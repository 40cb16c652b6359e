//! Boop Submitter Library
//!
//! Relays boops (signed account-abstraction calls) to an entry point contract on an EVM chain.
//! Executor accounts wrap each boop in a transaction, pay its gas and track it until a receipt
//! is available.
//!
//! # Module Structure
//!
//! - `api`: HTTP routes and controllers
//! - `bootstrap`: service wiring and background workers
//! - `config`: environment based configuration
//! - `domain`: fee computation, executor assignment, nonce ordering and the submission pipeline
//! - `logging`: log setup and file rolling
//! - `metrics`: Prometheus registry and request middleware
//! - `models`: data structures shared across modules
//! - `repositories`: receipt, submission and nonce storage
//! - `services`: ledger access, signing, block monitoring and alerts
//! - `utils`: common helpers

pub mod api;
pub mod bootstrap;
pub mod config;
pub mod constants;
pub mod domain;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod repositories;
pub mod services;
pub mod utils;

pub use models::{ApiError, AppState};
