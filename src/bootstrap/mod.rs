//! Initialization routines for the submitter service
//!
//! # Submodules
//!
//! - `initialize_app_state`: builds the services and the application state from the configuration
//! - `initialize_workers`: starts the background tasks (block monitor, executor sweeps) and
//!   resynchronizes the executors
mod initialize_app_state;
pub use initialize_app_state::*;

mod initialize_workers;
pub use initialize_workers::*;
