//! # Models Module
//!
//! Contains core data structures and type definitions for the submitter service.

pub mod account;
pub use account::{CreateAccountResponse, CreateAccountStatus};

mod app_state;
pub use app_state::*;

mod api_response;
pub use api_response::*;

pub mod block;
pub use block::{Block, BlockTag};

pub mod boop;
pub use boop::{Boop, GasFill, NonceKey, PendingBoop};

pub mod entry_point;

mod error;
pub use error::*;

mod fee;
pub use fee::*;

mod receipt;
pub use receipt::*;

mod rpc;
pub use rpc::*;

mod secret_string;
pub use secret_string::*;

mod simulation;
pub use simulation::*;
