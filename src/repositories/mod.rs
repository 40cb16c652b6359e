//! Repository Module
//!
//! State held by the relay outside the core components:
//!
//! - [`BoopStore`]: in-flight boops
//! - [`SimulationCache`]: latest simulation per boop hash
//! - [`InMemoryExecutorNonceCounter`]: ledger nonces of the executors
//! - [`BoopReceiptRepository`]: submitted transactions and final receipts, in memory or Redis
mod boop_store;
pub use boop_store::*;

mod executor_nonce;
pub use executor_nonce::*;

mod simulation_cache;
pub use simulation_cache::*;

pub mod receipt;
pub use receipt::{
    BoopReceiptRepository, BoopReceiptRepositoryStorage, InMemoryBoopReceiptRepository,
    RedisBoopReceiptRepository,
};

pub mod redis_base;
