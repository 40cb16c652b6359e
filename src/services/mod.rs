//! # Services Module
//!
//! Integrations with the outside world: the ledger endpoints, transaction signing, the chain head
//! monitor and operator alerts.

mod alerting;
pub use alerting::*;

mod block_monitor;
pub use block_monitor::*;

mod provider;
pub use provider::*;

mod signer;
pub use signer::*;
