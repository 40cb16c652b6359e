//! Configuration system for the boop submitter.
//!
//! All settings come from environment variables (optionally loaded from a `.env` file). They
//! are grouped into the server surface, ledger access, fee policy, gas policy, admission limits
//! and block monitoring.
mod server_config;
pub use server_config::*;

mod policy;
pub use policy::*;

mod rate_limit;
pub use rate_limit::*;

mod error;
pub use error::*;
