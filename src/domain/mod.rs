//! # Domain Module
//!
//! The relay core: fee computation, executor assignment, nonce ordering, receipt matching and
//! the submission pipeline tying them together.
pub mod account;
pub use account::AccountFactory;

mod executor;
pub use executor::*;

mod fees;
pub use fees::*;

mod nonce;
pub use nonce::*;

pub mod policy;

pub mod receipt;
pub use receipt::{InclusionOutcome, ReceiptMatcher};

mod submission;
pub use submission::*;
