//! Executor accounts: the relay's funded signers and the lanes bound to them.
mod heap;
pub use heap::*;

mod pool;
pub use pool::*;
