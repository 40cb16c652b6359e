//! This module contains all the constant values used in the system
mod fees;
pub use fees::*;

mod gas;
pub use gas::*;

mod limits;
pub use limits::*;

mod block_monitor;
pub use block_monitor::*;

mod provider;
pub use provider::*;

mod server;
pub use server::*;
