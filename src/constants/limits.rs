//! Admission control and submission timing defaults.

pub const DEFAULT_MAX_PENDING_PER_TRACK: usize = 50;
pub const DEFAULT_MAX_TOTAL_PENDING: usize = 10_000;

/// Ceiling on how long a nonce-blocked boop waits for its predecessors (ms).
pub const DEFAULT_MAX_SUBMIT_PENDING_TIME_MS: u64 = 30_000;

/// Time a sent transaction may stay unincluded before it is replaced (ms).
pub const DEFAULT_STUCK_TX_WAIT_TIME_MS: u64 = 3_000;

pub const DEFAULT_RECEIPT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_MAX_RECEIPT_TIMEOUT_MS: u64 = 60_000;

/// Sliding lifetime of a lane to executor binding (ms).
pub const DEFAULT_EXECUTOR_BINDING_TTL_MS: u64 = 30_000;

/// Attempts at cancelling a stuck transaction before giving up on it.
pub const MAX_CANCEL_ATTEMPTS: u32 = 5;
pub const CANCEL_RETRY_BASE_DELAY_MS: u64 = 500;
pub const CANCEL_RETRY_MAX_DELAY_MS: u64 = 8_000;

/// Number of simulation results kept for `getState` lookups.
pub const SIMULATION_CACHE_SIZE: usize = 10_000;
