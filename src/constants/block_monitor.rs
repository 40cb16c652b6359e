//! Block monitoring defaults (durations in ms).

pub const DEFAULT_BLOCK_POLLING_INTERVAL_MS: u64 = 200;
/// Time without a new block after which the active endpoint counts as timed out.
pub const DEFAULT_BLOCK_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_BLOCK_MAX_ATTEMPTS: u32 = 2;
pub const DEFAULT_BLOCK_RETRY_BASE_DELAY_MS: u64 = 1_000;
pub const DEFAULT_BLOCK_RETRY_MAX_DELAY_MS: u64 = 8_000;
pub const DEFAULT_BLOCK_HALTED_POLL_MS: u64 = 1_000;
/// Cooldown during which a timed out endpoint is not selected again.
pub const DEFAULT_RPC_TIMED_OUT_PERIOD_MS: u64 = 60_000;
pub const DEFAULT_BLOCK_HISTORY_SIZE: usize = 100;
pub const DEFAULT_MAX_BLOCK_BACKFILL: u64 = 15;
pub const DEFAULT_ALERT_GRACE_PERIOD_MS: u64 = 300_000;
