/// Default weight of an RPC endpoint in weighted selection.
pub const DEFAULT_RPC_WEIGHT: u8 = 100;

/// Jitter applied to retry delays, as a fraction of the delay.
pub const RETRY_JITTER_PERCENT: f64 = 0.2;

pub const DEFAULT_PROVIDER_MAX_RETRIES: u8 = 3;
pub const DEFAULT_PROVIDER_MAX_FAILOVERS: u8 = 3;
pub const DEFAULT_PROVIDER_RETRY_BASE_DELAY_MS: u64 = 100;
pub const DEFAULT_PROVIDER_RETRY_MAX_DELAY_MS: u64 = 2_000;

pub const DEFAULT_RPC_REQUEST_TIMEOUT_MS: u64 = 3_000;
/// Timeout used when racing endpoints against each other.
pub const DEFAULT_RPC_SHORT_REQUEST_TIMEOUT_MS: u64 = 500;

/// Delay between receipt fetch attempts once a transaction is seen in a block.
pub const DEFAULT_LINEAR_RETRY_DELAY_MS: u64 = 100;
pub const RECEIPT_FETCH_ATTEMPTS: u32 = 3;
