pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_RATE_LIMIT_REQUESTS_PER_SECOND: u64 = 100;
pub const DEFAULT_RATE_LIMIT_BURST_SIZE: u32 = 300;
pub const DEFAULT_REDIS_KEY_PREFIX: &str = "boop-submitter";
pub const DEFAULT_REDIS_CONNECTION_TIMEOUT_MS: u64 = 5_000;
