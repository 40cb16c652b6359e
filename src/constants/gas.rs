//! Gas accounting defaults.

/// Percentage added to simulated gas figures before they are used as limits.
pub const DEFAULT_GAS_SAFETY_MARGIN: u64 = 20;

/// Gas the entry point itself consumes around the boop, added to the ledger transaction limit.
pub const ENTRYPOINT_GAS_BUFFER: u64 = 70_000;

pub const DEFAULT_MAX_GAS_LIMIT: u32 = 10_000_000;
pub const DEFAULT_MINIMUM_VALIDATE_GAS: u32 = 20_000;
pub const DEFAULT_MINIMUM_VALIDATE_PAYMENT_GAS: u32 = 20_000;
pub const DEFAULT_MINIMUM_EXECUTE_GAS: u32 = 5_500;

/// Gas limit of a plain value transfer, used by cancellation transactions.
pub const TRANSFER_GAS_LIMIT: u64 = 21_000;

/// Gas limit of the account factory's `createAccount` transaction.
pub const DEFAULT_ACCOUNT_CREATION_GAS_LIMIT: u64 = 600_000;
