//! Default fee policy values. Margins and bumps are percentages, fees are in wei.

/// Margin added on top of the latest base fee for a regular submission.
pub const DEFAULT_BASEFEE_MARGIN: u64 = 20;

/// Smaller margin used as a fallback when the regular margin would exceed the ceiling.
pub const DEFAULT_MIN_BASEFEE_MARGIN: u64 = 5;

/// Bump applied to the fees of a transaction being replaced.
pub const DEFAULT_FEE_BUMP_PERCENT: u64 = 15;

/// Most nodes refuse replacements under a 10% bump.
pub const MIN_FEE_BUMP_PERCENT: u64 = 10;

/// Ceiling for `maxFeePerGas` (100 gwei).
pub const DEFAULT_MAX_BASEFEE: u128 = 100_000_000_000;

pub const DEFAULT_INITIAL_PRIORITY_FEE: u128 = 1;

pub const DEFAULT_MAX_PRIORITY_FEE: u128 = 1_000;

/// Fee charged to the payer of a sponsored boop that leaves `submitterFee` at zero.
pub const DEFAULT_SUBMITTER_FEE: u128 = 0;
