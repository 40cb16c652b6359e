//! Property-based tests for fee quoting.
//!
//! Quotes must never decrease when the base fee rises, replacements must outbid the replaced
//! transaction, and no accepted quote may exceed the configured ceiling.
//!
//!   Refer to `src/domain/fees.rs` for more details.
use boop_submitter::{
    config::FeeConfig,
    domain::{bump, FeeOracle},
    models::FeeQuote,
};
use proptest::prelude::*;

const GWEI: u128 = 1_000_000_000;

fn oracle() -> FeeOracle {
    FeeOracle::new(FeeConfig::default())
}

proptest! {
  #[test]
  fn prop_bump_strictly_increases(value in 0u128..u128::MAX / 1_000, percent in 0u64..500) {
      prop_assert!(bump(value, percent) > value);
  }

  #[test]
  fn prop_quote_is_monotonic_in_base_fee(base in 1u128..50 * GWEI, delta in 0u128..10 * GWEI) {
      let oracle = oracle();
      let low = oracle.quote(base, None);
      let high = oracle.quote(base + delta, None);
      if let (Ok(low), Ok(high)) = (low, high) {
          prop_assert!(high.quote.max_fee_per_gas >= low.quote.max_fee_per_gas);
          prop_assert!(high.min_block_fee >= low.min_block_fee);
      }
  }

  #[test]
  fn prop_quote_respects_ceiling(base in 0u128..200 * GWEI) {
      let oracle = oracle();
      if let Ok(estimate) = oracle.quote(base, None) {
          prop_assert!(estimate.quote.max_fee_per_gas <= oracle.config().max_basefee);
          prop_assert!(estimate.quote.max_fee_per_gas > base);
      }
  }

  #[test]
  fn prop_replacement_outbids(
    base in 1u128..20 * GWEI,
    replaced_fee in 1u128..40 * GWEI,
    replaced_priority in 0u128..GWEI
  ) {
      let oracle = oracle();
      let replaced = FeeQuote {
          max_fee_per_gas: replaced_fee,
          max_priority_fee_per_gas: replaced_priority,
      };
      if let Ok(estimate) = oracle.quote(base, Some(&replaced)) {
          let percent = oracle.config().fee_bump_percent;
          prop_assert!(estimate.quote.max_fee_per_gas >= bump(replaced_fee, percent));
          prop_assert!(
              estimate.quote.max_priority_fee_per_gas >= bump(replaced_priority, percent)
          );
      }
  }
}
