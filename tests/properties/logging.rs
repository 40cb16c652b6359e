//! Property-based tests for log file naming.
//!
//! These tests verify the behavior of the `compute_rolled_file_path` function: the date and
//! index are inserted before the `.log` extension whether or not the base path carries one.
//!
//!   Refer to `src/logging/mod.rs` for more details.
use boop_submitter::logging::compute_rolled_file_path;
use proptest::{prelude::*, test_runner::Config};

proptest! {
  #![proptest_config(Config {
    cases: 1000, ..Config::default()
  })]

  /// Property test for compute_rolled_file_path when base ends with ".log"
  #[test]
  fn prop_compute_rolled_file_path_with_log_suffix(
    base in ".*[^.]",
    date in "[0-9]{4}-[0-9]{2}-[0-9]{2}",
    index in 1u32..100
  ) {
      let base_with_log = format!("{}.log", base);
      let result = compute_rolled_file_path(&base_with_log, &date, index);
      let expected = format!("{}-{}.{}.log", base, date, index);
      prop_assert_eq!(result, expected);
  }

  /// Property test for compute_rolled_file_path when base does not end with ".log"
  #[test]
  fn prop_compute_rolled_file_path_without_log_suffix(
    base in ".*",
    date in "[0-9]{4}-[0-9]{2}-[0-9]{2}"
  ) {
      let base_non_log = if base.ends_with(".log") {
        format!("{}x", base)
      } else {
        base
      };
      let result = compute_rolled_file_path(&base_non_log, &date, 1);
      let expected = format!("{}-{}.1.log", base_non_log, date);
      prop_assert_eq!(result, expected);
  }
}
