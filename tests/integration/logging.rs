//! File logging: setup in file mode and rolling of the daily file.
//!
//! Environment variables used:
//! - LOG_MODE: "stdout" (default) or "file"
//! - LOG_LEVEL: log level, default "info"
//! - LOG_DATA_DIR: directory of the log files
//!   Refer to `src/logging/mod.rs` for more details.
use boop_submitter::logging::{setup_logging, space_based_rolling, time_based_rolling, LogConfig};
use chrono::Utc;
use std::{env, fs, path::Path, sync::Mutex, thread, time::Duration};
use tempfile::TempDir;

static ENV_MUTEX: Mutex<()> = Mutex::new(());

fn today() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

#[test]
fn test_setup_logging_file_mode_creates_log_file() {
    let _guard = ENV_MUTEX
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let temp_log_dir = temp_dir.path().to_str().unwrap();

    env::remove_var("IN_DOCKER");
    env::remove_var("LOG_MAX_SIZE");
    env::set_var("LOG_MODE", "file");
    env::set_var("LOG_LEVEL", "debug");
    env::set_var("LOG_DATA_DIR", format!("{}/", temp_log_dir));

    // the global logger can only be installed once per test binary
    setup_logging();
    log::info!("file logging test");
    thread::sleep(Duration::from_millis(200));

    let expected_path = time_based_rolling(
        &format!("{}/submitter.log", temp_log_dir),
        &today(),
        1,
    );
    assert!(
        Path::new(&expected_path).exists(),
        "Expected log file {} does not exist",
        expected_path
    );
}

#[test]
fn test_log_config_points_at_daily_file() {
    let _guard = ENV_MUTEX
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    env::remove_var("IN_DOCKER");
    env::set_var("LOG_MODE", "file");
    env::set_var("LOG_DATA_DIR", "/var/log/boops/");
    env::set_var("LOG_MAX_SIZE", "1024");

    let config = LogConfig::from_env();
    assert!(config.to_file);
    assert_eq!(config.max_size, 1024);
    assert_eq!(
        config.log_file_path("2026-01-02"),
        "/var/log/boops/submitter-2026-01-02.1.log"
    );

    env::remove_var("LOG_MAX_SIZE");
    env::remove_var("LOG_DATA_DIR");
    env::remove_var("LOG_MODE");
}

#[test]
fn test_full_log_file_rolls_to_next_index() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let base_file = temp_dir.path().join("submitter.log");
    let base_file = base_file.to_str().unwrap();
    let date_str = today();

    let first = time_based_rolling(base_file, &date_str, 1);
    fs::write(&first, "more than ten bytes of logs").expect("Failed to write log file");

    let rolled = space_based_rolling(&first, base_file, &date_str, 10);
    assert_ne!(rolled, first);
    assert!(rolled.ends_with(&format!("submitter-{}.2.log", date_str)));
}

#[test]
fn test_small_log_file_is_kept() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let base_file = temp_dir.path().join("submitter.log");
    let base_file = base_file.to_str().unwrap();
    let date_str = today();

    let first = time_based_rolling(base_file, &date_str, 1);
    fs::write(&first, "small").expect("Failed to write log file");

    assert_eq!(space_based_rolling(&first, base_file, &date_str, 10_000), first);
}
