//! ## Sets up logging by reading configuration from environment variables.
//!
//! Environment variables used:
//! - LOG_MODE: "stdout" (default) or "file"
//! - LOG_LEVEL: log level ("trace", "debug", "info", "warn", "error"); default is "info"
//! - LOG_DATA_DIR: when using file mode, the directory of the log files (default "./logs")
//! - LOG_MAX_SIZE: size in bytes after which a new file is started (default 1GB)
//!
//! File mode writes `submitter-<date>.<n>.log`, starting a new file every day and whenever the
//! current one outgrows `LOG_MAX_SIZE`.

use chrono::Utc;
use log::info;
use simplelog::{Config, ConfigBuilder, LevelFilter, SimpleLogger, WriteLogger};
use std::{
    env,
    fs::{create_dir_all, metadata, OpenOptions},
    path::Path,
};

const LOG_FILE_NAME: &str = "submitter.log";
const DEFAULT_LOG_MAX_SIZE: u64 = 1_073_741_824;

/// Computes the path of the rolled log file given the base file path and the date string.
pub fn compute_rolled_file_path(base_file_path: &str, date_str: &str, index: u32) -> String {
    let stem = base_file_path
        .strip_suffix(".log")
        .unwrap_or(base_file_path);
    format!("{}-{}.{}.log", stem, date_str, index)
}

/// Daily file for `date_str`, before any size-based rolling.
pub fn time_based_rolling(base_file_path: &str, date_str: &str, index: u32) -> String {
    compute_rolled_file_path(base_file_path, date_str, index)
}

/// Returns the first file of the day that is not above `max_size` bytes, starting from
/// `file_path` and then trying increasing indices.
pub fn space_based_rolling(
    file_path: &str,
    base_file_path: &str,
    date_str: &str,
    max_size: u64,
) -> String {
    let mut final_path = file_path.to_string();
    let mut index = 1;
    while metadata(&final_path).is_ok_and(|m| m.len() > max_size) {
        final_path = compute_rolled_file_path(base_file_path, date_str, index);
        index += 1;
    }
    final_path
}

pub fn parse_level_filter(level: &str) -> LevelFilter {
    match level.to_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        "off" => LevelFilter::Off,
        _ => LevelFilter::Info,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogConfig {
    pub to_file: bool,
    pub level: LevelFilter,
    pub data_dir: String,
    pub max_size: u64,
}

impl LogConfig {
    pub fn from_env() -> Self {
        // containers always log into ./logs so the volume mount stays predictable
        let in_docker = env::var("IN_DOCKER").map(|v| v == "true").unwrap_or(false);
        let data_dir = if in_docker {
            "logs".to_string()
        } else {
            env::var("LOG_DATA_DIR").unwrap_or_else(|_| "./logs".to_string())
        };
        Self {
            to_file: env::var("LOG_MODE")
                .map(|mode| mode.eq_ignore_ascii_case("file"))
                .unwrap_or(false),
            level: parse_level_filter(&env::var("LOG_LEVEL").unwrap_or_default()),
            data_dir: data_dir.trim_end_matches('/').to_string(),
            max_size: env::var("LOG_MAX_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_LOG_MAX_SIZE),
        }
    }

    /// Path of the file to write today's logs to.
    pub fn log_file_path(&self, date_str: &str) -> String {
        let base_file_path = format!("{}/{}", self.data_dir, LOG_FILE_NAME);
        let daily = time_based_rolling(&base_file_path, date_str, 1);
        space_based_rolling(&daily, &base_file_path, date_str, self.max_size)
    }
}

fn logger_config() -> Config {
    // transport crates are too chatty at debug level
    ConfigBuilder::new()
        .add_filter_ignore_str("h2")
        .add_filter_ignore_str("hyper")
        .add_filter_ignore_str("rustls")
        .build()
}

/// Sets up logging by reading configuration from environment variables.
pub fn setup_logging() {
    let config = LogConfig::from_env();

    if config.to_file {
        let date_str = Utc::now().format("%Y-%m-%d").to_string();
        let final_path = config.log_file_path(&date_str);

        if let Some(parent) = Path::new(&final_path).parent() {
            create_dir_all(parent).expect("Failed to create log directory");
        }

        let log_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&final_path)
            .unwrap_or_else(|e| panic!("Unable to open log file {}: {}", final_path, e));
        WriteLogger::init(config.level, logger_config(), log_file)
            .expect("Failed to initialize file logger");
        info!("Logging to file {}", final_path);
    } else {
        SimpleLogger::init(config.level, logger_config())
            .expect("Failed to initialize simple logger");
    }

    info!(
        "Logging is successfully configured (mode: {}, level: {})",
        if config.to_file { "file" } else { "stdout" },
        config.level
    );
}
