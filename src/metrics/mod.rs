//! Metrics module for the application.
//!
//! - This module contains the global Prometheus registry.
//! - Defines HTTP metrics (recorded by [`middleware::record_request_metrics`]) and relay metrics
//!   (recorded by the core components).

pub mod middleware;
use lazy_static::lazy_static;
use prometheus::{
    CounterVec, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge,
    IntGaugeVec, Opts, Registry, TextEncoder,
};

lazy_static! {
    // Global Prometheus registry.
    pub static ref REGISTRY: Registry = Registry::new();

    pub static ref REQUEST_COUNTER: CounterVec = {
        let opts = Opts::new("requests_total", "Total number of HTTP requests");
        let counter_vec = CounterVec::new(opts, &["endpoint", "method", "status"]).unwrap();
        REGISTRY.register(Box::new(counter_vec.clone())).unwrap();
        counter_vec
    };

    pub static ref REQUEST_LATENCY: HistogramVec = {
        let histogram_opts = HistogramOpts::new("request_latency_seconds", "Request latency in seconds")
            .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]);
        let histogram_vec = HistogramVec::new(histogram_opts, &["endpoint", "method", "status"]).unwrap();
        REGISTRY.register(Box::new(histogram_vec.clone())).unwrap();
        histogram_vec
    };

    pub static ref ERROR_COUNTER: CounterVec = {
        let opts = Opts::new("error_requests_total", "Total number of error responses");
        let counter_vec = CounterVec::new(opts, &["endpoint", "method", "status"]).unwrap();
        REGISTRY.register(Box::new(counter_vec.clone())).unwrap();
        counter_vec
    };

    // Number of the latest block accepted by the block monitor.
    pub static ref CURRENT_BLOCK: IntGauge = {
        let gauge = IntGauge::new("current_block_number", "Latest accepted block number").unwrap();
        REGISTRY.register(Box::new(gauge.clone())).unwrap();
        gauge
    };

    pub static ref REORGS: IntCounter = {
        let counter = IntCounter::new("block_reorgs_total", "Reorgs observed by the block monitor").unwrap();
        REGISTRY.register(Box::new(counter.clone())).unwrap();
        counter
    };

    // Boops waiting in the nonce gate for earlier nonces.
    pub static ref BLOCKED_BOOPS: IntGauge = {
        let gauge = IntGauge::new("blocked_boops", "Boops waiting for earlier nonces").unwrap();
        REGISTRY.register(Box::new(gauge.clone())).unwrap();
        gauge
    };

    pub static ref EXECUTOR_JOBS: IntGaugeVec = {
        let opts = Opts::new("executor_jobs", "In-flight boops bound to each executor");
        let gauge_vec = IntGaugeVec::new(opts, &["executor"]).unwrap();
        REGISTRY.register(Box::new(gauge_vec.clone())).unwrap();
        gauge_vec
    };

    // Submission outcomes, labelled by the status or error variant.
    pub static ref SUBMISSIONS: IntCounterVec = {
        let opts = Opts::new("boop_submissions_total", "Boop submissions by outcome");
        let counter_vec = IntCounterVec::new(opts, &["outcome"]).unwrap();
        REGISTRY.register(Box::new(counter_vec.clone())).unwrap();
        counter_vec
    };

    // Stuck transaction handling, labelled by the action taken.
    pub static ref STUCK_TRANSACTIONS: IntCounterVec = {
        let opts = Opts::new("stuck_transactions_total", "Stuck transactions replaced or cancelled");
        let counter_vec = IntCounterVec::new(opts, &["action"]).unwrap();
        REGISTRY.register(Box::new(counter_vec.clone())).unwrap();
        counter_vec
    };
}

/// Gather all metrics and encode into the provided format.
pub fn gather_metrics() -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(buffer)
}
