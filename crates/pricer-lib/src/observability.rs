//! Observability for the pricing service
//!
//! Provides:
//! - Prometheus metrics (prediction latency, rows priced, errors, model version)
//! - Structured JSON logging with tracing

use prometheus::{
    register_gauge_vec, register_histogram_vec, register_int_counter_vec, GaugeVec, HistogramVec,
    IntCounterVec,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Latency buckets in seconds; batch requests reach into whole seconds
const LATENCY_BUCKETS: &[f64] = &[
    0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

pub const MODE_SINGLE: &str = "single";
pub const MODE_BATCH: &str = "batch";

static GLOBAL_METRICS: OnceLock<PricerMetricsInner> = OnceLock::new();

struct PricerMetricsInner {
    prediction_latency_seconds: HistogramVec,
    rows_predicted: IntCounterVec,
    errors: IntCounterVec,
    model_version_info: GaugeVec,
}

impl PricerMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram_vec!(
                "car_pricer_prediction_latency_seconds",
                "Time spent pricing a request, by mode",
                &["mode"],
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            rows_predicted: register_int_counter_vec!(
                "car_pricer_rows_predicted_total",
                "Number of records priced, by mode",
                &["mode"]
            )
            .expect("Failed to register rows_predicted_total"),

            errors: register_int_counter_vec!(
                "car_pricer_errors_total",
                "Number of rejected or failed requests, by error kind",
                &["kind"]
            )
            .expect("Failed to register errors_total"),

            model_version_info: register_gauge_vec!(
                "car_pricer_model_version_info",
                "Information about the loaded price model",
                &["version"]
            )
            .expect("Failed to register model_version_info"),
        }
    }
}

/// Handle to the process-wide metrics; clones share the same collectors
#[derive(Clone)]
pub struct PricerMetrics {
    _private: (),
}

impl Default for PricerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PricerMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(PricerMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &PricerMetricsInner {
        GLOBAL_METRICS.get_or_init(PricerMetricsInner::new)
    }

    pub fn observe_prediction(&self, mode: &str, rows: usize, duration_secs: f64) {
        let inner = self.inner();
        inner
            .prediction_latency_seconds
            .with_label_values(&[mode])
            .observe(duration_secs);
        inner
            .rows_predicted
            .with_label_values(&[mode])
            .inc_by(rows as u64);
    }

    pub fn inc_error(&self, kind: &str) {
        self.inner().errors.with_label_values(&[kind]).inc();
    }

    pub fn set_model_version(&self, version: &str) {
        self.inner().model_version_info.reset();
        self.inner()
            .model_version_info
            .with_label_values(&[version])
            .set(1.0);
    }

    pub fn rows_predicted(&self, mode: &str) -> u64 {
        self.inner().rows_predicted.with_label_values(&[mode]).get()
    }

    pub fn error_count(&self, kind: &str) -> u64 {
        self.inner().errors.with_label_values(&[kind]).get()
    }
}

/// Consistent JSON events for the pricing service
#[derive(Clone)]
pub struct StructuredLogger {
    service: String,
}

impl StructuredLogger {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn log_startup(&self, version: &str, model_version: &str, port: u16) {
        info!(
            event = "service_started",
            service = %self.service,
            service_version = %version,
            model_version = %model_version,
            port = port,
            "Price estimator started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            service = %self.service,
            reason = %reason,
            "Price estimator shutting down"
        );
    }

    pub fn log_model_loaded(&self, path: &str, model_version: &str, features: usize) {
        info!(
            event = "model_loaded",
            service = %self.service,
            path = %path,
            model_version = %model_version,
            features = features,
            "Price model loaded"
        );
    }

    pub fn log_single_prediction(&self, make: &str, model: &str, year: i64, price: f64, model_version: &str) {
        info!(
            event = "single_prediction",
            service = %self.service,
            make = %make,
            model = %model,
            year = year,
            price = price,
            model_version = %model_version,
            "Priced single listing"
        );
    }

    pub fn log_batch_prediction(&self, rows: usize, columns: usize, duration_ms: u128, model_version: &str) {
        info!(
            event = "batch_prediction",
            service = %self.service,
            rows = rows,
            columns = columns,
            duration_ms = duration_ms as u64,
            model_version = %model_version,
            "Priced uploaded batch"
        );
    }

    pub fn log_rejected(&self, route: &str, kind: &str, message: &str) {
        warn!(
            event = "request_rejected",
            service = %self.service,
            route = %route,
            kind = %kind,
            message = %message,
            "Request rejected"
        );
    }
}
