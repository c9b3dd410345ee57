//! Forecast-serving metrics, registered once on the default Prometheus registry.

use once_cell::sync::Lazy;
use prometheus::{register_histogram, register_int_counter_vec, register_int_gauge, Histogram, IntCounterVec, IntGauge};

pub struct ForecastMetrics {
    /// Labels: `entry` (predict | form), `outcome` (ok | error category).
    pub requests_total: IntCounterVec,
    pub forecast_latency_ms: Histogram,
    pub models_loaded: IntGauge,
}

pub static FORECAST_METRICS: Lazy<ForecastMetrics> = Lazy::new(|| {
    ForecastMetrics {
        requests_total: register_int_counter_vec!("forecast_requests_total", "Prediction requests by entry point and outcome", &["entry", "outcome"])
            .expect("forecast_requests_total registers once"),
        forecast_latency_ms: register_histogram!("forecast_engine_latency_ms", "Forecast engine wall time per request (ms)", vec![0.5, 1.0, 2.5, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 1000.0])
            .expect("forecast_engine_latency_ms registers once"),
        models_loaded: register_int_gauge!("forecast_models_loaded", "Models held by the registry (0 when unavailable)")
            .expect("forecast_models_loaded registers once"),
    }
});
