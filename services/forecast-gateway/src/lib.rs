//! Forecast gateway: serves per-SKU forecasts from a registry of trained models.
//!
//! Flow per request: validate -> registry lookup -> engine -> records, shared by the
//! JSON endpoint and the HTML form.

use axum::{routing::get, routing::post, Router};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;

pub mod engine;
pub mod error;
pub mod form;
pub mod format;
pub mod handlers;
pub mod model;
pub mod registry;
pub mod validate;

pub use engine::{forecast, ForecastPoint, ForecastResult};
pub use error::{EngineError, ForecastError};
pub use format::{format_records, ForecastRecord};
pub use model::{AdditiveModel, Forecaster, Frequency};
pub use registry::{LoadError, ModelRegistry, RegistryState};
pub use validate::{validate, validate_form, ValidationPolicy};

/// Shared, read-only request context.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<RegistryState>,
    pub policy: Arc<ValidationPolicy>,
}

impl AppState {
    pub fn new(registry: RegistryState, policy: ValidationPolicy) -> Self {
        Self { registry: Arc::new(registry), policy: Arc::new(policy) }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/predict", post(handlers::predict))
        .route("/forecast", get(handlers::form_page).post(handlers::form_submit))
        .route("/health", get(handlers::liveness))
        .route("/health/live", get(handlers::liveness))
        .route("/health/ready", get(handlers::readiness))
        .route("/metrics", get(forecast_core::metrics_handler))
        .with_state(state)
}

pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> anyhow::Result<()>
where F: Future<Output = ()> + Send + 'static {
    axum::serve(listener, router(state)).with_graceful_shutdown(shutdown).await?;
    Ok(())
}

pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await { tracing::warn!(error = ?e, "ctrl-c handler failed"); }
    tracing::info!("shutdown signal received");
}
