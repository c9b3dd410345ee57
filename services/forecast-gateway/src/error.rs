//! Error taxonomy for forecast requests and its HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use thiserror::Error;

/// Failures inside the forecast computation itself (server side).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error("model has no training history")]
    EmptyHistory,
    #[error("model returned {got} rows for an index of {expected}")]
    ShapeMismatch { expected: usize, got: usize },
    #[error("date index overflows after {0}")]
    DateOverflow(NaiveDate),
    #[error("forecast worker failed: {0}")]
    Worker(String),
}

/// Everything a prediction request can fail with; each variant is one category.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ForecastError {
    #[error("Models are not loaded, check server logs.")]
    RegistryUnavailable,
    #[error("Invalid input: {0}")]
    MalformedInput(String),
    #[error("Missing 'sku' or 'days_to_forecast' in request.")]
    MissingField,
    #[error("Model for SKU '{0}' not found.")]
    UnknownModel(String),
    #[error("'days_to_forecast' must be a positive integer ({0}).")]
    InvalidHorizon(String),
    #[error("Forecast failed: {0}")]
    Engine(#[from] EngineError),
}

impl ForecastError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ForecastError::RegistryUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
            ForecastError::MalformedInput(_) => StatusCode::BAD_REQUEST,
            ForecastError::MissingField => StatusCode::BAD_REQUEST,
            ForecastError::UnknownModel(_) => StatusCode::NOT_FOUND,
            ForecastError::InvalidHorizon(_) => StatusCode::BAD_REQUEST,
            ForecastError::Engine(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable label used for metrics and logs.
    pub fn category(&self) -> &'static str {
        match self {
            ForecastError::RegistryUnavailable => "registry_unavailable",
            ForecastError::MalformedInput(_) => "malformed_input",
            ForecastError::MissingField => "missing_field",
            ForecastError::UnknownModel(_) => "unknown_model",
            ForecastError::InvalidHorizon(_) => "invalid_horizon",
            ForecastError::Engine(_) => "engine",
        }
    }

    pub fn is_client_error(&self) -> bool { self.status_code().is_client_error() }
}

impl IntoResponse for ForecastError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
