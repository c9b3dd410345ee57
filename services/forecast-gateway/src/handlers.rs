use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Form, Json,
};
use tracing::{error, field, info, instrument, warn, Span};
use uuid::Uuid;

use crate::engine::forecast_blocking;
use crate::error::ForecastError;
use crate::form::{render_page, run_form, FormInput, FormView};
use crate::format::{format_records, ForecastRecord};
use crate::validate::validate;
use crate::AppState;

const PREDICT: &str = "predict";
const FORM: &str = "form";

fn record_outcome(entry: &str, outcome: &str) {
    forecast_core::FORECAST_METRICS.requests_total.with_label_values(&[entry, outcome]).inc();
}

fn log_failure(entry: &str, err: &ForecastError) {
    if err.is_client_error() { warn!(entry, category = err.category(), error = %err, "request rejected"); }
    else { error!(entry, category = err.category(), error = %err, "request failed"); }
}

/// `POST /predict` with `{ "sku", "days_to_forecast" }`.
#[instrument(skip_all, fields(request_id = %Uuid::new_v4(), sku = field::Empty, horizon = field::Empty))]
pub async fn predict(State(state): State<AppState>, body: Bytes) -> Response {
    let raw = (!body.is_empty()).then_some(body.as_ref());
    match predict_records(&state, raw).await {
        Ok(records) => {
            record_outcome(PREDICT, "ok");
            info!(rows = records.len(), "forecast served");
            Json(records).into_response()
        }
        Err(e) => {
            record_outcome(PREDICT, e.category());
            log_failure(PREDICT, &e);
            e.into_response()
        }
    }
}

async fn predict_records(state: &AppState, raw: Option<&[u8]>) -> Result<Vec<ForecastRecord>, ForecastError> {
    let req = validate(&state.registry, raw, &state.policy)?;
    Span::current().record("sku", req.sku.as_str()).record("horizon", req.horizon);
    let result = forecast_blocking(req.model, req.horizon).await?;
    Ok(format_records(&result))
}

/// `GET /forecast`: blank form, or a forecast when query fields are given.
pub async fn form_page(State(state): State<AppState>, Query(input): Query<FormInput>) -> Response {
    if input.is_blank() { return Html(render_page(&FormView::blank(&state.policy))).into_response(); }
    form_response(&state, input).await
}

/// `POST /forecast` from the HTML form.
pub async fn form_submit(State(state): State<AppState>, Form(input): Form<FormInput>) -> Response {
    form_response(&state, input).await
}

#[instrument(skip_all, fields(request_id = %Uuid::new_v4(), sku = ?input.sku, horizon = ?input.days_to_forecast))]
async fn form_response(state: &AppState, input: FormInput) -> Response {
    let view = match run_form(&state.registry, &input, &state.policy).await {
        Ok(view) => {
            record_outcome(FORM, "ok");
            view
        }
        Err((view, e)) => {
            record_outcome(FORM, e.category());
            log_failure(FORM, &e);
            view
        }
    };
    (view.status, Html(render_page(&view))).into_response()
}

/// `GET /`
pub async fn index(State(state): State<AppState>) -> String {
    format!("Sales Forecast API is running with {} models loaded.", state.registry.model_count())
}

/// `GET /health/live`
pub async fn liveness(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": if forecast_core::is_live() { "alive" } else { "failing" },
        "version": env!("CARGO_PKG_VERSION"),
        "registry_loaded": state.registry.is_loaded(),
        "model_count": state.registry.model_count(),
    }))
}

/// `GET /health/ready`: serving and the registry is usable.
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let ready = forecast_core::is_ready() && state.registry.is_loaded();
    let status = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status, Json(serde_json::json!({ "ready": ready, "model_count": state.registry.model_count() })))
}
