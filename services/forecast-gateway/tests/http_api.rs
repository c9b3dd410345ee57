//! End-to-end checks against a real listener on an ephemeral port.

use forecast_gateway::{serve, AppState, ForecastRecord, RegistryState, ValidationPolicy};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

struct TestServer {
    base: String,
    stop: Option<oneshot::Sender<()>>,
}

impl TestServer {
    fn url(&self, path: &str) -> String { format!("{}{}", self.base, path) }
}

impl Drop for TestServer {
    fn drop(&mut self) { if let Some(tx) = self.stop.take() { let _ = tx.send(()); } }
}

fn artifact() -> PathBuf { PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../models/models.json") }

async fn start(registry: RegistryState) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let (tx, rx) = oneshot::channel::<()>();
    let state = AppState::new(registry, ValidationPolicy::default());
    tokio::spawn(serve(listener, state, async move { let _ = rx.await; }));
    TestServer { base: format!("http://{addr}"), stop: Some(tx) }
}

async fn loaded() -> TestServer { start(RegistryState::load(&artifact(), None)).await }

async fn predict(srv: &TestServer, body: Value) -> (StatusCode, Value) {
    let resp = Client::new().post(srv.url("/predict")).json(&body).send().await.expect("predict request");
    let status = resp.status();
    (status, resp.json().await.expect("json body"))
}

#[tokio::test]
async fn predict_returns_rows_after_history() {
    let srv = loaded().await;
    let (status, body) = predict(&srv, json!({ "sku": "DAN-0003", "days_to_forecast": 3 })).await;
    assert_eq!(status, StatusCode::OK);
    let records: Vec<ForecastRecord> = serde_json::from_value(body).unwrap();
    let dates: Vec<&str> = records.iter().map(|r| r.ds.as_str()).collect();
    assert_eq!(dates, vec!["2024-01-11", "2024-01-12", "2024-01-13"]);
    assert!(records.iter().all(|r| r.yhat_lower <= r.yhat && r.yhat <= r.yhat_upper));
}

#[tokio::test]
async fn predict_is_repeatable_and_accepts_numeric_strings() {
    let srv = loaded().await;
    let (_, first) = predict(&srv, json!({ "sku": "DAN-0007", "days_to_forecast": "10" })).await;
    let (_, second) = predict(&srv, json!({ "sku": "DAN-0007", "days_to_forecast": 10 })).await;
    assert_eq!(first, second);
    assert_eq!(first.as_array().unwrap().len(), 10);
}

#[tokio::test]
async fn weekly_model_steps_by_week() {
    let srv = loaded().await;
    let (status, body) = predict(&srv, json!({ "sku": "KIT-0112", "days_to_forecast": 2 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["ds"], "2024-01-15");
    assert_eq!(body[1]["ds"], "2024-01-22");
}

#[tokio::test]
async fn error_categories_map_to_statuses() {
    let srv = loaded().await;
    let (status, body) = predict(&srv, json!({ "sku": "Z-9", "days_to_forecast": 3 })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Model for SKU 'Z-9' not found.");

    let (status, body) = predict(&srv, json!({ "sku": "DAN-0003", "days_to_forecast": "two" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("'days_to_forecast' must be a positive integer"));

    let (status, body) = predict(&srv, json!({ "sku": "DAN-0003" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing 'sku' or 'days_to_forecast' in request.");

    let resp = Client::new().post(srv.url("/predict")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Invalid input: No JSON data received.");

    let resp = Client::new().post(srv.url("/predict")).body("{oops").send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unavailable_registry_reports_zero_and_500s() {
    let srv = start(RegistryState::load(Path::new("/nonexistent/models.json"), None)).await;
    let text = Client::new().get(srv.url("/")).send().await.unwrap().text().await.unwrap();
    assert_eq!(text, "Sales Forecast API is running with 0 models loaded.");

    let (status, body) = predict(&srv, json!({ "sku": "DAN-0003", "days_to_forecast": 3 })).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Models are not loaded, check server logs.");

    let live: Value = Client::new().get(srv.url("/health/live")).send().await.unwrap().json().await.unwrap();
    assert_eq!(live["registry_loaded"], false);
    assert_eq!(live["model_count"], 0);
    let ready = Client::new().get(srv.url("/health/ready")).send().await.unwrap();
    assert_eq!(ready.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn liveness_counts_models() {
    let srv = loaded().await;
    let text = Client::new().get(srv.url("/")).send().await.unwrap().text().await.unwrap();
    assert_eq!(text, "Sales Forecast API is running with 3 models loaded.");
    let live: Value = Client::new().get(srv.url("/health")).send().await.unwrap().json().await.unwrap();
    assert_eq!(live["model_count"], 3);
}

#[tokio::test]
async fn form_view_renders_table_and_redisplays_on_unknown_sku() {
    let srv = loaded().await;
    let client = Client::new();

    let blank = client.get(srv.url("/forecast")).send().await.unwrap();
    assert_eq!(blank.status(), StatusCode::OK);
    let html = blank.text().await.unwrap();
    assert!(html.contains("value=\"DAN-0003\""));
    assert!(!html.contains("<table>"));

    let ok = client.post(srv.url("/forecast")).form(&[("sku", "DAN-0003"), ("days_to_forecast", "3")]).send().await.unwrap();
    assert_eq!(ok.status(), StatusCode::OK);
    let html = ok.text().await.unwrap();
    assert_eq!(html.matches("<tr><td>").count(), 3);
    assert!(html.contains("<td>2024-01-13</td>"));

    let defaulted = client.post(srv.url("/forecast")).form(&[("sku", "DAN-0003"), ("days_to_forecast", "")]).send().await.unwrap();
    assert_eq!(defaulted.text().await.unwrap().matches("<tr><td>").count(), 7);

    let unknown = client.get(srv.url("/forecast?sku=Z-9&days_to_forecast=3")).send().await.unwrap();
    assert_eq!(unknown.status(), StatusCode::OK);
    let html = unknown.text().await.unwrap();
    assert!(!html.contains("<table>"));
    assert!(html.contains("not found"));
}

#[tokio::test]
async fn metrics_exposes_request_counters() {
    let srv = loaded().await;
    let _ = predict(&srv, json!({ "sku": "DAN-0003", "days_to_forecast": 1 })).await;
    let body = Client::new().get(srv.url("/metrics")).send().await.unwrap().text().await.unwrap();
    assert!(body.contains("forecast_requests_total"), "missing request counter");
    assert!(body.contains("forecast_engine_latency_ms"), "missing engine latency histogram");
    assert!(body.contains("forecast_models_loaded"), "missing models gauge");
}
