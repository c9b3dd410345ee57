//! Request validation for both entry points.
//!
//! Rules run in a fixed order and stop at the first failure: registry available,
//! payload parseable, both fields present, SKU known, horizon a positive integer.

use serde_json::Value;
use std::sync::Arc;

use crate::error::ForecastError;
use crate::model::Forecaster;
use crate::registry::RegistryState;

pub const SKU_FIELD: &str = "sku";
pub const HORIZON_FIELD: &str = "days_to_forecast";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationPolicy {
    pub max_horizon: u32,
    /// Form-only fallbacks.
    pub default_sku: String,
    pub default_horizon: u32,
}

impl Default for ValidationPolicy {
    fn default() -> Self { Self { max_horizon: 3650, default_sku: "DAN-0003".into(), default_horizon: 7 } }
}

impl From<&forecast_core::ServiceConfig> for ValidationPolicy {
    fn from(cfg: &forecast_core::ServiceConfig) -> Self {
        Self { max_horizon: cfg.max_horizon, default_sku: cfg.default_sku.clone(), default_horizon: cfg.default_horizon }
    }
}

#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    pub sku: String,
    pub horizon: u32,
    pub model: Arc<dyn Forecaster>,
}

/// Machine path: raw JSON body, no defaults.
pub fn validate(state: &RegistryState, raw: Option<&[u8]>, policy: &ValidationPolicy) -> Result<ValidatedRequest, ForecastError> {
    let registry = state.registry()?;
    let body = raw.filter(|b| !b.iter().all(u8::is_ascii_whitespace)).ok_or_else(no_data)?;
    let value: Value = serde_json::from_slice(body).map_err(|e| ForecastError::MalformedInput(format!("body is not valid JSON ({e}).")))?;
    let obj = match &value {
        Value::Object(map) if !map.is_empty() => map,
        Value::Object(_) | Value::Null => return Err(no_data()),
        _ => return Err(ForecastError::MalformedInput("expected a JSON object.".into())),
    };
    let sku = obj.get(SKU_FIELD).filter(|v| is_present(v)).ok_or(ForecastError::MissingField)?;
    let horizon = obj.get(HORIZON_FIELD).filter(|v| is_present(v)).ok_or(ForecastError::MissingField)?;
    // a non-string key can never match; report it as unknown rather than malformed
    let sku = match sku { Value::String(s) => s.clone(), other => other.to_string() };
    let model = registry.lookup(&sku)?;
    let horizon = parse_horizon(horizon, policy.max_horizon)?;
    Ok(ValidatedRequest { sku, horizon, model })
}

/// Human path: form fields, with defaults for absent or empty values.
pub fn validate_form(state: &RegistryState, sku: Option<&str>, horizon: Option<&str>, policy: &ValidationPolicy) -> Result<ValidatedRequest, ForecastError> {
    let registry = state.registry()?;
    let sku = sku.filter(|s| !s.is_empty()).unwrap_or(&policy.default_sku).to_string();
    let model = registry.lookup(&sku)?;
    let horizon = match horizon.map(str::trim).filter(|s| !s.is_empty()) {
        Some(h) => parse_horizon_str(h, policy.max_horizon)?,
        None => policy.default_horizon,
    };
    Ok(ValidatedRequest { sku, horizon, model })
}

/// Coerce a JSON value into a horizon in `1..=max`.
pub fn parse_horizon(v: &Value, max: u32) -> Result<u32, ForecastError> {
    let n = match v {
        Value::Number(num) => match (num.as_i64(), num.as_f64()) {
            (Some(i), _) => i,
            (None, Some(f)) if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15 => f as i64,
            _ => return Err(invalid(format!("got {num}"))),
        },
        Value::String(s) => return parse_horizon_str(s, max),
        Value::Null => return Err(invalid("got null".into())),
        Value::Bool(b) => return Err(invalid(format!("got {b}"))),
        Value::Array(_) | Value::Object(_) => return Err(invalid("got a structured value".into())),
    };
    check_range(n, max)
}

pub fn parse_horizon_str(s: &str, max: u32) -> Result<u32, ForecastError> {
    let n: i64 = s.trim().parse().map_err(|_| invalid(format!("got {s:?}")))?;
    check_range(n, max)
}

fn check_range(n: i64, max: u32) -> Result<u32, ForecastError> {
    if n <= 0 { return Err(invalid(format!("got {n}"))); }
    if n > max as i64 { return Err(invalid(format!("at most {max}, got {n}"))); }
    Ok(n as u32)
}

fn is_present(v: &Value) -> bool {
    match v { Value::Null => false, Value::String(s) => !s.is_empty(), _ => true }
}

fn no_data() -> ForecastError { ForecastError::MalformedInput("No JSON data received.".into()) }
fn invalid(detail: String) -> ForecastError { ForecastError::InvalidHorizon(detail) }
