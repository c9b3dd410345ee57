//! Human-facing form view over the same validator and engine.
//!
//! Client-side problems (unknown SKU, bad horizon) redisplay the form with a
//! notice and no table; server-side problems render the same page with a 500.

use axum::http::StatusCode;
use serde::Deserialize;
use std::fmt::Write;

use crate::engine::forecast_blocking;
use crate::error::ForecastError;
use crate::format::{format_records, ForecastRecord};
use crate::registry::RegistryState;
use crate::validate::{validate_form, ValidationPolicy};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FormInput {
    pub sku: Option<String>,
    pub days_to_forecast: Option<String>,
}

impl FormInput {
    pub fn is_blank(&self) -> bool { self.sku.is_none() && self.days_to_forecast.is_none() }
}

#[derive(Debug, Clone)]
pub struct FormView {
    pub sku: String,
    pub days_to_forecast: String,
    pub records: Option<Vec<ForecastRecord>>,
    pub notice: Option<String>,
    pub status: StatusCode,
}

impl FormView {
    /// Empty form prefilled with the defaults.
    pub fn blank(policy: &ValidationPolicy) -> Self {
        Self { sku: policy.default_sku.clone(), days_to_forecast: policy.default_horizon.to_string(), records: None, notice: None, status: StatusCode::OK }
    }
}

/// Status the page is served with for a given failure.
pub fn presentation_status(err: &ForecastError) -> StatusCode {
    if err.is_client_error() { StatusCode::OK } else { err.status_code() }
}

pub async fn run_form(state: &RegistryState, input: &FormInput, policy: &ValidationPolicy) -> Result<FormView, (FormView, ForecastError)> {
    let mut view = FormView::blank(policy);
    if let Some(s) = input.sku.as_deref().filter(|s| !s.is_empty()) { view.sku = s.to_string(); }
    if let Some(h) = input.days_to_forecast.as_deref().filter(|h| !h.trim().is_empty()) { view.days_to_forecast = h.to_string(); }

    let outcome = match validate_form(state, input.sku.as_deref(), input.days_to_forecast.as_deref(), policy) {
        Ok(req) => forecast_blocking(req.model, req.horizon).await.map_err(ForecastError::from),
        Err(e) => Err(e),
    };
    match outcome {
        Ok(result) => {
            view.records = Some(format_records(&result));
            Ok(view)
        }
        Err(e) => {
            view.notice = Some(e.to_string());
            view.status = presentation_status(&e);
            Err((view, e))
        }
    }
}

pub fn render_page(view: &FormView) -> String {
    let mut html = String::with_capacity(2048);
    html.push_str("<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>Sales Forecast</title></head><body>\n");
    html.push_str("<h1>Sales Forecast</h1>\n<form method=\"post\" action=\"/forecast\">\n");
    let _ = writeln!(html, "<label>SKU <input name=\"sku\" value=\"{}\"></label>", escape(&view.sku));
    let _ = writeln!(html, "<label>Days to forecast <input name=\"days_to_forecast\" value=\"{}\"></label>", escape(&view.days_to_forecast));
    html.push_str("<button type=\"submit\">Forecast</button>\n</form>\n");
    if let Some(notice) = &view.notice {
        let _ = writeln!(html, "<p class=\"notice\">{}</p>", escape(notice));
    }
    if let Some(records) = &view.records {
        let _ = writeln!(html, "<h2>Forecast for {}</h2>", escape(&view.sku));
        html.push_str("<table>\n<tr><th>Date</th><th>Forecast</th><th>Lower</th><th>Upper</th></tr>\n");
        for r in records {
            let _ = writeln!(html, "<tr><td>{}</td><td>{:.2}</td><td>{:.2}</td><td>{:.2}</td></tr>", r.ds, r.yhat, r.yhat_lower, r.yhat_upper);
        }
        html.push_str("</table>\n");
    }
    html.push_str("</body></html>\n");
    html
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
