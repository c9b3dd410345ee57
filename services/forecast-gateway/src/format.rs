//! Flat, serializable records shared by the JSON and HTML renderings.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::engine::ForecastResult;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRecord {
    pub ds: String,
    pub yhat: f64,
    pub yhat_lower: f64,
    pub yhat_upper: f64,
}

pub fn format_records(result: &ForecastResult) -> Vec<ForecastRecord> {
    result.points.iter().map(|p| ForecastRecord {
        ds: p.date.format(DATE_FORMAT).to_string(),
        yhat: p.point_estimate,
        yhat_lower: p.lower_bound,
        yhat_upper: p.upper_bound,
    }).collect()
}

pub fn parse_ds(s: &str) -> Option<NaiveDate> { NaiveDate::parse_from_str(s, DATE_FORMAT).ok() }
