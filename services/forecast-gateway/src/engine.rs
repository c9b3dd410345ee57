//! Forecast computation: extend the index, predict, keep only rows after history.

use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument};

use crate::error::EngineError;
use crate::model::{Forecaster, Frequency, Prediction};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub point_estimate: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

impl From<Prediction> for ForecastPoint {
    fn from(p: Prediction) -> Self {
        Self { date: p.date, point_estimate: p.yhat, lower_bound: p.yhat_lower, upper_bound: p.yhat_upper }
    }
}

/// Future-only points, ascending by date, at most `horizon` of them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ForecastResult {
    pub points: Vec<ForecastPoint>,
}

impl ForecastResult {
    pub fn len(&self) -> usize { self.points.len() }
    pub fn is_empty(&self) -> bool { self.points.is_empty() }
}

/// `horizon` consecutive periods after `last`.
pub fn future_index(last: NaiveDate, freq: Frequency, horizon: u32) -> Result<Vec<NaiveDate>, EngineError> {
    (1..=horizon).map(|n| freq.step(last, n).ok_or(EngineError::DateOverflow(last))).collect()
}

#[instrument(skip(model), fields(frequency = ?model.frequency()))]
pub fn forecast(model: &dyn Forecaster, horizon: u32) -> Result<ForecastResult, EngineError> {
    let start = Instant::now();
    let last = model.last_history_date().ok_or(EngineError::EmptyHistory)?;

    let mut index = model.history().to_vec();
    index.sort_unstable();
    index.dedup();
    index.extend(future_index(last, model.frequency(), horizon)?);

    let rows = model.predict(&index)?;
    if rows.len() != index.len() { return Err(EngineError::ShapeMismatch { expected: index.len(), got: rows.len() }); }

    // the history boundary, not a tail() of the output, decides what is "future"
    let mut points: Vec<ForecastPoint> = rows.into_iter().filter(|r| r.date > last).map(ForecastPoint::from).collect();
    points.sort_by_key(|p| p.date);
    points.dedup_by_key(|p| p.date);
    points.truncate(horizon as usize);

    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    forecast_core::FORECAST_METRICS.forecast_latency_ms.observe(elapsed_ms);
    debug!(%last, index_len = index.len(), returned = points.len(), elapsed_ms, "forecast computed");
    Ok(ForecastResult { points })
}

/// Run [`forecast`] on the blocking pool; prediction is CPU-bound.
pub async fn forecast_blocking(model: Arc<dyn Forecaster>, horizon: u32) -> Result<ForecastResult, EngineError> {
    tokio::task::spawn_blocking(move || forecast(model.as_ref(), horizon))
        .await
        .map_err(|e| EngineError::Worker(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AdditiveModel, Trend};

    fn d(s: &str) -> NaiveDate { NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap() }

    fn model_a() -> AdditiveModel {
        AdditiveModel {
            frequency: Frequency::Daily,
            history: (1..=10).map(|day| NaiveDate::from_ymd_opt(2024, 1, day).unwrap()).collect(),
            trend: Trend { growth: 1.5, offset: 100.0, changepoints: vec![] },
            seasonalities: vec![],
            sigma: 2.0,
            interval_width: 0.8,
        }
    }

    /// Returns fixed rows regardless of the index, mimicking a model whose
    /// internal calendar drifts from the requested one.
    #[derive(Debug)]
    struct FixedRows { history: Vec<NaiveDate>, rows: Vec<NaiveDate>, pad_to_index: bool }

    impl Forecaster for FixedRows {
        fn history(&self) -> &[NaiveDate] { &self.history }
        fn frequency(&self) -> Frequency { Frequency::Daily }
        fn predict(&self, index: &[NaiveDate]) -> Result<Vec<Prediction>, EngineError> {
            let mut out: Vec<Prediction> = self.rows.iter().map(|&date| Prediction { date, yhat: 1.0, yhat_lower: 0.0, yhat_upper: 2.0 }).collect();
            if self.pad_to_index { while out.len() < index.len() { out.push(Prediction { date: self.history[0], yhat: 0.0, yhat_lower: 0.0, yhat_upper: 0.0 }); } }
            Ok(out)
        }
    }

    #[test]
    fn scenario_three_days_after_history() {
        let out = forecast(&model_a(), 3).unwrap();
        let dates: Vec<String> = out.points.iter().map(|p| p.date.to_string()).collect();
        assert_eq!(dates, vec!["2024-01-11", "2024-01-12", "2024-01-13"]);
        assert!(out.points.iter().all(|p| p.lower_bound <= p.point_estimate && p.point_estimate <= p.upper_bound));
    }

    #[test]
    fn exact_count_strictly_after_history_ascending() {
        let model = model_a();
        let last = model.last_history_date().unwrap();
        for horizon in 1..=60u32 {
            let out = forecast(&model, horizon).unwrap();
            assert_eq!(out.len(), horizon as usize);
            assert!(out.points.iter().all(|p| p.date > last));
            assert!(out.points.windows(2).all(|w| w[0].date < w[1].date));
        }
    }

    #[test]
    fn horizon_longer_than_history_has_no_stale_rows() {
        let out = forecast(&model_a(), 25).unwrap();
        assert_eq!(out.points.first().unwrap().date, d("2024-01-11"));
        assert_eq!(out.len(), 25);
    }

    #[test]
    fn idempotent_for_same_inputs() {
        let model = model_a();
        assert_eq!(forecast(&model, 14).unwrap(), forecast(&model, 14).unwrap());
    }

    #[test]
    fn weekly_and_monthly_index() {
        let mut m = model_a();
        m.frequency = Frequency::Weekly;
        let out = forecast(&m, 2).unwrap();
        assert_eq!(out.points[1].date, d("2024-01-24"));
        m.frequency = Frequency::Monthly;
        let out = forecast(&m, 2).unwrap();
        assert_eq!(out.points[0].date, d("2024-02-10"));
        assert_eq!(out.points[1].date, d("2024-03-10"));
    }

    #[test]
    fn filters_by_history_date_not_tail() {
        // rows mix in-sample dates with a gap in the future calendar
        let model = FixedRows {
            history: vec![d("2024-01-09"), d("2024-01-10")],
            rows: vec![d("2024-01-09"), d("2024-01-10"), d("2024-01-12"), d("2024-01-14"), d("2024-01-10")],
            pad_to_index: false,
        };
        let out = forecast(&model, 3).unwrap();
        let dates: Vec<NaiveDate> = out.points.iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![d("2024-01-12"), d("2024-01-14")]);
    }

    #[test]
    fn shape_mismatch_is_engine_error() {
        let model = FixedRows { history: vec![d("2024-01-10")], rows: vec![d("2024-01-11")], pad_to_index: false };
        assert_eq!(forecast(&model, 3).unwrap_err(), EngineError::ShapeMismatch { expected: 4, got: 1 });
    }

    #[test]
    fn output_capped_at_horizon() {
        let model = FixedRows {
            history: vec![d("2024-01-10")],
            rows: vec![d("2024-01-11"), d("2024-01-12"), d("2024-01-13"), d("2024-01-14")],
            pad_to_index: true,
        };
        assert_eq!(forecast(&model, 3).unwrap().len(), 3);
    }

    #[test]
    fn empty_history_rejected() {
        let model = FixedRows { history: vec![], rows: vec![], pad_to_index: false };
        assert_eq!(forecast(&model, 1).unwrap_err(), EngineError::EmptyHistory);
    }

    #[test]
    fn overflow_reported() {
        assert_eq!(future_index(NaiveDate::MAX, Frequency::Daily, 1).unwrap_err(), EngineError::DateOverflow(NaiveDate::MAX));
    }

    #[tokio::test]
    async fn blocking_wrapper_matches_sync() {
        let model: Arc<dyn Forecaster> = Arc::new(model_a());
        let sync = forecast(model.as_ref(), 5).unwrap();
        let pooled = forecast_blocking(model, 5).await.unwrap();
        assert_eq!(sync, pooled);
    }
}
