//! Trained forecasting models as served by the registry.
//!
//! [`Forecaster`] is the opaque seam the engine works against. [`AdditiveModel`] is the
//! concrete fitted model the training pipeline serializes: a piecewise-linear trend
//! with changepoints plus Fourier seasonal terms and a Gaussian observation interval.

use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

use crate::error::EngineError;

/// Native periodicity of a model's time index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    #[serde(alias = "D")]
    Daily,
    #[serde(alias = "W")]
    Weekly,
    #[serde(alias = "MS", alias = "M")]
    Monthly,
}

impl Frequency {
    /// `n` periods after `from`; `None` on calendar overflow.
    pub fn step(self, from: NaiveDate, n: u32) -> Option<NaiveDate> {
        match self {
            Frequency::Daily => from.checked_add_days(Days::new(n as u64)),
            Frequency::Weekly => from.checked_add_days(Days::new(7 * n as u64)),
            Frequency::Monthly => from.checked_add_months(Months::new(n)),
        }
    }
}

/// One row of model output over an index position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub date: NaiveDate,
    pub yhat: f64,
    pub yhat_lower: f64,
    pub yhat_upper: f64,
}

pub trait Forecaster: Send + Sync + fmt::Debug {
    /// Timestamps of the series the model was fit on.
    fn history(&self) -> &[NaiveDate];
    fn frequency(&self) -> Frequency;
    /// Point and interval estimates for every position of `index`, same order.
    fn predict(&self, index: &[NaiveDate]) -> Result<Vec<Prediction>, EngineError>;

    fn last_history_date(&self) -> Option<NaiveDate> { self.history().iter().max().copied() }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Changepoint {
    pub at: NaiveDate,
    /// Slope change applied from `at` onward.
    pub delta: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trend {
    /// Base slope per day.
    pub growth: f64,
    /// Level at the first history date.
    pub offset: f64,
    #[serde(default)]
    pub changepoints: Vec<Changepoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Seasonality {
    pub name: String,
    pub period_days: f64,
    /// Interleaved `[a1, b1, a2, b2, ...]` cosine/sine weights.
    pub coefficients: Vec<f64>,
}

fn default_interval_width() -> f64 { 0.8 }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdditiveModel {
    pub frequency: Frequency,
    pub history: Vec<NaiveDate>,
    pub trend: Trend,
    #[serde(default)]
    pub seasonalities: Vec<Seasonality>,
    /// Residual standard deviation of the fit.
    pub sigma: f64,
    #[serde(default = "default_interval_width")]
    pub interval_width: f64,
}

impl AdditiveModel {
    /// Structural checks run when the registry loads the artifact.
    pub fn validate(&self) -> Result<(), String> {
        if self.history.is_empty() { return Err("empty training history".into()); }
        if !self.sigma.is_finite() || self.sigma < 0.0 { return Err(format!("sigma must be finite and >= 0, got {}", self.sigma)); }
        if !(self.interval_width > 0.0 && self.interval_width < 1.0) { return Err(format!("interval_width must be in (0, 1), got {}", self.interval_width)); }
        if !self.trend.growth.is_finite() || !self.trend.offset.is_finite() { return Err("trend parameters must be finite".into()); }
        if self.trend.changepoints.iter().any(|c| !c.delta.is_finite()) { return Err("changepoint deltas must be finite".into()); }
        for s in &self.seasonalities {
            if !(s.period_days.is_finite() && s.period_days > 0.0) { return Err(format!("seasonality '{}' needs a positive period", s.name)); }
            if s.coefficients.len() % 2 != 0 { return Err(format!("seasonality '{}' has an odd coefficient count", s.name)); }
            if s.coefficients.iter().any(|c| !c.is_finite()) { return Err(format!("seasonality '{}' has non-finite coefficients", s.name)); }
        }
        Ok(())
    }

    /// Sort and dedup history so `history()` is chronological.
    pub fn normalize(&mut self) {
        self.history.sort_unstable();
        self.history.dedup();
        self.trend.changepoints.sort_by_key(|c| c.at);
    }

    fn origin(&self) -> Option<NaiveDate> { self.history.iter().min().copied() }

    fn trend_at(&self, t: f64, origin: NaiveDate) -> f64 {
        let mut y = self.trend.growth * t + self.trend.offset;
        for cp in &self.trend.changepoints {
            let tc = days_between(origin, cp.at);
            if t >= tc { y += cp.delta * (t - tc); }
        }
        y
    }

    fn seasonal_at(&self, t: f64) -> f64 {
        self.seasonalities.iter().map(|s| {
            s.coefficients.chunks_exact(2).enumerate().map(|(i, ab)| {
                let x = 2.0 * PI * (i as f64 + 1.0) * t / s.period_days;
                ab[0] * x.cos() + ab[1] * x.sin()
            }).sum::<f64>()
        }).sum()
    }
}

impl Forecaster for AdditiveModel {
    fn history(&self) -> &[NaiveDate] { &self.history }
    fn frequency(&self) -> Frequency { self.frequency }

    fn predict(&self, index: &[NaiveDate]) -> Result<Vec<Prediction>, EngineError> {
        let origin = self.origin().ok_or(EngineError::EmptyHistory)?;
        let margin = normal_quantile(self.interval_width) * self.sigma;
        Ok(index.iter().map(|&date| {
            let t = days_between(origin, date);
            let yhat = self.trend_at(t, origin) + self.seasonal_at(t);
            Prediction { date, yhat, yhat_lower: yhat - margin, yhat_upper: yhat + margin }
        }).collect())
    }
}

fn days_between(from: NaiveDate, to: NaiveDate) -> f64 { (to - from).num_days() as f64 }

/// Two-sided z for a central interval of `width` (Abramowitz & Stegun 26.2.23, |err| < 4.5e-4).
pub fn normal_quantile(width: f64) -> f64 {
    let p = ((1.0 - width) / 2.0).clamp(1e-12, 0.5);
    let t = (-2.0 * p.ln()).sqrt();
    let (c0, c1, c2) = (2.515517, 0.802853, 0.010328);
    let (d1, d2, d3) = (1.432788, 0.189269, 0.001308);
    t - (c0 + c1 * t + c2 * t * t) / (1.0 + d1 * t + d2 * t * t + d3 * t * t * t)
}
