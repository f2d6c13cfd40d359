//! Volatility bands and ranges: Bollinger Bands and ATR.

use std::collections::HashMap;

use crate::{
    params::{get_period, get_value, ParamMeta, ParameterizedIndicator},
    series, Period, Point, Result, TaError, OHLCV,
};

// ============================================================
// BOLLINGER BANDS
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BollingerParams {
    pub period: Period,
    /// Band half-width in population standard deviations
    pub std_dev: f64,
}

impl Default for BollingerParams {
    fn default() -> Self {
        Self {
            period: Period::new_const(20),
            std_dev: 2.0,
        }
    }
}

impl BollingerParams {
    pub fn validate(&self) -> Result<()> {
        if !self.std_dev.is_finite() || self.std_dev <= 0.0 {
            return Err(TaError::InvalidConfig(format!(
                "Bollinger std_dev must be positive and finite, got {}",
                self.std_dev
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BollingerResult {
    pub upper: Vec<Point>,
    pub middle: Vec<Point>,
    pub lower: Vec<Point>,
}

/// Bollinger Bands around the SMA of the close.
///
/// The half-width uses the population standard deviation (divide by
/// `period`, not `period - 1`).
pub fn bollinger_bands<T: OHLCV>(bars: &[T], params: &BollingerParams) -> BollingerResult {
    let (upper, middle, lower) = bollinger_lines(bars, params);
    BollingerResult {
        upper: series::with_times(bars, upper),
        middle: series::with_times(bars, middle),
        lower: series::with_times(bars, lower),
    }
}

pub(crate) type BandLines = (Vec<Option<f64>>, Vec<Option<f64>>, Vec<Option<f64>>);

pub(crate) fn bollinger_lines<T: OHLCV>(bars: &[T], params: &BollingerParams) -> BandLines {
    let period = params.period.get();
    let closes = series::closes(bars);
    let middle = series::sma_of(&closes, period);

    let width: Vec<Option<f64>> = middle
        .iter()
        .enumerate()
        .map(|(i, mean)| {
            mean.map(|mean| {
                let window = &closes[i + 1 - period..=i];
                let variance =
                    window.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / period as f64;
                params.std_dev * variance.sqrt()
            })
        })
        .collect();

    let upper = series::zip_with(&middle, &width, |m, w| m + w);
    let lower = series::zip_with(&middle, &width, |m, w| m - w);
    (upper, middle, lower)
}

// ============================================================
// ATR
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AtrParams {
    pub period: Period,
}

impl Default for AtrParams {
    fn default() -> Self {
        Self {
            period: Period::new_const(14),
        }
    }
}

/// Average True Range with Wilder smoothing.
///
/// The first value (index `period`) is the mean of TR[1..=period]; the first
/// bar's TR, which has no previous close, is not part of the seed.
pub fn atr<T: OHLCV>(bars: &[T], params: &AtrParams) -> Vec<Point> {
    series::with_times(bars, atr_of(bars, params.period.get()))
}

pub(crate) fn atr_of<T: OHLCV>(bars: &[T], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; bars.len()];
    if period == 0 || bars.len() <= period {
        return out;
    }

    let tr = series::true_range(bars);
    let p = period as f64;
    let mut prev = tr[1..=period].iter().sum::<f64>() / p;
    out[period] = Some(prev);

    for i in (period + 1)..bars.len() {
        prev = (prev * (p - 1.0) + tr[i]) / p;
        out[i] = Some(prev);
    }
    out
}

// ============================================================
// PARAMETER METADATA
// ============================================================

static BOLLINGER_PARAMS: &[ParamMeta] = &[
    ParamMeta::period("period", 20.0, (10.0, 50.0, 1.0), "SMA length of the middle band"),
    ParamMeta::value("std_dev", 2.0, (1.0, 3.0, 0.5), "Band width in standard deviations"),
];

static ATR_PARAMS: &[ParamMeta] = &[ParamMeta::period(
    "period",
    14.0,
    (5.0, 30.0, 1.0),
    "Wilder smoothing length",
)];

impl ParameterizedIndicator for BollingerParams {
    fn param_meta() -> &'static [ParamMeta] {
        BOLLINGER_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        let parsed = Self {
            period: get_period(params, "period", 20)?,
            std_dev: get_value(params, "std_dev", 2.0)?,
        };
        parsed.validate()?;
        Ok(parsed)
    }

    fn indicator_id() -> &'static str {
        "BBANDS"
    }
}

impl ParameterizedIndicator for AtrParams {
    fn param_meta() -> &'static [ParamMeta] {
        ATR_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            period: get_period(params, "period", 14)?,
        })
    }

    fn indicator_id() -> &'static str {
        "ATR"
    }
}
