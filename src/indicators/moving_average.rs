//! Simple and exponential moving averages of the close.

use std::collections::HashMap;

use crate::{
    params::{get_period, ParamMeta, ParameterizedIndicator},
    series, Period, Point, Result, OHLCV,
};

/// SMA parameters
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SmaParams {
    pub period: Period,
}

impl Default for SmaParams {
    fn default() -> Self {
        Self {
            period: Period::new_const(20),
        }
    }
}

/// EMA parameters
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EmaParams {
    pub period: Period,
}

impl Default for EmaParams {
    fn default() -> Self {
        Self {
            period: Period::new_const(20),
        }
    }
}

/// Arithmetic mean of the trailing `period` closes.
///
/// Indices below `period - 1` are `None`.
pub fn sma<T: OHLCV>(bars: &[T], params: &SmaParams) -> Vec<Point> {
    let closes = series::closes(bars);
    series::with_times(bars, series::sma_of(&closes, params.period.get()))
}

/// Exponential moving average with multiplier `2 / (period + 1)`.
///
/// The value at `period - 1` is the SMA of the first window, so
/// `ema(P)[P - 1] == sma(P)[P - 1]` holds exactly.
pub fn ema<T: OHLCV>(bars: &[T], params: &EmaParams) -> Vec<Point> {
    let closes = series::closes(bars);
    series::with_times(bars, series::ema_of(&closes, params.period.get()))
}

static SMA_PARAMS: &[ParamMeta] = &[ParamMeta::period(
    "period",
    20.0,
    (5.0, 200.0, 5.0),
    "Number of closes averaged",
)];

static EMA_PARAMS: &[ParamMeta] = &[ParamMeta::period(
    "period",
    20.0,
    (5.0, 200.0, 5.0),
    "Smoothing length",
)];

impl ParameterizedIndicator for SmaParams {
    fn param_meta() -> &'static [ParamMeta] {
        SMA_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            period: get_period(params, "period", 20)?,
        })
    }

    fn indicator_id() -> &'static str {
        "SMA"
    }
}

impl ParameterizedIndicator for EmaParams {
    fn param_meta() -> &'static [ParamMeta] {
        EMA_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            period: get_period(params, "period", 20)?,
        })
    }

    fn indicator_id() -> &'static str {
        "EMA"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Bar;

    fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar::new(i as i64, c, c, c, c))
            .collect()
    }

    #[test]
    fn test_sma_reference_case() {
        let bars = bars_from_closes(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let out = sma(&bars, &SmaParams { period: Period::new_const(3) });
        let values: Vec<_> = out.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![None, None, Some(2.0), Some(3.0), Some(4.0)]);
    }

    #[test]
    fn test_sma_period_longer_than_history() {
        let bars = bars_from_closes(&[1.0, 2.0, 3.0]);
        let out = sma(&bars, &SmaParams { period: Period::new_const(3) });
        assert_eq!(out[2].value, Some(2.0));
        let out = sma(&bars, &SmaParams { period: Period::new_const(4) });
        assert!(out.iter().all(|p| p.value.is_none()));
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_ema_seed_equals_sma() {
        let bars = bars_from_closes(&[10.0, 11.5, 9.75, 12.25, 13.0, 12.0, 14.5]);
        let period = Period::new_const(4);
        let e = ema(&bars, &EmaParams { period });
        let s = sma(&bars, &SmaParams { period });
        assert_eq!(e[3].value, s[3].value);
        assert!(e[..3].iter().all(|p| p.value.is_none()));
    }

    #[test]
    fn test_ema_recurrence() {
        let bars = bars_from_closes(&[1.0, 2.0, 3.0, 10.0]);
        let e = ema(&bars, &EmaParams { period: Period::new_const(3) });
        // seed 2.0, k = 0.5
        assert_eq!(e[3].value, Some(6.0));
    }

    #[test]
    fn test_times_are_preserved() {
        let bars = vec![
            Bar::new("2024-01-02", 1.0, 1.0, 1.0, 1.0),
            Bar::new("2024-01-03", 2.0, 2.0, 2.0, 2.0),
        ];
        let out = sma(&bars, &SmaParams { period: Period::new_const(1) });
        assert_eq!(out[0].time, crate::BarTime::Date("2024-01-02".into()));
        assert_eq!(out[1].value, Some(2.0));
    }

    #[test]
    fn test_with_params() {
        let mut raw = HashMap::new();
        raw.insert("period", 50.0);
        assert_eq!(SmaParams::with_params(&raw).unwrap().period.get(), 50);
        assert_eq!(EmaParams::with_params(&HashMap::new()).unwrap().period.get(), 20);
        raw.insert("period", 0.0);
        assert!(EmaParams::with_params(&raw).is_err());
    }
}
