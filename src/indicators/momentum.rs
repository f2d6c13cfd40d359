//! Momentum oscillators: RSI, MACD and the Stochastic oscillator.

use std::collections::HashMap;

use crate::{
    params::{get_period, ParamMeta, ParameterizedIndicator},
    series::{self, highest, lowest},
    HistogramPoint, Period, Point, Result, TaError, OHLCV,
};

/// RS used when the average loss is zero. RSI then saturates at
/// `100 - 100 / 101 ≈ 99.0099` instead of reaching 100.
pub const ZERO_LOSS_RS: f64 = 100.0;

/// %K reported when the high/low range of the window is flat.
pub const FLAT_RANGE_K: f64 = 50.0;

// ============================================================
// RSI
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RsiParams {
    pub period: Period,
}

impl Default for RsiParams {
    fn default() -> Self {
        Self {
            period: Period::new_const(14),
        }
    }
}

/// Relative Strength Index with Wilder smoothing.
///
/// The first value is emitted at index `period`, seeded with the plain means
/// of the first `period` gains and losses.
pub fn rsi<T: OHLCV>(bars: &[T], params: &RsiParams) -> Vec<Point> {
    let closes = series::closes(bars);
    series::with_times(bars, rsi_of(&closes, params.period.get()))
}

pub(crate) fn rsi_of(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; closes.len()];
    if period == 0 || closes.len() <= period {
        return out;
    }

    let p = period as f64;
    let (mut avg_gain, mut avg_loss) = (0.0, 0.0);
    for i in 1..=period {
        let change = closes[i] - closes[i - 1];
        if change > 0.0 {
            avg_gain += change;
        } else {
            avg_loss -= change;
        }
    }
    avg_gain /= p;
    avg_loss /= p;
    out[period] = Some(rsi_from_averages(avg_gain, avg_loss));

    for i in (period + 1)..closes.len() {
        let change = closes[i] - closes[i - 1];
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);
        avg_gain = (avg_gain * (p - 1.0) + gain) / p;
        avg_loss = (avg_loss * (p - 1.0) + loss) / p;
        out[i] = Some(rsi_from_averages(avg_gain, avg_loss));
    }

    out
}

#[inline]
fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    let rs = if avg_loss == 0.0 {
        ZERO_LOSS_RS
    } else {
        avg_gain / avg_loss
    };
    100.0 - 100.0 / (1.0 + rs)
}

// ============================================================
// MACD
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct MacdParams {
    pub fast: Period,
    pub slow: Period,
    pub signal: Period,
}

impl Default for MacdParams {
    fn default() -> Self {
        Self {
            fast: Period::new_const(12),
            slow: Period::new_const(26),
            signal: Period::new_const(9),
        }
    }
}

impl MacdParams {
    pub fn validate(&self) -> Result<()> {
        if self.fast >= self.slow {
            return Err(TaError::InvalidConfig(format!(
                "MACD fast period ({}) must be shorter than slow period ({})",
                self.fast, self.slow
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MacdResult {
    pub macd: Vec<Point>,
    pub signal: Vec<Point>,
    pub histogram: Vec<HistogramPoint>,
}

/// MACD line, signal line and histogram.
///
/// The signal line is an EMA over the non-null suffix of the MACD line, seeded
/// by the SMA of its first `signal` values.
pub fn macd<T: OHLCV>(bars: &[T], params: &MacdParams) -> MacdResult {
    let (line, signal) = macd_lines(bars, params);
    let histogram = series::zip_with(&line, &signal, |m, s| m - s);

    MacdResult {
        macd: series::with_times(bars, line),
        signal: series::with_times(bars, signal),
        histogram: series::histogram_with_times(bars, histogram),
    }
}

pub(crate) fn macd_lines<T: OHLCV>(
    bars: &[T],
    params: &MacdParams,
) -> (Vec<Option<f64>>, Vec<Option<f64>>) {
    let closes = series::closes(bars);
    let fast = series::ema_of(&closes, params.fast.get());
    let slow = series::ema_of(&closes, params.slow.get());
    let line = series::zip_with(&fast, &slow, |f, s| f - s);
    let signal = series::ema_of_options(&line, params.signal.get());
    (line, signal)
}

// ============================================================
// STOCHASTIC
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct StochasticParams {
    pub k_period: Period,
    /// Smoothing applied to raw %K
    pub k_slow: Period,
    pub d_period: Period,
}

impl Default for StochasticParams {
    fn default() -> Self {
        Self {
            k_period: Period::new_const(14),
            k_slow: Period::new_const(3),
            d_period: Period::new_const(3),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StochasticResult {
    pub k: Vec<Point>,
    pub d: Vec<Point>,
}

/// Slow stochastic oscillator: %K is the SMA(`k_slow`) of raw %K, %D the
/// SMA(`d_period`) of %K.
pub fn stochastic<T: OHLCV>(bars: &[T], params: &StochasticParams) -> StochasticResult {
    let (k, d) = stochastic_lines(bars, params);
    StochasticResult {
        k: series::with_times(bars, k),
        d: series::with_times(bars, d),
    }
}

pub(crate) fn stochastic_lines<T: OHLCV>(
    bars: &[T],
    params: &StochasticParams,
) -> (Vec<Option<f64>>, Vec<Option<f64>>) {
    let period = params.k_period.get();
    let highs: Vec<f64> = bars.iter().map(|b| b.high()).collect();
    let lows: Vec<f64> = bars.iter().map(|b| b.low()).collect();

    let raw: Vec<Option<f64>> = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            (i + 1 >= period).then(|| {
                let hh = highest(&highs, i, period);
                let ll = lowest(&lows, i, period);
                let range = hh - ll;
                if range == 0.0 {
                    FLAT_RANGE_K
                } else {
                    100.0 * (bar.close() - ll) / range
                }
            })
        })
        .collect();

    let k = series::sma_of_options(&raw, params.k_slow.get());
    let d = series::sma_of_options(&k, params.d_period.get());
    (k, d)
}

// ============================================================
// PARAMETER METADATA
// ============================================================

static RSI_PARAMS: &[ParamMeta] = &[ParamMeta::period(
    "period",
    14.0,
    (5.0, 30.0, 1.0),
    "Wilder smoothing length",
)];

static MACD_PARAMS: &[ParamMeta] = &[
    ParamMeta::period("fast", 12.0, (5.0, 20.0, 1.0), "Fast EMA length"),
    ParamMeta::period("slow", 26.0, (20.0, 50.0, 1.0), "Slow EMA length"),
    ParamMeta::period("signal", 9.0, (3.0, 15.0, 1.0), "Signal EMA length"),
];

static STOCHASTIC_PARAMS: &[ParamMeta] = &[
    ParamMeta::period("k_period", 14.0, (5.0, 30.0, 1.0), "Raw %K look-back"),
    ParamMeta::period("k_slow", 3.0, (1.0, 5.0, 1.0), "Smoothing of raw %K"),
    ParamMeta::period("d_period", 3.0, (1.0, 5.0, 1.0), "%D length"),
];

impl ParameterizedIndicator for RsiParams {
    fn param_meta() -> &'static [ParamMeta] {
        RSI_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            period: get_period(params, "period", 14)?,
        })
    }

    fn indicator_id() -> &'static str {
        "RSI"
    }
}

impl ParameterizedIndicator for MacdParams {
    fn param_meta() -> &'static [ParamMeta] {
        MACD_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        let parsed = Self {
            fast: get_period(params, "fast", 12)?,
            slow: get_period(params, "slow", 26)?,
            signal: get_period(params, "signal", 9)?,
        };
        parsed.validate()?;
        Ok(parsed)
    }

    fn indicator_id() -> &'static str {
        "MACD"
    }
}

impl ParameterizedIndicator for StochasticParams {
    fn param_meta() -> &'static [ParamMeta] {
        STOCHASTIC_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            k_period: get_period(params, "k_period", 14)?,
            k_slow: get_period(params, "k_slow", 3)?,
            d_period: get_period(params, "d_period", 3)?,
        })
    }

    fn indicator_id() -> &'static str {
        "STOCH"
    }
}
