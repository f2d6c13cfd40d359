//! Support/resistance levels: floor-trader pivot points and Fibonacci
//! retracements.

use std::collections::HashMap;

use crate::{
    params::{get_period, ParamMeta, ParameterizedIndicator},
    series, Period, Point, Result, TaError, OHLCV,
};

// ============================================================
// PIVOT POINTS
// ============================================================

/// Floor-trader pivot formula family
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PivotMethod {
    #[default]
    Standard,
    Fibonacci,
    Woodie,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PivotPointsParams {
    pub method: PivotMethod,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PivotPointsResult {
    pub pivot: Vec<Point>,
    pub r1: Vec<Point>,
    pub r2: Vec<Point>,
    pub r3: Vec<Point>,
    pub s1: Vec<Point>,
    pub s2: Vec<Point>,
    pub s3: Vec<Point>,
}

/// Pivot, resistance and support levels of one bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PivotLevels {
    pub pivot: f64,
    pub r1: f64,
    pub r2: f64,
    pub r3: f64,
    pub s1: f64,
    pub s2: f64,
    pub s3: f64,
}

impl PivotMethod {
    /// Levels derived from a bar's high, low and close.
    pub fn levels(self, high: f64, low: f64, close: f64) -> PivotLevels {
        let range = high - low;
        match self {
            PivotMethod::Standard => classic_levels((high + low + close) / 3.0, high, low),
            PivotMethod::Woodie => classic_levels((high + low + 2.0 * close) / 4.0, high, low),
            PivotMethod::Fibonacci => {
                let pivot = (high + low + close) / 3.0;
                PivotLevels {
                    pivot,
                    r1: pivot + 0.382 * range,
                    r2: pivot + 0.618 * range,
                    r3: pivot + range,
                    s1: pivot - 0.382 * range,
                    s2: pivot - 0.618 * range,
                    s3: pivot - range,
                }
            }
        }
    }
}

fn classic_levels(pivot: f64, high: f64, low: f64) -> PivotLevels {
    let range = high - low;
    PivotLevels {
        pivot,
        r1: 2.0 * pivot - low,
        r2: pivot + range,
        r3: high + 2.0 * (pivot - low),
        s1: 2.0 * pivot - high,
        s2: pivot - range,
        s3: low - 2.0 * (high - pivot),
    }
}

/// Pivot levels for every bar, computed from the previous bar's H/L/C.
///
/// The first bar has no predecessor and is `None` in every series.
pub fn pivot_points<T: OHLCV>(bars: &[T], params: &PivotPointsParams) -> PivotPointsResult {
    let levels: Vec<Option<PivotLevels>> = (0..bars.len())
        .map(|i| {
            (i > 0).then(|| {
                let prev = &bars[i - 1];
                params.method.levels(prev.high(), prev.low(), prev.close())
            })
        })
        .collect();

    let line = |pick: fn(&PivotLevels) -> f64| {
        series::with_times(bars, levels.iter().map(|l| l.as_ref().map(pick)).collect())
    };

    PivotPointsResult {
        pivot: line(|l| l.pivot),
        r1: line(|l| l.r1),
        r2: line(|l| l.r2),
        r3: line(|l| l.r3),
        s1: line(|l| l.s1),
        s2: line(|l| l.s2),
        s3: line(|l| l.s3),
    }
}

// ============================================================
// FIBONACCI RETRACEMENT
// ============================================================

/// Retracement ratios, from the swing extreme to the opposite extreme.
pub const FIBONACCI_RATIOS: [f64; 7] = [0.0, 0.236, 0.382, 0.5, 0.618, 0.786, 1.0];

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct FibonacciParams {
    pub lookback: Period,
}

impl Default for FibonacciParams {
    fn default() -> Self {
        Self {
            lookback: Period::new_const(50),
        }
    }
}

impl FibonacciParams {
    pub fn validate(&self) -> Result<()> {
        if self.lookback.get() < 2 {
            return Err(TaError::InvalidConfig(
                "Fibonacci lookback needs at least 2 bars".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FibonacciLevel {
    pub ratio: f64,
    /// e.g. "61.8%"
    pub label: String,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FibonacciRetracement {
    pub swing_high: f64,
    pub swing_low: f64,
    pub swing_high_index: usize,
    pub swing_low_index: usize,
    /// The swing low came before the swing high
    pub uptrend: bool,
    pub levels: Vec<FibonacciLevel>,
}

/// Fibonacci retracement levels of the swing within the trailing `lookback`
/// bars. Levels retrace down from the high in an uptrend and up from the low
/// otherwise. Returns `None` for empty input.
pub fn fibonacci_retracement<T: OHLCV>(
    bars: &[T],
    params: &FibonacciParams,
) -> Option<FibonacciRetracement> {
    if bars.is_empty() {
        return None;
    }

    let start = bars.len().saturating_sub(params.lookback.get());
    let (mut high_index, mut low_index) = (start, start);
    for (i, bar) in bars.iter().enumerate().skip(start) {
        if bar.high() > bars[high_index].high() {
            high_index = i;
        }
        if bar.low() < bars[low_index].low() {
            low_index = i;
        }
    }

    let swing_high = bars[high_index].high();
    let swing_low = bars[low_index].low();
    let uptrend = low_index < high_index;
    let diff = swing_high - swing_low;

    let levels = FIBONACCI_RATIOS
        .iter()
        .map(|&ratio| FibonacciLevel {
            ratio,
            label: format!("{:.1}%", ratio * 100.0),
            price: if uptrend {
                swing_high - diff * ratio
            } else {
                swing_low + diff * ratio
            },
        })
        .collect();

    Some(FibonacciRetracement {
        swing_high,
        swing_low,
        swing_high_index: high_index,
        swing_low_index: low_index,
        uptrend,
        levels,
    })
}

// ============================================================
// PARAMETER METADATA
// ============================================================

static PIVOT_PARAMS: &[ParamMeta] = &[];

static FIBONACCI_PARAMS: &[ParamMeta] = &[ParamMeta::period(
    "lookback",
    50.0,
    (10.0, 200.0, 10.0),
    "Bars searched for the swing high and low",
)];

impl ParameterizedIndicator for PivotPointsParams {
    fn param_meta() -> &'static [ParamMeta] {
        PIVOT_PARAMS
    }

    fn with_params(_params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self::default())
    }

    fn indicator_id() -> &'static str {
        "PIVOT"
    }
}

impl ParameterizedIndicator for FibonacciParams {
    fn param_meta() -> &'static [ParamMeta] {
        FIBONACCI_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        let parsed = Self {
            lookback: get_period(params, "lookback", 50)?,
        };
        parsed.validate()?;
        Ok(parsed)
    }

    fn indicator_id() -> &'static str {
        "FIBONACCI"
    }
}
