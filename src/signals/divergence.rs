//! Price/indicator divergences
//!
//! A divergence is a pair of consecutive price pivots of the same kind whose
//! price and indicator move in opposite directions:
//!
//! - **Bearish**: a higher pivot high in price with a lower indicator value.
//! - **Bullish**: a lower pivot low in price with a higher indicator value.
//!
//! Confidence grows with the relative size of both moves:
//! `min(1, (|Δprice| / |price₁| + |Δind| / |ind₁|) * scale)`.

use crate::{
    indicators::{momentum, obv, rsi, stochastic, MacdParams, RsiParams, StochasticParams},
    series, BarTime, Direction, Point, Result, TaError, OHLCV,
};

// ============================================================
// TYPES
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PivotKind {
    High,
    Low,
}

/// Local extreme of the close with the indicator value at the same bar
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PivotPoint {
    pub index: usize,
    pub kind: PivotKind,
    pub price: f64,
    pub indicator_value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DivergenceKind {
    Bullish,
    Bearish,
}

impl DivergenceKind {
    pub fn direction(self) -> Direction {
        match self {
            DivergenceKind::Bullish => Direction::Bullish,
            DivergenceKind::Bearish => Direction::Bearish,
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DivergenceSignal {
    pub kind: DivergenceKind,
    pub indicator_name: String,
    pub start_date: BarTime,
    pub end_date: BarTime,
    pub start_index: usize,
    pub end_index: usize,
    pub price_start: f64,
    pub price_end: f64,
    pub indicator_value_start: f64,
    pub indicator_value_end: f64,
    /// In `(min_confidence, 1]`
    pub confidence: f64,
}

// ============================================================
// CONFIGURATION
// ============================================================

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DivergenceConfig {
    /// Bars on each side a pivot must exceed
    pub pivot_window: usize,
    /// Divergences at or below this confidence are dropped
    pub min_confidence: f64,
    /// Multiplier applied to the summed relative moves
    pub confidence_scale: f64,
    pub rsi: RsiParams,
    pub macd: MacdParams,
    pub stochastic: StochasticParams,
}

impl Default for DivergenceConfig {
    fn default() -> Self {
        Self {
            pivot_window: 3,
            min_confidence: 0.3,
            confidence_scale: 5.0,
            rsi: RsiParams::default(),
            macd: MacdParams::default(),
            stochastic: StochasticParams::default(),
        }
    }
}

impl DivergenceConfig {
    pub fn validate(&self) -> Result<()> {
        if self.pivot_window == 0 {
            return Err(TaError::InvalidConfig("pivot_window must be positive".into()));
        }
        if !(0.0..1.0).contains(&self.min_confidence) {
            return Err(TaError::OutOfRange {
                field: "min_confidence",
                value: self.min_confidence,
                min: 0.0,
                max: 1.0,
            });
        }
        if !self.confidence_scale.is_finite() || self.confidence_scale <= 0.0 {
            return Err(TaError::InvalidConfig(format!(
                "confidence_scale must be positive, got {}",
                self.confidence_scale
            )));
        }
        self.macd.validate()
    }
}

// ============================================================
// PIVOTS
// ============================================================

/// Pivot highs and lows of the close.
///
/// Index `i` is a pivot high when its close is strictly greater than every
/// close within `window` bars on both sides (a pivot low: strictly lower),
/// and the indicator has a value at `i`. Pivots are returned in index order.
pub fn find_pivots<T: OHLCV>(bars: &[T], indicator: &[Point], window: usize) -> Vec<PivotPoint> {
    let n = bars.len();
    if window == 0 || n < 2 * window + 1 {
        return Vec::new();
    }

    let closes = series::closes(bars);
    let mut pivots = Vec::new();

    for i in window..n - window {
        let Some(indicator_value) = indicator.get(i).and_then(|p| p.value) else {
            continue;
        };
        let price = closes[i];
        let mut neighbours = (i - window..=i + window).filter(|&j| j != i).map(|j| closes[j]);

        let kind = if neighbours.clone().all(|c| price > c) {
            PivotKind::High
        } else if neighbours.all(|c| price < c) {
            PivotKind::Low
        } else {
            continue;
        };

        pivots.push(PivotPoint {
            index: i,
            kind,
            price,
            indicator_value,
        });
    }
    pivots
}

/// `|to - from| / |from|`, or 0 when `from` is 0
#[inline]
fn relative_change(from: f64, to: f64) -> f64 {
    if from == 0.0 {
        0.0
    } else {
        (to - from).abs() / from.abs()
    }
}

/// Confidence of a divergence between two pivots, clamped to `[0, 1]`
pub fn divergence_confidence(first: &PivotPoint, second: &PivotPoint, scale: f64) -> f64 {
    let price_move = relative_change(first.price, second.price);
    let indicator_move = relative_change(first.indicator_value, second.indicator_value);
    ((price_move + indicator_move) * scale).min(1.0)
}

// ============================================================
// DETECTION
// ============================================================

/// Divergences between price and one indicator, most recent first.
///
/// `indicator` must be index-aligned with `bars`. Only consecutive pivots of
/// the same kind are compared.
pub fn detect_divergence<T: OHLCV>(
    bars: &[T],
    indicator: &[Point],
    indicator_name: &str,
    config: &DivergenceConfig,
) -> Vec<DivergenceSignal> {
    let pivots = find_pivots(bars, indicator, config.pivot_window);
    let highs: Vec<&PivotPoint> = pivots.iter().filter(|p| p.kind == PivotKind::High).collect();
    let lows: Vec<&PivotPoint> = pivots.iter().filter(|p| p.kind == PivotKind::Low).collect();

    let mut found = Vec::new();
    let mut consider = |kind: DivergenceKind, first: &PivotPoint, second: &PivotPoint| {
        let confidence = divergence_confidence(first, second, config.confidence_scale);
        if confidence <= config.min_confidence {
            tracing::trace!(
                indicator = indicator_name,
                start = first.index,
                end = second.index,
                confidence,
                "divergence below confidence threshold"
            );
            return;
        }
        found.push(DivergenceSignal {
            kind,
            indicator_name: indicator_name.to_string(),
            start_date: bars[first.index].time(),
            end_date: bars[second.index].time(),
            start_index: first.index,
            end_index: second.index,
            price_start: first.price,
            price_end: second.price,
            indicator_value_start: first.indicator_value,
            indicator_value_end: second.indicator_value,
            confidence,
        });
    };

    for pair in highs.windows(2) {
        let (first, second) = (pair[0], pair[1]);
        if second.price > first.price && second.indicator_value < first.indicator_value {
            consider(DivergenceKind::Bearish, first, second);
        }
    }
    for pair in lows.windows(2) {
        let (first, second) = (pair[0], pair[1]);
        if second.price < first.price && second.indicator_value > first.indicator_value {
            consider(DivergenceKind::Bullish, first, second);
        }
    }

    found.sort_by(|a, b| b.end_index.cmp(&a.end_index));
    found
}

/// Divergences against RSI, the MACD line, OBV and Stochastic %K, merged and
/// sorted most recent first (stable across indicators).
pub fn detect_all_divergences<T: OHLCV>(
    bars: &[T],
    config: &DivergenceConfig,
) -> Vec<DivergenceSignal> {
    let window = config.pivot_window;
    if window == 0 || bars.len() < 2 * window + 1 {
        tracing::debug!(bars = bars.len(), window, "too few bars for divergence detection");
        return Vec::new();
    }

    let (macd_line, _) = momentum::macd_lines(bars, &config.macd);
    let indicators = [
        ("RSI", rsi(bars, &config.rsi)),
        ("MACD", series::with_times(bars, macd_line)),
        ("OBV", obv(bars)),
        ("Stochastic", stochastic(bars, &config.stochastic).k),
    ];

    let mut all: Vec<DivergenceSignal> = indicators
        .iter()
        .flat_map(|(name, line)| detect_divergence(bars, line, name, config))
        .collect();
    all.sort_by(|a, b| b.end_index.cmp(&a.end_index));

    tracing::debug!(bars = bars.len(), divergences = all.len(), "divergence detection finished");
    all
}
