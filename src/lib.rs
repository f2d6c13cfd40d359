//! # chartsense - technical-analysis core
//!
//! Pure, deterministic technical analysis over OHLC(V) bar series:
//!
//! - [`indicators`]: SMA/EMA, RSI, MACD, Bollinger Bands, ATR, Stochastic, OBV, ADX,
//!   Ichimoku, pivot points and Fibonacci retracements. Every series is index-aligned
//!   with the input bars; `None` marks insufficient history.
//! - [`patterns`]: candlestick pattern recognition over the most recent bars.
//! - [`signals`]: threshold/crossover signals and price/indicator divergences.
//!
//! ## Quick Start
//!
//! ```rust
//! use chartsense::prelude::*;
//!
//! let bars: Vec<Bar> = (0..60)
//!     .map(|i| {
//!         let base = 100.0 + (i as f64 * 0.7).sin() * 5.0;
//!         Bar::new(i as i64, base, base + 1.0, base - 1.0, base + 0.3).with_volume(1_000.0)
//!     })
//!     .collect();
//!
//! let rsi_line = rsi(&bars, &RsiParams::default());
//! assert_eq!(rsi_line.len(), bars.len());
//!
//! let analyzer = Analyzer::new(AnalysisConfig::default()).unwrap();
//! let report = analyzer.analyze("ACME", &bars).unwrap();
//! assert_eq!(report.symbol, "ACME");
//! ```

pub mod indicators;
pub mod params;
pub mod patterns;
pub mod series;
pub mod signals;

pub mod prelude {
    pub use crate::{
        // Analysis
        analyze_parallel,
        // Indicators
        indicators::*,
        // Parameters
        params::{get_period, get_value, ParamMeta, ParamType, ParameterizedIndicator},
        // Patterns
        patterns::{
            detect_patterns, single_bar::*, three_bar::*, two_bar::*, BuiltinDetector,
            PatternDetector, PatternKind, PatternMatch, PatternRecognizer, RecognizerBuilder,
            RecognizerConfig, Reliability,
        },
        // Signals
        signals::{
            detect_all_divergences, detect_divergence, detect_signals, find_pivots,
            DivergenceConfig, DivergenceKind, DivergenceSignal, PivotKind, PivotPoint,
            SignalConfig, SignalKind, Strength, TechnicalSignal,
        },
        validate_bars,
        AnalysisConfig,
        AnalysisError,
        Analyzer,
        Bar,
        BarTime,
        Direction,
        HistogramColor,
        HistogramPoint,
        OHLCVExt,
        Period,
        Point,
        Result,
        TaError,
        TechnicalReport,
        OHLCV,
    };
}

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, TaError>;

/// Errors raised while building parameters and configurations.
///
/// The computations themselves never fail: insufficient history is expressed
/// as `None` points or empty result lists.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TaError {
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid bar at index {index}: {reason}")]
    InvalidBar { index: usize, reason: &'static str },
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Look-back length in bars (must be > 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period(usize);

impl Period {
    /// Create a new Period, validating value is > 0
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(TaError::InvalidValue("Period must be > 0"));
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: usize) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl serde::Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Period {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = usize::deserialize(d)?;
        Period::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// BARS
// ============================================================

/// Time of a bar: either a Unix timestamp or a calendar date string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum BarTime {
    Timestamp(i64),
    Date(String),
}

impl From<i64> for BarTime {
    fn from(ts: i64) -> Self {
        BarTime::Timestamp(ts)
    }
}

impl From<&str> for BarTime {
    fn from(date: &str) -> Self {
        BarTime::Date(date.to_string())
    }
}

impl From<String> for BarTime {
    fn from(date: String) -> Self {
        BarTime::Date(date)
    }
}

impl std::fmt::Display for BarTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BarTime::Timestamp(ts) => write!(f, "{ts}"),
            BarTime::Date(date) => f.write_str(date),
        }
    }
}

/// Core OHLCV data trait
pub trait OHLCV {
    fn time(&self) -> BarTime;
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;

    fn volume(&self) -> Option<f64> {
        None
    }
}

impl<T: OHLCV + ?Sized> OHLCV for &T {
    fn time(&self) -> BarTime {
        (**self).time()
    }

    fn open(&self) -> f64 {
        (**self).open()
    }

    fn high(&self) -> f64 {
        (**self).high()
    }

    fn low(&self) -> f64 {
        (**self).low()
    }

    fn close(&self) -> f64 {
        (**self).close()
    }

    fn volume(&self) -> Option<f64> {
        (**self).volume()
    }
}

/// Extension trait with computed properties for OHLCV data
pub trait OHLCVExt: OHLCV {
    #[inline]
    fn body(&self) -> f64 {
        (self.close() - self.open()).abs()
    }

    #[inline]
    fn range(&self) -> f64 {
        self.high() - self.low()
    }

    #[inline]
    fn upper_shadow(&self) -> f64 {
        self.high() - self.open().max(self.close())
    }

    #[inline]
    fn lower_shadow(&self) -> f64 {
        self.open().min(self.close()) - self.low()
    }

    #[inline]
    fn body_top(&self) -> f64 {
        self.open().max(self.close())
    }

    #[inline]
    fn body_bottom(&self) -> f64 {
        self.open().min(self.close())
    }

    #[inline]
    fn body_midpoint(&self) -> f64 {
        (self.open() + self.close()) / 2.0
    }

    #[inline]
    fn is_bullish(&self) -> bool {
        self.close() > self.open()
    }

    #[inline]
    fn is_bearish(&self) -> bool {
        self.close() < self.open()
    }

    /// Body as ratio of range. Returns None if range ≈ 0
    #[inline]
    fn body_ratio(&self) -> Option<f64> {
        let range = self.range();
        (range > f64::EPSILON).then(|| self.body() / range)
    }

    /// Validate OHLCV data consistency
    fn validate(&self) -> Result<()> {
        let prices = [self.open(), self.high(), self.low(), self.close()];
        if prices.iter().any(|p| p.is_nan()) {
            return Err(TaError::InvalidBar {
                index: 0,
                reason: "NaN in OHLC",
            });
        }
        if prices.iter().any(|p| p.is_infinite()) {
            return Err(TaError::InvalidBar {
                index: 0,
                reason: "Infinite value in OHLC",
            });
        }
        if self.high() < self.low() {
            return Err(TaError::InvalidBar {
                index: 0,
                reason: "high < low",
            });
        }
        if let Some(volume) = self.volume() {
            if !volume.is_finite() || volume < 0.0 {
                return Err(TaError::InvalidBar {
                    index: 0,
                    reason: "volume must be finite and >= 0",
                });
            }
        }
        Ok(())
    }
}

impl<T: OHLCV + ?Sized> OHLCVExt for T {}

/// Plain OHLC(V) bar
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Bar {
    pub time: BarTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
}

impl Bar {
    pub fn new(time: impl Into<BarTime>, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            time: time.into(),
            open,
            high,
            low,
            close,
            volume: None,
        }
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = Some(volume);
        self
    }
}

impl OHLCV for Bar {
    fn time(&self) -> BarTime {
        self.time.clone()
    }

    fn open(&self) -> f64 {
        self.open
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn close(&self) -> f64 {
        self.close
    }

    fn volume(&self) -> Option<f64> {
        self.volume
    }
}

/// Check every bar for NaN/infinite prices and `high < low`.
///
/// The indicator, pattern and signal paths never call this; callers that
/// want to sanitize their input run it up front.
pub fn validate_bars<T: OHLCV>(bars: &[T]) -> Result<()> {
    for (i, bar) in bars.iter().enumerate() {
        bar.validate().map_err(|e| match e {
            TaError::InvalidBar { reason, .. } => TaError::InvalidBar { index: i, reason },
            other => other,
        })?;
    }
    Ok(())
}

// ============================================================
// SERIES POINTS
// ============================================================

/// One datum of an indicator line. `value` is `None` while history is insufficient.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Point {
    pub time: BarTime,
    pub value: Option<f64>,
}

impl Point {
    pub fn new(time: BarTime, value: Option<f64>) -> Self {
        Self { time, value }
    }
}

/// Sign tag of a histogram bar, for rendering only
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistogramColor {
    Up,
    Down,
}

impl HistogramColor {
    /// `Up` for zero and positive values
    pub fn from_value(value: f64) -> Self {
        if value >= 0.0 {
            HistogramColor::Up
        } else {
            HistogramColor::Down
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HistogramPoint {
    pub time: BarTime,
    pub value: Option<f64>,
    pub color: Option<HistogramColor>,
}

impl HistogramPoint {
    pub fn new(time: BarTime, value: Option<f64>) -> Self {
        Self {
            time,
            value,
            color: value.map(HistogramColor::from_value),
        }
    }
}

/// Direction/bias of a pattern or signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Bullish,
    Neutral,
    Bearish,
}

impl Direction {
    #[inline]
    pub fn is_bullish(self) -> bool {
        matches!(self, Direction::Bullish)
    }

    #[inline]
    pub fn is_bearish(self) -> bool {
        matches!(self, Direction::Bearish)
    }
}

// ============================================================
// ANALYZER
// ============================================================

use patterns::{PatternMatch, PatternRecognizer, RecognizerConfig};
use signals::{DivergenceConfig, DivergenceSignal, SignalConfig, TechnicalSignal};

/// Configuration of a full technical analysis run
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub patterns: RecognizerConfig,
    pub signals: SignalConfig,
    pub divergences: DivergenceConfig,
    /// Run [`validate_bars`] before analysing an instrument
    pub validate_data: bool,
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<()> {
        self.patterns.validate()?;
        self.signals.validate()?;
        self.divergences.validate()
    }
}

/// Patterns, signals and divergences found for one instrument
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TechnicalReport {
    pub symbol: String,
    pub patterns: Vec<PatternMatch>,
    pub signals: Vec<TechnicalSignal>,
    pub divergences: Vec<DivergenceSignal>,
}

/// Runs the pattern recognizer, the signal detector and the divergence
/// detector with a fixed, validated configuration.
#[derive(Debug, Clone)]
pub struct Analyzer {
    recognizer: PatternRecognizer,
    config: AnalysisConfig,
}

impl Analyzer {
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        let recognizer = PatternRecognizer::builder()
            .config(config.patterns.clone())
            .with_all_defaults()
            .build()?;
        Ok(Self { recognizer, config })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn recognizer(&self) -> &PatternRecognizer {
        &self.recognizer
    }

    pub fn analyze<T: OHLCV>(&self, symbol: &str, bars: &[T]) -> Result<TechnicalReport> {
        if self.config.validate_data {
            validate_bars(bars)?;
        }

        Ok(TechnicalReport {
            symbol: symbol.to_string(),
            patterns: self.recognizer.detect(bars),
            signals: signals::detect_signals(bars, &self.config.signals),
            divergences: signals::detect_all_divergences(bars, &self.config.divergences),
        })
    }
}

// ============================================================
// PARALLEL ANALYSIS
// ============================================================

use rayon::prelude::*;

/// Error from analysing a single instrument
#[derive(Debug)]
pub struct AnalysisError {
    pub symbol: String,
    pub error: TaError,
}

/// Parallel analysis of multiple instruments
pub fn analyze_parallel<'a, T, I>(
    analyzer: &Analyzer,
    instruments: I,
) -> (Vec<TechnicalReport>, Vec<AnalysisError>)
where
    T: OHLCV + Sync + 'a,
    I: IntoParallelIterator<Item = (&'a str, &'a [T])>,
{
    let results: Vec<_> = instruments
        .into_par_iter()
        .map(|(symbol, bars)| {
            analyzer.analyze(symbol, bars).map_err(|error| AnalysisError {
                symbol: symbol.to_string(),
                error,
            })
        })
        .collect();

    let mut reports = Vec::new();
    let mut errors = Vec::new();

    for result in results {
        match result {
            Ok(r) => reports.push(r),
            Err(e) => errors.push(e),
        }
    }

    tracing::debug!(
        reports = reports.len(),
        errors = errors.len(),
        "parallel analysis finished"
    );

    (reports, errors)
}

// ============================================================
// TESTS
// ============================================================
