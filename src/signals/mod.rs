//! Indicator signals and divergences
//!
//! [`detect_signals`] evaluates threshold and crossover rules for RSI, MACD,
//! Bollinger Bands, the Stochastic oscillator and ADX on the most recent bars.
//! [`divergence`] compares price pivots with indicator pivots.
//!
//! Both are pure functions of the bar series and their configuration;
//! insufficient history yields an empty result, never an error.

use crate::{
    indicators::{
        momentum, trend, volatility, AdxParams, BollingerParams, MacdParams, RsiParams,
        StochasticParams,
    },
    series, BarTime, Direction, Result, TaError, OHLCV,
};

pub mod divergence;
mod rules;

pub use divergence::{
    detect_all_divergences, detect_divergence, divergence_confidence, find_pivots,
    DivergenceConfig, DivergenceKind, DivergenceSignal, PivotKind, PivotPoint,
};

// ============================================================
// SIGNAL TYPES
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    RsiOversold,
    RsiOverbought,
    MacdBullishCross,
    MacdBearishCross,
    BollingerSqueeze,
    BollingerBreakoutUpper,
    BollingerBreakoutLower,
    StochasticOversold,
    StochasticOverbought,
    StochasticBullishCross,
    StochasticBearishCross,
    AdxTrendStart,
    AdxStrongTrend,
}

impl SignalKind {
    /// Indicator the rule is evaluated on
    pub fn indicator_name(self) -> &'static str {
        match self {
            SignalKind::RsiOversold | SignalKind::RsiOverbought => "RSI",
            SignalKind::MacdBullishCross | SignalKind::MacdBearishCross => "MACD",
            SignalKind::BollingerSqueeze
            | SignalKind::BollingerBreakoutUpper
            | SignalKind::BollingerBreakoutLower => "Bollinger",
            SignalKind::StochasticOversold
            | SignalKind::StochasticOverbought
            | SignalKind::StochasticBullishCross
            | SignalKind::StochasticBearishCross => "Stochastic",
            SignalKind::AdxTrendStart | SignalKind::AdxStrongTrend => "ADX",
        }
    }
}

/// Signal strength; orders `Weak < Moderate < Strong`
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Strength {
    Weak,
    Moderate,
    Strong,
}

/// A rule that fired on one bar
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TechnicalSignal {
    pub kind: SignalKind,
    pub direction: Direction,
    pub strength: Strength,
    pub date: BarTime,
    /// Close of the bar the signal fired on
    pub price: f64,
    pub indicator_name: String,
    pub value: Option<f64>,
    pub description: String,
    pub index: usize,
}

// ============================================================
// CONFIGURATION
// ============================================================

/// Rule thresholds and indicator parameters for [`detect_signals`]
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    /// Series shorter than this produce no signals
    pub min_bars: usize,
    /// Number of most recent bars examined
    pub lookback_bars: usize,

    pub rsi: RsiParams,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub rsi_extreme_oversold: f64,
    pub rsi_extreme_overbought: f64,

    pub macd: MacdParams,

    pub bollinger: BollingerParams,
    /// Bars over which the bandwidth must be at its minimum
    pub squeeze_lookback: usize,
    pub squeeze_threshold: f64,
    pub strong_squeeze_threshold: f64,

    pub stochastic: StochasticParams,
    pub stochastic_oversold: f64,
    pub stochastic_overbought: f64,

    pub adx: AdxParams,
    pub adx_trend_threshold: f64,
    pub adx_strong_threshold: f64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            min_bars: 30,
            lookback_bars: 5,
            rsi: RsiParams::default(),
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            rsi_extreme_oversold: 20.0,
            rsi_extreme_overbought: 80.0,
            macd: MacdParams::default(),
            bollinger: BollingerParams::default(),
            squeeze_lookback: 20,
            squeeze_threshold: 0.10,
            strong_squeeze_threshold: 0.05,
            stochastic: StochasticParams::default(),
            stochastic_oversold: 20.0,
            stochastic_overbought: 80.0,
            adx: AdxParams::default(),
            adx_trend_threshold: 25.0,
            adx_strong_threshold: 40.0,
        }
    }
}

fn check_oscillator_level(field: &'static str, value: f64) -> Result<()> {
    if !(0.0..=100.0).contains(&value) {
        return Err(TaError::OutOfRange {
            field,
            value,
            min: 0.0,
            max: 100.0,
        });
    }
    Ok(())
}

fn check_ordered(low_name: &str, low: f64, high_name: &str, high: f64) -> Result<()> {
    if low >= high {
        return Err(TaError::InvalidConfig(format!(
            "{low_name} ({low}) must be below {high_name} ({high})"
        )));
    }
    Ok(())
}

impl SignalConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_bars < 2 {
            return Err(TaError::InvalidConfig(format!(
                "min_bars must be at least 2, got {}",
                self.min_bars
            )));
        }
        if self.squeeze_lookback == 0 {
            return Err(TaError::InvalidConfig("squeeze_lookback must be positive".into()));
        }

        for (field, value) in [
            ("rsi_oversold", self.rsi_oversold),
            ("rsi_overbought", self.rsi_overbought),
            ("rsi_extreme_oversold", self.rsi_extreme_oversold),
            ("rsi_extreme_overbought", self.rsi_extreme_overbought),
            ("stochastic_oversold", self.stochastic_oversold),
            ("stochastic_overbought", self.stochastic_overbought),
            ("adx_trend_threshold", self.adx_trend_threshold),
            ("adx_strong_threshold", self.adx_strong_threshold),
        ] {
            check_oscillator_level(field, value)?;
        }
        if self.rsi_extreme_oversold > self.rsi_oversold
            || self.rsi_extreme_overbought < self.rsi_overbought
        {
            return Err(TaError::InvalidConfig(
                "RSI extreme levels must lie outside the oversold/overbought band".into(),
            ));
        }
        check_ordered("rsi_oversold", self.rsi_oversold, "rsi_overbought", self.rsi_overbought)?;
        check_ordered(
            "stochastic_oversold",
            self.stochastic_oversold,
            "stochastic_overbought",
            self.stochastic_overbought,
        )?;
        check_ordered(
            "adx_trend_threshold",
            self.adx_trend_threshold,
            "adx_strong_threshold",
            self.adx_strong_threshold,
        )?;

        if !self.squeeze_threshold.is_finite() || self.squeeze_threshold <= 0.0 {
            return Err(TaError::InvalidConfig(format!(
                "squeeze_threshold must be positive, got {}",
                self.squeeze_threshold
            )));
        }
        if !self.strong_squeeze_threshold.is_finite()
            || self.strong_squeeze_threshold <= 0.0
            || self.strong_squeeze_threshold > self.squeeze_threshold
        {
            return Err(TaError::InvalidConfig(format!(
                "strong_squeeze_threshold must be in (0, {}], got {}",
                self.squeeze_threshold, self.strong_squeeze_threshold
            )));
        }

        self.macd.validate()?;
        self.bollinger.validate()
    }
}

// ============================================================
// DETECTION
// ============================================================

/// Full indicator series the rules read from
pub(crate) struct SignalSeries {
    pub rsi: Vec<Option<f64>>,
    pub macd: Vec<Option<f64>>,
    pub macd_signal: Vec<Option<f64>>,
    pub upper: Vec<Option<f64>>,
    pub lower: Vec<Option<f64>>,
    pub bandwidth: Vec<Option<f64>>,
    pub stoch_k: Vec<Option<f64>>,
    pub stoch_d: Vec<Option<f64>>,
    pub adx: trend::AdxLines,
}

impl SignalSeries {
    fn compute<T: OHLCV>(bars: &[T], config: &SignalConfig) -> Self {
        let closes = series::closes(bars);
        let (macd, macd_signal) = momentum::macd_lines(bars, &config.macd);
        let (upper, middle, lower) = volatility::bollinger_lines(bars, &config.bollinger);
        let bandwidth = upper
            .iter()
            .zip(&lower)
            .zip(&middle)
            .map(|((u, l), m)| match (u, l, m) {
                (Some(u), Some(l), Some(m)) if *m != 0.0 => Some((u - l) / m),
                _ => None,
            })
            .collect();
        let (stoch_k, stoch_d) = momentum::stochastic_lines(bars, &config.stochastic);

        Self {
            rsi: momentum::rsi_of(&closes, config.rsi.period.get()),
            macd,
            macd_signal,
            upper,
            lower,
            bandwidth,
            stoch_k,
            stoch_d,
            adx: trend::adx_lines(bars, config.adx.period.get()),
        }
    }
}

/// Evaluate every rule on the most recent bars.
///
/// Series shorter than `config.min_bars` produce nothing; otherwise the last
/// `min(lookback_bars, len - min_bars)` bars are each compared with their
/// predecessor. Output is ordered by bar index, then by rule.
pub fn detect_signals<T: OHLCV>(bars: &[T], config: &SignalConfig) -> Vec<TechnicalSignal> {
    let n = bars.len();
    if n < config.min_bars {
        tracing::debug!(bars = n, min_bars = config.min_bars, "too few bars for signal detection");
        return Vec::new();
    }

    let lookback = config.lookback_bars.min(n - config.min_bars);
    let start = n - lookback;
    let series = SignalSeries::compute(bars, config);

    let mut signals = Vec::new();
    for index in start.max(1)..n {
        rules::evaluate(bars, index, &series, config, &mut signals);
    }

    tracing::debug!(bars = n, from = start, signals = signals.len(), "signal detection finished");
    signals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Bar;

    fn wave(n: usize) -> Vec<Bar> {
        (0..n)
            .map(|i| {
                let c = 50.0 + (i as f64 * 0.35).sin() * 10.0;
                Bar::new(i as i64, c - 0.5, c + 1.0, c - 1.0, c).with_volume(100.0)
            })
            .collect()
    }

    #[test]
    fn test_too_few_bars() {
        assert!(detect_signals(&wave(29), &SignalConfig::default()).is_empty());
    }

    #[test]
    fn test_exactly_min_bars_examines_nothing() {
        assert!(detect_signals(&wave(30), &SignalConfig::default()).is_empty());
    }

    #[test]
    fn test_signals_within_lookback_and_ordered() {
        let bars = wave(120);
        let signals = detect_signals(&bars, &SignalConfig::default());
        for s in &signals {
            assert!(s.index >= bars.len() - 5);
            assert_eq!(s.date, bars[s.index].time);
            assert_eq!(s.price, bars[s.index].close);
            assert_eq!(s.indicator_name, s.kind.indicator_name());
        }
        for pair in signals.windows(2) {
            assert!(pair[0].index <= pair[1].index);
        }
    }

    #[test]
    fn test_config_validation() {
        assert!(SignalConfig::default().validate().is_ok());

        let bad = SignalConfig {
            rsi_oversold: 75.0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());

        let bad = SignalConfig {
            adx_trend_threshold: 150.0,
            ..Default::default()
        };
        assert!(matches!(bad.validate(), Err(TaError::OutOfRange { .. })));

        let bad = SignalConfig {
            strong_squeeze_threshold: 0.2,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_config_partial_json() {
        let config: SignalConfig =
            serde_json::from_str(r#"{"rsi_oversold": 25.0, "rsi": {"period": 9}}"#).unwrap();
        assert_eq!(config.rsi_oversold, 25.0);
        assert_eq!(config.rsi.period.get(), 9);
        assert_eq!(config.rsi_overbought, 70.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_signal_serde() {
        let kind: SignalKind = serde_json::from_str("\"macd_bullish_cross\"").unwrap();
        assert_eq!(kind, SignalKind::MacdBullishCross);
        assert!(Strength::Strong > Strength::Moderate);
    }
}
