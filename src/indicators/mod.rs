//! Technical indicators
//!
//! Pure transforms from a bar series to one or more index-aligned output
//! series. Every output series has exactly `bars.len()` points and
//! `output[i].time == bars[i].time`; `None` marks insufficient history.
//!
//! # Indicator Families
//!
//! - **Moving averages**: SMA, EMA
//! - **Momentum**: RSI, MACD, Stochastic
//! - **Volatility**: Bollinger Bands, ATR
//! - **Trend**: ADX (+DI/-DI), Ichimoku
//! - **Volume**: OBV
//! - **Levels**: pivot points, Fibonacci retracement
//!
//! [`IndicatorConfig`] wraps the typed parameter struct of each indicator in
//! one tagged enum, for callers that pick indicators at runtime.

pub mod levels;
pub mod momentum;
pub mod moving_average;
pub mod trend;
pub mod volatility;
pub mod volume;

pub use levels::*;
pub use momentum::*;
pub use moving_average::*;
pub use trend::*;
pub use volatility::*;
pub use volume::*;

use crate::{Point, Result, OHLCV};

/// Indicator selection with its strongly-typed parameters
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IndicatorConfig {
    Sma(SmaParams),
    Ema(EmaParams),
    Rsi(RsiParams),
    Macd(MacdParams),
    Bollinger(BollingerParams),
    Atr(AtrParams),
    Stochastic(StochasticParams),
    Obv,
    Adx(AdxParams),
    Ichimoku(IchimokuParams),
    PivotPoints(PivotPointsParams),
    Fibonacci(FibonacciParams),
}

/// Output of [`IndicatorConfig::compute`]
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum IndicatorOutput {
    Line(Vec<Point>),
    Macd(MacdResult),
    Bollinger(BollingerResult),
    Stochastic(StochasticResult),
    Adx(AdxResult),
    Ichimoku(IchimokuResult),
    PivotPoints(PivotPointsResult),
    Fibonacci(Option<FibonacciRetracement>),
}

impl IndicatorConfig {
    /// Cross-field checks that [`crate::Period`] alone cannot express
    pub fn validate(&self) -> Result<()> {
        match self {
            IndicatorConfig::Macd(p) => p.validate(),
            IndicatorConfig::Bollinger(p) => p.validate(),
            IndicatorConfig::Ichimoku(p) => p.validate(),
            IndicatorConfig::Fibonacci(p) => p.validate(),
            _ => Ok(()),
        }
    }

    /// Display label, e.g. `RSI(14)` or `MACD(12,26,9)`
    pub fn label(&self) -> String {
        match self {
            IndicatorConfig::Sma(p) => format!("SMA({})", p.period),
            IndicatorConfig::Ema(p) => format!("EMA({})", p.period),
            IndicatorConfig::Rsi(p) => format!("RSI({})", p.period),
            IndicatorConfig::Macd(p) => format!("MACD({},{},{})", p.fast, p.slow, p.signal),
            IndicatorConfig::Bollinger(p) => format!("BB({},{})", p.period, p.std_dev),
            IndicatorConfig::Atr(p) => format!("ATR({})", p.period),
            IndicatorConfig::Stochastic(p) => {
                format!("Stoch({},{},{})", p.k_period, p.k_slow, p.d_period)
            }
            IndicatorConfig::Obv => "OBV".to_string(),
            IndicatorConfig::Adx(p) => format!("ADX({})", p.period),
            IndicatorConfig::Ichimoku(p) => {
                format!("Ichimoku({},{},{})", p.tenkan, p.kijun, p.senkou_b)
            }
            IndicatorConfig::PivotPoints(p) => format!("Pivot({:?})", p.method),
            IndicatorConfig::Fibonacci(p) => format!("Fib({})", p.lookback),
        }
    }

    pub fn compute<T: OHLCV>(&self, bars: &[T]) -> IndicatorOutput {
        match self {
            IndicatorConfig::Sma(p) => IndicatorOutput::Line(sma(bars, p)),
            IndicatorConfig::Ema(p) => IndicatorOutput::Line(ema(bars, p)),
            IndicatorConfig::Rsi(p) => IndicatorOutput::Line(rsi(bars, p)),
            IndicatorConfig::Macd(p) => IndicatorOutput::Macd(macd(bars, p)),
            IndicatorConfig::Bollinger(p) => IndicatorOutput::Bollinger(bollinger_bands(bars, p)),
            IndicatorConfig::Atr(p) => IndicatorOutput::Line(atr(bars, p)),
            IndicatorConfig::Stochastic(p) => IndicatorOutput::Stochastic(stochastic(bars, p)),
            IndicatorConfig::Obv => IndicatorOutput::Line(obv(bars)),
            IndicatorConfig::Adx(p) => IndicatorOutput::Adx(adx(bars, p)),
            IndicatorConfig::Ichimoku(p) => IndicatorOutput::Ichimoku(ichimoku(bars, p)),
            IndicatorConfig::PivotPoints(p) => IndicatorOutput::PivotPoints(pivot_points(bars, p)),
            IndicatorConfig::Fibonacci(p) => {
                IndicatorOutput::Fibonacci(fibonacci_retracement(bars, p))
            }
        }
    }
}
