//! Shape thresholds and market context shared by the pattern detectors.
//!
//! Every shape test is relative to the trailing average body, so the same
//! thresholds work for a penny stock and an index future. When the average
//! body is zero (a run of dojis) the tests fall back to ratios of the
//! candle's own range.

use crate::{OHLCVExt, OHLCV};

// ============================================================
// THRESHOLDS
// ============================================================

/// Doji: body <= avg_body * DOJI_FACTOR
pub const DOJI_FACTOR: f64 = 0.1;
/// Small body (stars, spinning tops): body <= avg_body * SMALL_BODY_FACTOR
pub const SMALL_BODY_FACTOR: f64 = 0.5;
/// Long body: body >= avg_body * LONG_BODY_FACTOR
pub const LONG_BODY_FACTOR: f64 = 1.0;
/// Each soldier/crow body: body >= avg_body * SOLDIER_BODY_FACTOR
pub const SOLDIER_BODY_FACTOR: f64 = 0.7;
/// Hammer family: dominant shadow >= body * SHADOW_BODY_FACTOR
pub const SHADOW_BODY_FACTOR: f64 = 2.0;
/// Hammer family reliability upgrade: dominant shadow >= body * STRONG_SHADOW_FACTOR
pub const STRONG_SHADOW_FACTOR: f64 = 3.0;
/// Marubozu: body / range >= MARUBOZU_BODY_RATIO
pub const MARUBOZU_BODY_RATIO: f64 = 0.95;
/// Tweezer: |price_a - price_b| <= avg_body * EQUAL_PRICE_FACTOR
pub const EQUAL_PRICE_FACTOR: f64 = 0.1;

// Range-ratio fallbacks when avg_body is not meaningful
pub const DOJI_RATIO: f64 = 0.1;
pub const SMALL_BODY_RATIO: f64 = 0.3;
pub const LONG_BODY_RATIO: f64 = 0.7;
/// Opposite shadow of a hammer-family candle: <= range * SHORT_SHADOW_RATIO (or half the body)
pub const SHORT_SHADOW_RATIO: f64 = 0.1;

// ============================================================
// MARKET CONTEXT
// ============================================================

/// Net move over the bars preceding a candle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Up,
    Down,
    #[default]
    Sideways,
}

impl Trend {
    #[inline]
    pub fn is_up(self) -> bool {
        matches!(self, Trend::Up)
    }

    #[inline]
    pub fn is_down(self) -> bool {
        matches!(self, Trend::Down)
    }
}

/// Per-bar context the detectors normalise against
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MarketContext {
    /// Mean body of the preceding bars (or the bar's own body early on)
    pub avg_body: f64,
    /// Trend of the bars preceding this one
    pub trend: Trend,
}

/// Mean `|close - open|` of the `period` bars before `at`.
///
/// With fewer than `period` preceding bars the current bar's own body is used.
pub fn trailing_avg_body<T: OHLCV>(bars: &[T], at: usize, period: usize) -> f64 {
    if period == 0 || at < period {
        return bars[at].body();
    }
    let window = &bars[at - period..at];
    window.iter().map(|b| b.body()).sum::<f64>() / period as f64
}

/// Trend gate over the `lookback` bars preceding `at`: compares the close of
/// bar `at - lookback` with the close of bar `at - 1`.
pub fn trend_before<T: OHLCV>(bars: &[T], at: usize, lookback: usize, threshold: f64) -> Trend {
    if lookback < 2 || at < lookback {
        return Trend::Sideways;
    }
    let first = bars[at - lookback].close();
    let last = bars[at - 1].close();
    if first.abs() <= f64::EPSILON {
        return Trend::Sideways;
    }

    let change = (last - first) / first;
    if change >= threshold {
        Trend::Up
    } else if change <= -threshold {
        Trend::Down
    } else {
        Trend::Sideways
    }
}

// ============================================================
// SHAPE TESTS
// ============================================================

/// Doji body. A zero-range bar has no shape and is never a doji.
#[inline]
pub fn is_doji(body: f64, avg_body: f64, range: f64, factor: f64) -> bool {
    if range <= 0.0 {
        return false;
    }
    if avg_body > 0.0 {
        body <= avg_body * factor
    } else {
        body / range <= DOJI_RATIO
    }
}

#[inline]
pub fn is_small_body(body: f64, avg_body: f64, range: f64, factor: f64) -> bool {
    if avg_body > 0.0 {
        body <= avg_body * factor
    } else {
        range > 0.0 && body / range <= SMALL_BODY_RATIO
    }
}

#[inline]
pub fn is_long_body(body: f64, avg_body: f64, range: f64, factor: f64) -> bool {
    if avg_body > 0.0 {
        body >= avg_body * factor
    } else {
        range > 0.0 && body / range >= LONG_BODY_RATIO
    }
}

/// Opposite shadow of a hammer-family candle is negligible.
#[inline]
pub fn is_short_shadow(shadow: f64, body: f64, range: f64) -> bool {
    shadow <= (body * 0.5).max(range * SHORT_SHADOW_RATIO)
}

/// Two prices are equal within `avg_body * factor`.
#[inline]
pub fn is_near(a: f64, b: f64, avg_body: f64, factor: f64) -> bool {
    (a - b).abs() <= avg_body * factor
}

/// Hammer-family shape: a dominant shadow at least `factor` times the body,
/// a negligible opposite shadow and a body no longer than average.
#[inline]
pub fn is_hammer_shape<T: OHLCV>(
    bar: &T,
    dominant_shadow: f64,
    opposite_shadow: f64,
    avg_body: f64,
    factor: f64,
) -> bool {
    let body = bar.body();
    let range = bar.range();
    range > 0.0
        && dominant_shadow > 0.0
        && dominant_shadow >= body * factor
        && is_short_shadow(opposite_shadow, body, range)
        && is_small_body(body, avg_body, range, LONG_BODY_FACTOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Bar;

    fn bar(o: f64, h: f64, l: f64, c: f64) -> Bar {
        Bar::new(0i64, o, h, l, c)
    }

    #[test]
    fn test_trailing_avg_body() {
        let bars: Vec<Bar> = (0..12)
            .map(|i| bar(10.0, 20.0, 5.0, 10.0 + i as f64))
            .collect();
        // bars 0..10 have bodies 0..9
        assert_eq!(trailing_avg_body(&bars, 10, 10), 4.5);
        // not enough history: own body
        assert_eq!(trailing_avg_body(&bars, 3, 10), 3.0);
    }

    #[test]
    fn test_trend_before() {
        let closes = [100.0, 99.0, 97.0, 96.0, 95.0, 80.0];
        let bars: Vec<Bar> = closes.iter().map(|&c| bar(c, c, c, c)).collect();
        // 100 -> 95 over the five bars before index 5
        assert_eq!(trend_before(&bars, 5, 5, 0.02), Trend::Down);
        assert_eq!(trend_before(&bars, 4, 5, 0.02), Trend::Sideways);

        let closes = [100.0, 100.5, 101.0, 101.5, 102.0, 90.0];
        let bars: Vec<Bar> = closes.iter().map(|&c| bar(c, c, c, c)).collect();
        assert_eq!(trend_before(&bars, 5, 5, 0.02), Trend::Up);
        assert_eq!(trend_before(&bars, 5, 5, 0.03), Trend::Sideways);
    }

    #[test]
    fn test_is_doji() {
        assert!(is_doji(0.1, 2.0, 5.0, DOJI_FACTOR));
        assert!(!is_doji(0.5, 2.0, 5.0, DOJI_FACTOR));
        assert!(!is_doji(0.0, 2.0, 0.0, DOJI_FACTOR));
        // fallback to range ratio
        assert!(is_doji(0.05, 0.0, 1.0, DOJI_FACTOR));
    }

    #[test]
    fn test_hammer_shape() {
        let hammer = bar(92.0, 93.0, 80.0, 93.0);
        assert!(is_hammer_shape(&hammer, hammer.lower_shadow(), hammer.upper_shadow(), 2.0, 2.0));
        let long_upper = bar(92.0, 98.0, 80.0, 93.0);
        assert!(!is_hammer_shape(
            &long_upper,
            long_upper.lower_shadow(),
            long_upper.upper_shadow(),
            2.0,
            2.0
        ));
    }
}
