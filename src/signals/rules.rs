//! Per-indicator threshold and crossover rules.
//!
//! Every rule compares bar `index` with bar `index - 1` and appends at most
//! one signal per outcome. Rules run in a fixed order so the output of
//! [`super::detect_signals`] is deterministic.

use super::{SignalConfig, SignalKind, SignalSeries, Strength, TechnicalSignal};
use crate::{Direction, OHLCV};

/// `prev` at or above `level`, `curr` below it
#[inline]
fn crossed_below(prev: f64, curr: f64, level: f64) -> bool {
    prev >= level && curr < level
}

/// `prev` at or below `level`, `curr` above it
#[inline]
fn crossed_above(prev: f64, curr: f64, level: f64) -> bool {
    prev <= level && curr > level
}

/// Values of a series at `index - 1` and `index`, if both exist
#[inline]
fn pair(values: &[Option<f64>], index: usize) -> Option<(f64, f64)> {
    Some((values.get(index - 1).copied()??, values.get(index).copied()??))
}

struct Emitter<'a, T> {
    bar: &'a T,
    index: usize,
    out: &'a mut Vec<TechnicalSignal>,
}

impl<T: OHLCV> Emitter<'_, T> {
    fn emit(
        &mut self,
        kind: SignalKind,
        direction: Direction,
        strength: Strength,
        value: f64,
        description: String,
    ) {
        self.out.push(TechnicalSignal {
            kind,
            direction,
            strength,
            date: self.bar.time(),
            price: self.bar.close(),
            indicator_name: kind.indicator_name().to_string(),
            value: Some(value),
            description,
            index: self.index,
        });
    }
}

pub(super) fn evaluate<T: OHLCV>(
    bars: &[T],
    index: usize,
    series: &SignalSeries,
    config: &SignalConfig,
    out: &mut Vec<TechnicalSignal>,
) {
    let Some(bar) = bars.get(index) else {
        return;
    };
    let mut emitter = Emitter { bar, index, out };

    rsi_rules(&mut emitter, series, config);
    macd_rules(&mut emitter, series);
    bollinger_rules(&mut emitter, bars, series, config);
    stochastic_rules(&mut emitter, series, config);
    adx_rules(&mut emitter, series, config);
}

// ============================================================
// RSI
// ============================================================

fn rsi_rules<T: OHLCV>(e: &mut Emitter<'_, T>, s: &SignalSeries, config: &SignalConfig) {
    let Some((prev, curr)) = pair(&s.rsi, e.index) else {
        return;
    };

    if crossed_below(prev, curr, config.rsi_oversold) {
        let strength = if curr < config.rsi_extreme_oversold {
            Strength::Strong
        } else {
            Strength::Moderate
        };
        e.emit(
            SignalKind::RsiOversold,
            Direction::Bullish,
            strength,
            curr,
            format!(
                "RSI fällt auf {curr:.1} unter {} und ist überverkauft",
                config.rsi_oversold
            ),
        );
    } else if crossed_above(prev, curr, config.rsi_overbought) {
        let strength = if curr > config.rsi_extreme_overbought {
            Strength::Strong
        } else {
            Strength::Moderate
        };
        e.emit(
            SignalKind::RsiOverbought,
            Direction::Bearish,
            strength,
            curr,
            format!(
                "RSI steigt auf {curr:.1} über {} und ist überkauft",
                config.rsi_overbought
            ),
        );
    }
}

// ============================================================
// MACD
// ============================================================

fn macd_rules<T: OHLCV>(e: &mut Emitter<'_, T>, s: &SignalSeries) {
    let (Some((line_prev, line)), Some((signal_prev, signal))) =
        (pair(&s.macd, e.index), pair(&s.macd_signal, e.index))
    else {
        return;
    };

    if line_prev <= signal_prev && line > signal {
        let strength = if line < 0.0 {
            Strength::Strong
        } else {
            Strength::Moderate
        };
        e.emit(
            SignalKind::MacdBullishCross,
            Direction::Bullish,
            strength,
            line,
            format!("MACD ({line:.3}) kreuzt die Signallinie ({signal:.3}) von unten nach oben"),
        );
    } else if line_prev >= signal_prev && line < signal {
        let strength = if line > 0.0 {
            Strength::Strong
        } else {
            Strength::Moderate
        };
        e.emit(
            SignalKind::MacdBearishCross,
            Direction::Bearish,
            strength,
            line,
            format!("MACD ({line:.3}) kreuzt die Signallinie ({signal:.3}) von oben nach unten"),
        );
    }
}

// ============================================================
// BOLLINGER
// ============================================================

fn bollinger_rules<T: OHLCV>(
    e: &mut Emitter<'_, T>,
    bars: &[T],
    s: &SignalSeries,
    config: &SignalConfig,
) {
    let index = e.index;

    if let Some(width) = s.bandwidth[index] {
        let lookback = config.squeeze_lookback.min(index + 1);
        let window_min = s.bandwidth[index + 1 - lookback..=index]
            .iter()
            .flatten()
            .copied()
            .fold(f64::INFINITY, f64::min);
        if width <= window_min && width < config.squeeze_threshold {
            let strength = if width < config.strong_squeeze_threshold {
                Strength::Strong
            } else {
                Strength::Moderate
            };
            e.emit(
                SignalKind::BollingerSqueeze,
                Direction::Neutral,
                strength,
                width,
                format!(
                    "Bollinger-Bänder ziehen sich zusammen (Bandbreite {:.1} %), Ausbruch wahrscheinlich",
                    width * 100.0
                ),
            );
        }
    }

    let (Some((upper_prev, upper)), Some((lower_prev, lower))) =
        (pair(&s.upper, index), pair(&s.lower, index))
    else {
        return;
    };
    let close_prev = bars[index - 1].close();
    let close = bars[index].close();

    if close_prev <= upper_prev && close > upper {
        e.emit(
            SignalKind::BollingerBreakoutUpper,
            Direction::Bullish,
            Strength::Moderate,
            upper,
            format!("Schlusskurs {close:.2} durchbricht das obere Bollinger-Band ({upper:.2})"),
        );
    } else if close_prev >= lower_prev && close < lower {
        e.emit(
            SignalKind::BollingerBreakoutLower,
            Direction::Bearish,
            Strength::Moderate,
            lower,
            format!("Schlusskurs {close:.2} durchbricht das untere Bollinger-Band ({lower:.2})"),
        );
    }
}

// ============================================================
// STOCHASTIC
// ============================================================

fn stochastic_rules<T: OHLCV>(e: &mut Emitter<'_, T>, s: &SignalSeries, config: &SignalConfig) {
    let Some((k_prev, k)) = pair(&s.stoch_k, e.index) else {
        return;
    };

    if crossed_below(k_prev, k, config.stochastic_oversold) {
        e.emit(
            SignalKind::StochasticOversold,
            Direction::Bullish,
            Strength::Moderate,
            k,
            format!("Stochastik %K fällt auf {k:.1} in den überverkauften Bereich"),
        );
    } else if crossed_above(k_prev, k, config.stochastic_overbought) {
        e.emit(
            SignalKind::StochasticOverbought,
            Direction::Bearish,
            Strength::Moderate,
            k,
            format!("Stochastik %K steigt auf {k:.1} in den überkauften Bereich"),
        );
    }

    let Some((d_prev, d)) = pair(&s.stoch_d, e.index) else {
        return;
    };

    if k_prev <= d_prev && k > d && k < 50.0 {
        let strength = if k < config.stochastic_oversold {
            Strength::Strong
        } else {
            Strength::Moderate
        };
        e.emit(
            SignalKind::StochasticBullishCross,
            Direction::Bullish,
            strength,
            k,
            format!("Stochastik %K ({k:.1}) kreuzt %D ({d:.1}) von unten nach oben"),
        );
    } else if k_prev >= d_prev && k < d && k > 50.0 {
        let strength = if k > config.stochastic_overbought {
            Strength::Strong
        } else {
            Strength::Moderate
        };
        e.emit(
            SignalKind::StochasticBearishCross,
            Direction::Bearish,
            strength,
            k,
            format!("Stochastik %K ({k:.1}) kreuzt %D ({d:.1}) von oben nach unten"),
        );
    }
}

// ============================================================
// ADX
// ============================================================

fn adx_rules<T: OHLCV>(e: &mut Emitter<'_, T>, s: &SignalSeries, config: &SignalConfig) {
    let Some((prev, curr)) = pair(&s.adx.adx, e.index) else {
        return;
    };

    let direction = match (s.adx.plus_di[e.index], s.adx.minus_di[e.index]) {
        (Some(plus), Some(minus)) if plus > minus => Direction::Bullish,
        (Some(plus), Some(minus)) if plus < minus => Direction::Bearish,
        _ => Direction::Neutral,
    };
    let trend_word = match direction {
        Direction::Bullish => "Aufwärtstrend",
        Direction::Bearish => "Abwärtstrend",
        Direction::Neutral => "Trend",
    };

    if prev < config.adx_trend_threshold && curr >= config.adx_trend_threshold {
        e.emit(
            SignalKind::AdxTrendStart,
            direction,
            Strength::Moderate,
            curr,
            format!(
                "ADX steigt auf {curr:.1} über {}, ein {trend_word} bildet sich",
                config.adx_trend_threshold
            ),
        );
    }
    if prev < config.adx_strong_threshold && curr >= config.adx_strong_threshold {
        e.emit(
            SignalKind::AdxStrongTrend,
            direction,
            Strength::Strong,
            curr,
            format!(
                "ADX steigt auf {curr:.1} über {}, starker {trend_word}",
                config.adx_strong_threshold
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::trend::AdxLines;
    use crate::Bar;

    fn empty_series(n: usize) -> SignalSeries {
        SignalSeries {
            rsi: vec![None; n],
            macd: vec![None; n],
            macd_signal: vec![None; n],
            upper: vec![None; n],
            lower: vec![None; n],
            bandwidth: vec![None; n],
            stoch_k: vec![None; n],
            stoch_d: vec![None; n],
            adx: AdxLines {
                adx: vec![None; n],
                plus_di: vec![None; n],
                minus_di: vec![None; n],
            },
        }
    }

    fn bars(closes: &[f64]) -> Vec<Bar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar::new(i as i64, c, c + 1.0, c - 1.0, c))
            .collect()
    }

    fn run(bars: &[Bar], series: &SignalSeries) -> Vec<TechnicalSignal> {
        let mut out = Vec::new();
        evaluate(bars, 1, series, &SignalConfig::default(), &mut out);
        out
    }

    #[test]
    fn test_crossing_helpers() {
        assert!(crossed_below(30.0, 29.9, 30.0));
        assert!(!crossed_below(29.0, 28.0, 30.0));
        assert!(crossed_above(70.0, 70.1, 70.0));
        assert!(!crossed_above(71.0, 72.0, 70.0));
    }

    #[test]
    fn test_rsi_oversold_strength() {
        let b = bars(&[100.0, 99.0]);
        let mut s = empty_series(2);
        s.rsi = vec![Some(35.0), Some(18.0)];
        let out = run(&b, &s);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind, SignalKind::RsiOversold);
        assert_eq!(out[0].direction, Direction::Bullish);
        assert_eq!(out[0].strength, Strength::Strong);
        assert_eq!(out[0].value, Some(18.0));

        s.rsi = vec![Some(35.0), Some(25.0)];
        assert_eq!(run(&b, &s)[0].strength, Strength::Moderate);
    }

    #[test]
    fn test_rsi_overbought() {
        let b = bars(&[100.0, 101.0]);
        let mut s = empty_series(2);
        s.rsi = vec![Some(65.0), Some(82.0)];
        let out = run(&b, &s);
        assert_eq!(out[0].kind, SignalKind::RsiOverbought);
        assert_eq!(out[0].strength, Strength::Strong);
    }

    #[test]
    fn test_macd_cross_strength_by_zero_line() {
        let b = bars(&[100.0, 101.0]);
        let mut s = empty_series(2);
        s.macd = vec![Some(-0.5), Some(-0.1)];
        s.macd_signal = vec![Some(-0.3), Some(-0.2)];
        let out = run(&b, &s);
        assert_eq!(out[0].kind, SignalKind::MacdBullishCross);
        assert_eq!(out[0].strength, Strength::Strong);

        s.macd = vec![Some(0.5), Some(0.1)];
        s.macd_signal = vec![Some(0.3), Some(0.2)];
        let out = run(&b, &s);
        assert_eq!(out[0].kind, SignalKind::MacdBearishCross);
        assert_eq!(out[0].strength, Strength::Strong);
    }

    #[test]
    fn test_bollinger_breakouts() {
        let b = bars(&[100.0, 106.0]);
        let mut s = empty_series(2);
        s.upper = vec![Some(105.0), Some(105.0)];
        s.lower = vec![Some(95.0), Some(95.0)];
        let out = run(&b, &s);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind, SignalKind::BollingerBreakoutUpper);

        let b = bars(&[100.0, 94.0]);
        let out = run(&b, &s);
        assert_eq!(out[0].kind, SignalKind::BollingerBreakoutLower);
        assert_eq!(out[0].direction, Direction::Bearish);
    }

    #[test]
    fn test_bollinger_squeeze() {
        let b = bars(&[100.0, 100.0]);
        let mut s = empty_series(2);
        s.bandwidth = vec![Some(0.06), Some(0.04)];
        let out = run(&b, &s);
        assert_eq!(out[0].kind, SignalKind::BollingerSqueeze);
        assert_eq!(out[0].strength, Strength::Strong);
        assert_eq!(out[0].direction, Direction::Neutral);

        // not the minimum of the window
        s.bandwidth = vec![Some(0.03), Some(0.04)];
        assert!(run(&b, &s).is_empty());
    }

    #[test]
    fn test_stochastic_cross_requires_zone() {
        let b = bars(&[100.0, 100.0]);
        let mut s = empty_series(2);
        s.stoch_k = vec![Some(15.0), Some(19.0)];
        s.stoch_d = vec![Some(17.0), Some(17.5)];
        let out = run(&b, &s);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind, SignalKind::StochasticBullishCross);
        assert_eq!(out[0].strength, Strength::Strong);

        // bullish cross above 50 is ignored
        s.stoch_k = vec![Some(55.0), Some(60.0)];
        s.stoch_d = vec![Some(57.0), Some(58.0)];
        assert!(run(&b, &s).is_empty());
    }

    #[test]
    fn test_adx_levels_and_direction() {
        let b = bars(&[100.0, 100.0]);
        let mut s = empty_series(2);
        s.adx.adx = vec![Some(22.0), Some(41.0)];
        s.adx.plus_di = vec![Some(20.0), Some(30.0)];
        s.adx.minus_di = vec![Some(20.0), Some(10.0)];
        let out = run(&b, &s);
        let kinds: Vec<SignalKind> = out.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, vec![SignalKind::AdxTrendStart, SignalKind::AdxStrongTrend]);
        assert!(out.iter().all(|s| s.direction == Direction::Bullish));
    }
}
