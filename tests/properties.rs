//! Property tests over randomly generated bar series.

use std::result::Result;

use chartsense::prelude::*;
use proptest::prelude::*;

/// Random walk of well-formed bars.
fn arb_bars(min: usize, max: usize) -> impl Strategy<Value = Vec<Bar>> {
    prop::collection::vec(
        (-3.0f64..3.0, 0.0f64..2.0, 0.0f64..2.0, -1.5f64..1.5, 100.0f64..5_000.0),
        min..max,
    )
    .prop_map(|steps| {
        let mut close = 100.0;
        steps
            .into_iter()
            .enumerate()
            .map(|(i, (step, up, down, gap, volume))| {
                let open = (close + gap).max(1.0);
                close = (close + step).max(1.0);
                let high = open.max(close) + up;
                let low = (open.min(close) - down).max(0.5);
                Bar::new(i as i64, open, high, low, close).with_volume(volume)
            })
            .collect()
    })
}

fn check_line(bars: &[Bar], line: &[Point]) -> Result<(), TestCaseError> {
    prop_assert_eq!(line.len(), bars.len());
    let first = line.iter().position(|p| p.value.is_some()).unwrap_or(line.len());
    for (i, (bar, p)) in bars.iter().zip(line).enumerate() {
        prop_assert_eq!(&bar.time, &p.time);
        if i >= first {
            prop_assert!(p.value.is_some(), "gap at {}", i);
        }
    }
    Ok(())
}

proptest! {
    #[test]
    fn prop_indicators_aligned(bars in arb_bars(1, 120)) {
        check_line(&bars, &sma(&bars, &SmaParams::default()))?;
        check_line(&bars, &ema(&bars, &EmaParams::default()))?;
        check_line(&bars, &rsi(&bars, &RsiParams::default()))?;
        check_line(&bars, &atr(&bars, &AtrParams::default()))?;
        check_line(&bars, &obv(&bars))?;
        let m = macd(&bars, &MacdParams::default());
        check_line(&bars, &m.macd)?;
        check_line(&bars, &m.signal)?;
        let b = bollinger_bands(&bars, &BollingerParams::default());
        check_line(&bars, &b.middle)?;
        let s = stochastic(&bars, &StochasticParams::default());
        check_line(&bars, &s.k)?;
        check_line(&bars, &s.d)?;
    }

    #[test]
    fn prop_oscillators_bounded(bars in arb_bars(20, 150)) {
        for v in rsi(&bars, &RsiParams::default()).iter().flat_map(|p| p.value) {
            prop_assert!((0.0..=100.0).contains(&v));
        }
        let s = stochastic(&bars, &StochasticParams::default());
        for v in s.k.iter().chain(&s.d).flat_map(|p| p.value) {
            prop_assert!((-1e-9..=100.0 + 1e-9).contains(&v));
        }
    }

    #[test]
    fn prop_atr_non_negative(bars in arb_bars(2, 120)) {
        for v in atr(&bars, &AtrParams::default()).iter().flat_map(|p| p.value) {
            prop_assert!(v >= 0.0);
        }
    }

    #[test]
    fn prop_bollinger_ordered(bars in arb_bars(20, 120)) {
        let b = bollinger_bands(&bars, &BollingerParams::default());
        for i in 0..bars.len() {
            if let (Some(u), Some(m), Some(l)) = (b.upper[i].value, b.middle[i].value, b.lower[i].value) {
                prop_assert!(l <= m + 1e-9 && m <= u + 1e-9);
            }
        }
    }

    #[test]
    fn prop_patterns_unique_and_recent(bars in arb_bars(0, 80)) {
        let first = detect_patterns(&bars);
        prop_assert_eq!(&first, &detect_patterns(&bars));
        if bars.len() < 10 {
            prop_assert!(first.is_empty());
        }
        for pair in first.windows(2) {
            prop_assert!(pair[0].end_index > pair[1].end_index);
        }
        for m in &first {
            prop_assert!(m.end_index + 20 >= bars.len());
            prop_assert_eq!(m.end_index + 1 - m.start_index, m.kind.bars());
        }
    }

    #[test]
    fn prop_signals_in_window(bars in arb_bars(0, 90)) {
        let config = SignalConfig::default();
        let signals = detect_signals(&bars, &config);
        let n = bars.len();
        if n <= config.min_bars {
            prop_assert!(signals.is_empty());
        } else {
            let lookback = config.lookback_bars.min(n - config.min_bars);
            for s in &signals {
                prop_assert!(s.index >= n - lookback && s.index < n);
                prop_assert_eq!(s.price, bars[s.index].close);
            }
        }
    }

    #[test]
    fn prop_divergence_confidence_bounded(bars in arb_bars(0, 120)) {
        let config = DivergenceConfig::default();
        let found = detect_all_divergences(&bars, &config);
        for pair in found.windows(2) {
            prop_assert!(pair[0].end_index >= pair[1].end_index);
        }
        for d in &found {
            prop_assert!(d.confidence > config.min_confidence && d.confidence <= 1.0);
            match d.kind {
                DivergenceKind::Bearish => prop_assert!(d.price_end > d.price_start),
                DivergenceKind::Bullish => prop_assert!(d.price_end < d.price_start),
            }
        }
    }
}
