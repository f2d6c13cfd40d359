//! Integration tests for the indicator library.

use std::collections::HashMap;

use chartsense::prelude::*;

fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| Bar::new(i as i64, c, c + 0.5, c - 0.5, c).with_volume(1_000.0))
        .collect()
}

fn make_wave(n: usize) -> Vec<Bar> {
    (0..n)
        .map(|i| {
            let base = 50.0 + (i as f64 * 0.3).sin() * 6.0 + i as f64 * 0.1;
            let open = base - (i as f64 * 1.1).cos();
            Bar::new(i as i64, open, base.max(open) + 0.7, base.min(open) - 0.6, base)
                .with_volume(500.0 + (i % 7) as f64 * 40.0)
        })
        .collect()
}

fn assert_aligned(bars: &[Bar], line: &[Point]) {
    assert_eq!(line.len(), bars.len());
    for (bar, point) in bars.iter().zip(line) {
        assert_eq!(bar.time, point.time);
    }
}

/// Once a series produces a value it never goes back to `None`.
fn assert_null_prefix(line: &[Point]) {
    let first = line.iter().position(|p| p.value.is_some()).unwrap_or(line.len());
    assert!(line[first..].iter().all(|p| p.value.is_some()));
}

// ============================================================
// MOVING AVERAGES
// ============================================================

#[test]
fn test_sma_reference_values() {
    let bars = bars_from_closes(&[1.0, 2.0, 3.0, 4.0, 5.0]);
    let params = SmaParams {
        period: Period::new(3).unwrap(),
    };
    let values: Vec<Option<f64>> = sma(&bars, &params).iter().map(|p| p.value).collect();
    assert_eq!(values, vec![None, None, Some(2.0), Some(3.0), Some(4.0)]);
}

#[test]
fn test_ema_seed_equals_sma() {
    let bars = make_wave(60);
    for period in [3, 10, 20] {
        let p = Period::new(period).unwrap();
        let s = sma(&bars, &SmaParams { period: p });
        let e = ema(&bars, &EmaParams { period: p });
        assert_eq!(e[period - 1].value, s[period - 1].value);
        assert!(e[period - 2].value.is_none());
    }
}

// ============================================================
// OSCILLATORS
// ============================================================

#[test]
fn test_rsi_all_gains_saturates() {
    let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
    let bars = bars_from_closes(&closes);
    let line = rsi(&bars, &RsiParams::default());
    assert!(line[13].value.is_none());
    let last = line[29].value.unwrap();
    assert!((last - 100.0 * (1.0 - 1.0 / 101.0)).abs() < 1e-9);
}

#[test]
fn test_rsi_bounded() {
    let bars = make_wave(200);
    for p in rsi(&bars, &RsiParams::default()) {
        if let Some(v) = p.value {
            assert!((0.0..=100.0).contains(&v));
        }
    }
}

#[test]
fn test_macd_histogram_colors() {
    let bars = make_wave(120);
    let result = macd(&bars, &MacdParams::default());
    assert_aligned(&bars, &result.macd);
    for (i, h) in result.histogram.iter().enumerate() {
        match (h.value, result.macd[i].value, result.signal[i].value) {
            (Some(v), Some(m), Some(s)) => {
                assert!((v - (m - s)).abs() < 1e-12);
                let expected = if v >= 0.0 {
                    HistogramColor::Up
                } else {
                    HistogramColor::Down
                };
                assert_eq!(h.color, Some(expected));
            }
            (None, _, _) => assert!(h.color.is_none()),
            other => panic!("histogram without inputs: {other:?}"),
        }
    }
}

#[test]
fn test_stochastic_range() {
    let bars = make_wave(100);
    let result = stochastic(&bars, &StochasticParams::default());
    assert_aligned(&bars, &result.k);
    assert_aligned(&bars, &result.d);
    for p in result.k.iter().chain(&result.d) {
        if let Some(v) = p.value {
            assert!((0.0..=100.0).contains(&v));
        }
    }
}

// ============================================================
// VOLATILITY / TREND / VOLUME
// ============================================================

#[test]
fn test_bollinger_ordering() {
    let bars = make_wave(100);
    let bands = bollinger_bands(&bars, &BollingerParams::default());
    for i in 0..bars.len() {
        if let (Some(u), Some(m), Some(l)) =
            (bands.upper[i].value, bands.middle[i].value, bands.lower[i].value)
        {
            assert!(l <= m && m <= u);
        }
    }
    assert_null_prefix(&bands.middle);
}

#[test]
fn test_atr_non_negative() {
    let bars = make_wave(80);
    let line = atr(&bars, &AtrParams::default());
    assert_null_prefix(&line);
    assert!(line.iter().flat_map(|p| p.value).all(|v| v >= 0.0));
}

#[test]
fn test_adx_alignment() {
    let bars = make_wave(90);
    let result = adx(&bars, &AdxParams::default());
    assert_aligned(&bars, &result.adx);
    assert_aligned(&bars, &result.plus_di);
    assert_aligned(&bars, &result.minus_di);
    for v in result.adx.iter().flat_map(|p| p.value) {
        assert!((0.0..=100.0).contains(&v));
    }
}

#[test]
fn test_obv_accumulates() {
    let bars = bars_from_closes(&[10.0, 11.0, 10.5, 10.5, 12.0]);
    let values: Vec<f64> = obv(&bars).iter().map(|p| p.value.unwrap()).collect();
    assert_eq!(values, vec![1_000.0, 2_000.0, 1_000.0, 1_000.0, 2_000.0]);
}

#[test]
fn test_ichimoku_lines_aligned() {
    let bars = make_wave(120);
    let result = ichimoku(&bars, &IchimokuParams::default());
    for line in [
        &result.tenkan,
        &result.kijun,
        &result.senkou_a,
        &result.senkou_b,
        &result.chikou,
    ] {
        assert_aligned(&bars, line);
    }
}

// ============================================================
// LEVELS
// ============================================================

#[test]
fn test_standard_pivots_from_previous_bar() {
    let bars = vec![
        Bar::new(0i64, 100.0, 110.0, 90.0, 105.0),
        Bar::new(1i64, 105.0, 108.0, 101.0, 102.0),
    ];
    let result = pivot_points(&bars, &PivotPointsParams::default());
    assert!(result.pivot[0].value.is_none());
    let p = result.pivot[1].value.unwrap();
    assert!((p - 305.0 / 3.0).abs() < 1e-12);
    assert!((result.r1[1].value.unwrap() - (2.0 * p - 90.0)).abs() < 1e-12);
    assert!((result.s1[1].value.unwrap() - (2.0 * p - 110.0)).abs() < 1e-12);
}

#[test]
fn test_fibonacci_uptrend_levels() {
    let bars = vec![
        Bar::new(0i64, 100.0, 101.0, 90.0, 95.0),
        Bar::new(1i64, 95.0, 105.0, 94.0, 104.0),
        Bar::new(2i64, 104.0, 110.0, 103.0, 108.0),
    ];
    let fib = fibonacci_retracement(&bars, &FibonacciParams::default()).unwrap();
    assert!(fib.uptrend);
    assert_eq!((fib.swing_low_index, fib.swing_high_index), (0, 2));
    assert_eq!(fib.levels[0].price, 110.0);
    assert_eq!(fib.levels[6].price, 90.0);
    assert!((fib.levels[3].price - 100.0).abs() < 1e-12);
    assert_eq!(fib.levels[3].label, "50.0%");
}

// ============================================================
// CONFIGURATION
// ============================================================

#[test]
fn test_indicator_config_roundtrip_through_json() {
    let configs: Vec<IndicatorConfig> = serde_json::from_str(
        r#"[
            {"type": "ema", "period": 50},
            {"type": "bollinger", "std_dev": 2.5},
            {"type": "pivot_points", "method": "woodie"}
        ]"#,
    )
    .unwrap();
    assert_eq!(configs[0].label(), "EMA(50)");
    assert_eq!(configs[1].label(), "BB(20,2.5)");

    let bars = make_wave(60);
    match configs[2].compute(&bars) {
        IndicatorOutput::PivotPoints(result) => assert_aligned(&bars, &result.pivot),
        other => panic!("unexpected output: {other:?}"),
    }
}

#[test]
fn test_params_from_loose_records() {
    let mut raw = HashMap::new();
    raw.insert("period", 21.0);
    let params = RsiParams::with_params(&raw).unwrap();
    assert_eq!(params.period.get(), 21);

    raw.insert("period", 0.0);
    assert!(RsiParams::with_params(&raw).is_err());

    for meta in MacdParams::param_meta() {
        assert!(meta.validate(meta.default).is_ok(), "{}", meta.name);
    }
}
