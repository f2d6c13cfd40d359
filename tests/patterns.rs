//! Integration tests for candlestick pattern recognition.

use chartsense::prelude::*;

/// Simple test bar structure
#[derive(Debug, Clone)]
struct TestBar {
    day: String,
    o: f64,
    h: f64,
    l: f64,
    c: f64,
}

impl TestBar {
    fn new(i: usize, o: f64, h: f64, l: f64, c: f64) -> Self {
        Self {
            day: format!("2024-01-{:02}", i + 1),
            o,
            h,
            l,
            c,
        }
    }
}

impl OHLCV for TestBar {
    fn time(&self) -> BarTime {
        BarTime::Date(self.day.clone())
    }

    fn open(&self) -> f64 {
        self.o
    }

    fn high(&self) -> f64 {
        self.h
    }

    fn low(&self) -> f64 {
        self.l
    }

    fn close(&self) -> f64 {
        self.c
    }
}

/// 15 black candles falling 2 per bar from 120, then a hammer.
fn hammer_scenario() -> Vec<TestBar> {
    let mut bars: Vec<TestBar> = (0..15)
        .map(|i| {
            let c = 120.0 - 2.0 * i as f64;
            TestBar::new(i, c + 2.0, c + 2.5, c - 0.5, c)
        })
        .collect();
    bars.push(TestBar::new(15, 92.0, 93.0, 80.0, 93.0));
    bars
}

/// 15 small white candles at the same level, then three white soldiers.
fn soldiers_scenario() -> Vec<TestBar> {
    let mut bars: Vec<TestBar> = (0..15)
        .map(|i| TestBar::new(i, 100.0, 101.2, 99.8, 101.0))
        .collect();
    bars.push(TestBar::new(15, 100.0, 103.2, 99.8, 103.0));
    bars.push(TestBar::new(16, 102.0, 106.2, 101.8, 106.0));
    bars.push(TestBar::new(17, 105.0, 109.2, 104.8, 109.0));
    bars
}

fn make_noisy(n: usize) -> Vec<TestBar> {
    (0..n)
        .map(|i| {
            let base = 100.0 + (i as f64 * 0.8).sin() * 7.0;
            let open = base + (i as f64 * 2.3).cos() * 2.5;
            TestBar::new(i, open, base.max(open) + 1.2, base.min(open) - 1.1, base)
        })
        .collect()
}

// ============================================================
// SCENARIOS
// ============================================================

#[test]
fn test_hammer_after_downtrend() {
    let bars = hammer_scenario();
    let patterns = detect_patterns(&bars);

    let first = &patterns[0];
    assert_eq!(first.kind, PatternKind::Hammer);
    assert_eq!(first.name, "Hammer");
    assert_eq!(first.direction, Direction::Bullish);
    assert_eq!(first.reliability, Reliability::High);
    assert_eq!((first.start_index, first.end_index), (15, 15));
    assert!(!first.description.is_empty());
}

#[test]
fn test_hammer_wins_over_harami_on_same_bar() {
    let bars = hammer_scenario();

    // the harami alone matches the last bar
    let harami_only = PatternRecognizer::builder()
        .with_two_bar_defaults()
        .only_patterns([PatternKind::BullishHarami])
        .build()
        .unwrap();
    let harami = harami_only.detect(&bars);
    assert_eq!(harami[0].end_index, 15);
    assert_eq!(harami[0].reliability, Reliability::Medium);

    let at_last: Vec<_> = detect_patterns(&bars)
        .into_iter()
        .filter(|m| m.end_index == 15)
        .collect();
    assert_eq!(at_last.len(), 1);
    assert_eq!(at_last[0].kind, PatternKind::Hammer);
}

#[test]
fn test_three_white_soldiers() {
    let bars = soldiers_scenario();
    let patterns = detect_patterns(&bars);

    let first = &patterns[0];
    assert_eq!(first.kind, PatternKind::ThreeWhiteSoldiers);
    assert_eq!((first.start_index, first.end_index), (15, 17));
    assert_eq!(first.reliability, Reliability::High);
    assert_eq!(first.direction, Direction::Bullish);
}

#[test]
fn test_fewer_than_ten_bars() {
    let bars = hammer_scenario();
    assert!(detect_patterns(&bars[..9]).is_empty());
    assert!(detect_patterns::<TestBar>(&[]).is_empty());
}

#[test]
fn test_only_recent_window_scanned() {
    let bars = make_noisy(80);
    for m in detect_patterns(&bars) {
        assert!(m.end_index >= 60, "{} at {}", m.kind, m.end_index);
    }
}

// ============================================================
// INVARIANTS
// ============================================================

#[test]
fn test_idempotent() {
    let bars = make_noisy(60);
    assert_eq!(detect_patterns(&bars), detect_patterns(&bars));
}

#[test]
fn test_one_match_per_end_index_sorted_desc() {
    let bars = make_noisy(120);
    let patterns = detect_patterns(&bars);
    for pair in patterns.windows(2) {
        assert!(pair[0].end_index > pair[1].end_index);
    }
}

#[test]
fn test_span_matches_kind() {
    let bars = make_noisy(100);
    for m in detect_patterns(&bars) {
        assert_eq!(m.end_index + 1 - m.start_index, m.kind.bars());
        assert_eq!(m.direction, m.kind.typical_direction());
    }
}

// ============================================================
// RECOGNIZER API
// ============================================================

#[test]
fn test_min_reliability_filter() {
    let recognizer = PatternRecognizer::builder()
        .with_all_defaults()
        .min_reliability(Reliability::High)
        .build()
        .unwrap();
    let bars = make_noisy(100);
    assert!(recognizer
        .detect(&bars)
        .iter()
        .all(|m| m.reliability == Reliability::High));
}

#[test]
fn test_builder_single_category() {
    let recognizer = PatternRecognizer::builder()
        .with_three_bar_defaults()
        .build()
        .unwrap();
    assert_eq!(recognizer.detectors().len(), 6);

    let bars = soldiers_scenario();
    let patterns = recognizer.detect(&bars);
    assert_eq!(patterns[0].kind, PatternKind::ThreeWhiteSoldiers);
    assert!(patterns.iter().all(|m| m.kind.bars() == 3));
}

#[test]
fn test_custom_detector_thresholds() {
    // demand a shadow of 20x the body: the hammer no longer qualifies
    let strict = HammerDetector {
        shadow_factor: 20.0,
        strong_shadow_factor: 30.0,
    };
    let recognizer = PatternRecognizer::builder()
        .add_checked(BuiltinDetector::Hammer(strict))
        .unwrap()
        .build()
        .unwrap();
    assert!(recognizer.detect(&hammer_scenario()).is_empty());
}

#[test]
fn test_wider_scan_window() {
    let config = RecognizerConfig {
        scan_window: 200,
        ..Default::default()
    };
    let recognizer = PatternRecognizer::builder()
        .config(config)
        .with_all_defaults()
        .build()
        .unwrap();
    let bars = make_noisy(100);
    let wide = recognizer.detect(&bars);
    let narrow = detect_patterns(&bars);
    assert!(wide.len() >= narrow.len());
}

#[test]
fn test_match_serializes() {
    let patterns = detect_patterns(&hammer_scenario());
    let json = serde_json::to_value(&patterns[0]).unwrap();
    assert_eq!(json["kind"], "hammer");
    assert_eq!(json["reliability"], "high");
    assert_eq!(json["direction"], "bullish");
}
