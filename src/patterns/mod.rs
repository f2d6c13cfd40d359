//! Candlestick pattern recognition
//!
//! Detects 22 classic candlestick formations over the most recent bars of a
//! series. Shape tests are normalised by the trailing average body (see
//! [`helpers`]) and reversal patterns are gated on the trend preceding the
//! pattern's first candle.
//!
//! # Pattern Categories
//!
//! - **Single-bar (8)**: Doji, Hammer family, Spinning Top, Marubozu
//! - **Two-bar (8)**: Engulfing, Harami, Piercing Line/Dark Cloud Cover, Tweezers
//! - **Three-bar (6)**: Morning/Evening Star, Three Soldiers/Crows, Three Inside
//!
//! At most one pattern is reported per ending bar: the most reliable one,
//! ties going to the detector registered first.

use std::collections::BTreeMap;

use crate::{Direction, Result, TaError, OHLCV};

pub mod helpers;

/// Generate `with_defaults()` -> `Self::default()` for multiple detector types.
macro_rules! impl_with_defaults {
  ($($detector:ty),* $(,)?) => {
    $(impl $detector {
      pub fn with_defaults() -> Self { Self::default() }
    })*
  };
}

pub mod single_bar;
pub mod three_bar;
pub mod two_bar;

pub use helpers::{MarketContext, Trend};
pub use single_bar::*;
pub use three_bar::*;
pub use two_bar::*;

// ============================================================
// PATTERN KINDS
// ============================================================

/// Every recognised candlestick formation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    // Single bar
    Doji,
    Hammer,
    InvertedHammer,
    HangingMan,
    ShootingStar,
    SpinningTop,
    BullishMarubozu,
    BearishMarubozu,
    // Two bar
    BullishEngulfing,
    BearishEngulfing,
    BullishHarami,
    BearishHarami,
    PiercingLine,
    DarkCloudCover,
    TweezerBottom,
    TweezerTop,
    // Three bar
    MorningStar,
    EveningStar,
    ThreeWhiteSoldiers,
    ThreeBlackCrows,
    ThreeInsideUp,
    ThreeInsideDown,
}

impl PatternKind {
    pub const ALL: [PatternKind; 22] = [
        PatternKind::Doji,
        PatternKind::Hammer,
        PatternKind::InvertedHammer,
        PatternKind::HangingMan,
        PatternKind::ShootingStar,
        PatternKind::SpinningTop,
        PatternKind::BullishMarubozu,
        PatternKind::BearishMarubozu,
        PatternKind::BullishEngulfing,
        PatternKind::BearishEngulfing,
        PatternKind::BullishHarami,
        PatternKind::BearishHarami,
        PatternKind::PiercingLine,
        PatternKind::DarkCloudCover,
        PatternKind::TweezerBottom,
        PatternKind::TweezerTop,
        PatternKind::MorningStar,
        PatternKind::EveningStar,
        PatternKind::ThreeWhiteSoldiers,
        PatternKind::ThreeBlackCrows,
        PatternKind::ThreeInsideUp,
        PatternKind::ThreeInsideDown,
    ];

    /// Stable machine identifier, identical to the serde name
    pub fn id(self) -> &'static str {
        match self {
            PatternKind::Doji => "doji",
            PatternKind::Hammer => "hammer",
            PatternKind::InvertedHammer => "inverted_hammer",
            PatternKind::HangingMan => "hanging_man",
            PatternKind::ShootingStar => "shooting_star",
            PatternKind::SpinningTop => "spinning_top",
            PatternKind::BullishMarubozu => "bullish_marubozu",
            PatternKind::BearishMarubozu => "bearish_marubozu",
            PatternKind::BullishEngulfing => "bullish_engulfing",
            PatternKind::BearishEngulfing => "bearish_engulfing",
            PatternKind::BullishHarami => "bullish_harami",
            PatternKind::BearishHarami => "bearish_harami",
            PatternKind::PiercingLine => "piercing_line",
            PatternKind::DarkCloudCover => "dark_cloud_cover",
            PatternKind::TweezerBottom => "tweezer_bottom",
            PatternKind::TweezerTop => "tweezer_top",
            PatternKind::MorningStar => "morning_star",
            PatternKind::EveningStar => "evening_star",
            PatternKind::ThreeWhiteSoldiers => "three_white_soldiers",
            PatternKind::ThreeBlackCrows => "three_black_crows",
            PatternKind::ThreeInsideUp => "three_inside_up",
            PatternKind::ThreeInsideDown => "three_inside_down",
        }
    }

    /// Display name
    pub fn name(self) -> &'static str {
        match self {
            PatternKind::Doji => "Doji",
            PatternKind::Hammer => "Hammer",
            PatternKind::InvertedHammer => "Inverted Hammer",
            PatternKind::HangingMan => "Hanging Man",
            PatternKind::ShootingStar => "Shooting Star",
            PatternKind::SpinningTop => "Spinning Top",
            PatternKind::BullishMarubozu => "Bullish Marubozu",
            PatternKind::BearishMarubozu => "Bearish Marubozu",
            PatternKind::BullishEngulfing => "Bullish Engulfing",
            PatternKind::BearishEngulfing => "Bearish Engulfing",
            PatternKind::BullishHarami => "Bullish Harami",
            PatternKind::BearishHarami => "Bearish Harami",
            PatternKind::PiercingLine => "Piercing Line",
            PatternKind::DarkCloudCover => "Dark Cloud Cover",
            PatternKind::TweezerBottom => "Tweezer Bottom",
            PatternKind::TweezerTop => "Tweezer Top",
            PatternKind::MorningStar => "Morning Star",
            PatternKind::EveningStar => "Evening Star",
            PatternKind::ThreeWhiteSoldiers => "Three White Soldiers",
            PatternKind::ThreeBlackCrows => "Three Black Crows",
            PatternKind::ThreeInsideUp => "Three Inside Up",
            PatternKind::ThreeInsideDown => "Three Inside Down",
        }
    }

    /// German description attached to every match
    pub fn description(self) -> &'static str {
        match self {
            PatternKind::Doji => {
                "Doji: Eröffnung und Schluss nahezu gleich, Unentschlossenheit im Markt"
            }
            PatternKind::Hammer => {
                "Hammer nach Abwärtstrend: lange untere Lunte, Käufer drängen zurück"
            }
            PatternKind::InvertedHammer => {
                "Inverted Hammer nach Abwärtstrend: lange obere Lunte, mögliche Bodenbildung"
            }
            PatternKind::HangingMan => {
                "Hanging Man nach Aufwärtstrend: lange untere Lunte, Warnsignal für Verkaufsdruck"
            }
            PatternKind::ShootingStar => {
                "Shooting Star nach Aufwärtstrend: lange obere Lunte, Käufer verlieren die Kontrolle"
            }
            PatternKind::SpinningTop => {
                "Spinning Top: kleiner Körper mit Lunten auf beiden Seiten, Gleichgewicht der Kräfte"
            }
            PatternKind::BullishMarubozu => {
                "Bullischer Marubozu: langer weißer Körper fast ohne Lunten, starke Käufer"
            }
            PatternKind::BearishMarubozu => {
                "Bärischer Marubozu: langer schwarzer Körper fast ohne Lunten, starke Verkäufer"
            }
            PatternKind::BullishEngulfing => {
                "Bullisches Engulfing: weiße Kerze umschließt den Körper der vorherigen schwarzen Kerze"
            }
            PatternKind::BearishEngulfing => {
                "Bärisches Engulfing: schwarze Kerze umschließt den Körper der vorherigen weißen Kerze"
            }
            PatternKind::BullishHarami => {
                "Bullisches Harami: kleiner Körper innerhalb der vorherigen langen schwarzen Kerze"
            }
            PatternKind::BearishHarami => {
                "Bärisches Harami: kleiner Körper innerhalb der vorherigen langen weißen Kerze"
            }
            PatternKind::PiercingLine => {
                "Piercing Line: weiße Kerze schließt über der Mitte der vorherigen schwarzen Kerze"
            }
            PatternKind::DarkCloudCover => {
                "Dark Cloud Cover: schwarze Kerze schließt unter der Mitte der vorherigen weißen Kerze"
            }
            PatternKind::TweezerBottom => {
                "Tweezer Bottom: zwei Kerzen mit gleichem Tief, Unterstützung bestätigt"
            }
            PatternKind::TweezerTop => {
                "Tweezer Top: zwei Kerzen mit gleichem Hoch, Widerstand bestätigt"
            }
            PatternKind::MorningStar => {
                "Morning Star: Umkehrformation aus drei Kerzen am Ende eines Abwärtstrends"
            }
            PatternKind::EveningStar => {
                "Evening Star: Umkehrformation aus drei Kerzen am Ende eines Aufwärtstrends"
            }
            PatternKind::ThreeWhiteSoldiers => {
                "Three White Soldiers: drei lange weiße Kerzen mit steigenden Schlusskursen"
            }
            PatternKind::ThreeBlackCrows => {
                "Three Black Crows: drei lange schwarze Kerzen mit fallenden Schlusskursen"
            }
            PatternKind::ThreeInsideUp => {
                "Three Inside Up: bestätigtes bullisches Harami nach Abwärtstrend"
            }
            PatternKind::ThreeInsideDown => {
                "Three Inside Down: bestätigtes bärisches Harami nach Aufwärtstrend"
            }
        }
    }

    /// Number of candles the formation spans
    pub fn bars(self) -> usize {
        match self {
            PatternKind::Doji
            | PatternKind::Hammer
            | PatternKind::InvertedHammer
            | PatternKind::HangingMan
            | PatternKind::ShootingStar
            | PatternKind::SpinningTop
            | PatternKind::BullishMarubozu
            | PatternKind::BearishMarubozu => 1,
            PatternKind::BullishEngulfing
            | PatternKind::BearishEngulfing
            | PatternKind::BullishHarami
            | PatternKind::BearishHarami
            | PatternKind::PiercingLine
            | PatternKind::DarkCloudCover
            | PatternKind::TweezerBottom
            | PatternKind::TweezerTop => 2,
            _ => 3,
        }
    }

    /// Direction the formation usually signals
    pub fn typical_direction(self) -> Direction {
        match self {
            PatternKind::Doji | PatternKind::SpinningTop => Direction::Neutral,
            PatternKind::Hammer
            | PatternKind::InvertedHammer
            | PatternKind::BullishMarubozu
            | PatternKind::BullishEngulfing
            | PatternKind::BullishHarami
            | PatternKind::PiercingLine
            | PatternKind::TweezerBottom
            | PatternKind::MorningStar
            | PatternKind::ThreeWhiteSoldiers
            | PatternKind::ThreeInsideUp => Direction::Bullish,
            _ => Direction::Bearish,
        }
    }
}

impl std::fmt::Display for PatternKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// Reliability rating of a match; orders `Low < Medium < High`
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Reliability {
    Low,
    Medium,
    High,
}

/// Pattern detection result
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PatternMatch {
    pub kind: PatternKind,
    pub name: String,
    pub direction: Direction,
    pub reliability: Reliability,
    pub start_index: usize,
    pub end_index: usize,
    pub description: String,
}

impl PatternMatch {
    /// Match spanning `end_index + 1 - kind.bars()..=end_index`, with the
    /// kind's name and description. The start is clamped at bar 0.
    pub(crate) fn new(kind: PatternKind, end_index: usize, reliability: Reliability) -> Self {
        Self {
            kind,
            name: kind.name().to_string(),
            direction: kind.typical_direction(),
            reliability,
            start_index: (end_index + 1).saturating_sub(kind.bars()),
            end_index,
            description: kind.description().to_string(),
        }
    }
}

// ============================================================
// DETECTOR TRAIT
// ============================================================

/// Generic pattern detector trait
///
/// `contexts` is index-aligned with `bars`; a detector reads the average body
/// at `index` and the trend at its first candle.
pub trait PatternDetector: Send + Sync {
    fn kind(&self) -> PatternKind;

    fn min_bars(&self) -> usize {
        self.kind().bars()
    }

    fn detect<T: OHLCV>(
        &self,
        bars: &[T],
        index: usize,
        contexts: &[MarketContext],
    ) -> Option<PatternMatch>;

    fn validate_config(&self) -> Result<()> {
        Ok(())
    }
}

/// Reject non-finite or non-positive detector thresholds
pub(crate) fn check_positive(field: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(TaError::InvalidConfig(format!(
            "{field} must be a positive finite number, got {value}"
        )));
    }
    Ok(())
}

// ============================================================
// BUILTIN DETECTORS - generated via macro
// ============================================================

macro_rules! define_builtin_detectors {
    (
        $(
            $variant:ident($detector:ty)
        ),* $(,)?
    ) => {
        /// All builtin detectors - enum dispatch
        #[derive(Debug, Clone)]
        pub enum BuiltinDetector {
            $($variant($detector)),*
        }

        impl BuiltinDetector {
            #[inline]
            pub fn detect<T: OHLCV>(
                &self,
                bars: &[T],
                index: usize,
                contexts: &[MarketContext],
            ) -> Option<PatternMatch> {
                match self {
                    $(Self::$variant(d) => PatternDetector::detect(d, bars, index, contexts)),*
                }
            }

            #[inline]
            pub fn kind(&self) -> PatternKind {
                match self {
                    $(Self::$variant(d) => PatternDetector::kind(d)),*
                }
            }

            #[inline]
            pub fn min_bars(&self) -> usize {
                match self {
                    $(Self::$variant(d) => PatternDetector::min_bars(d)),*
                }
            }

            pub fn validate_config(&self) -> Result<()> {
                match self {
                    $(Self::$variant(d) => PatternDetector::validate_config(d)),*
                }
            }
        }
    };
}

define_builtin_detectors! {
    // Single bar (8)
    Doji(DojiDetector),
    Hammer(HammerDetector),
    InvertedHammer(InvertedHammerDetector),
    HangingMan(HangingManDetector),
    ShootingStar(ShootingStarDetector),
    SpinningTop(SpinningTopDetector),
    BullishMarubozu(BullishMarubozuDetector),
    BearishMarubozu(BearishMarubozuDetector),

    // Two bar (8)
    BullishEngulfing(BullishEngulfingDetector),
    BearishEngulfing(BearishEngulfingDetector),
    BullishHarami(BullishHaramiDetector),
    BearishHarami(BearishHaramiDetector),
    PiercingLine(PiercingLineDetector),
    DarkCloudCover(DarkCloudCoverDetector),
    TweezerBottom(TweezerBottomDetector),
    TweezerTop(TweezerTopDetector),

    // Three bar (6)
    MorningStar(MorningStarDetector),
    EveningStar(EveningStarDetector),
    ThreeWhiteSoldiers(ThreeWhiteSoldiersDetector),
    ThreeBlackCrows(ThreeBlackCrowsDetector),
    ThreeInsideUp(ThreeInsideUpDetector),
    ThreeInsideDown(ThreeInsideDownDetector),
}

// ============================================================
// RECOGNIZER
// ============================================================

/// Recognizer configuration
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RecognizerConfig {
    /// Series shorter than this produce no patterns
    pub min_bars: usize,
    /// Only patterns ending in the last `scan_window` bars are reported
    pub scan_window: usize,
    /// Number of preceding bars averaged for the body normalisation
    pub avg_body_period: usize,
    /// Number of preceding bars inspected by the trend gate
    pub trend_lookback: usize,
    /// Relative close-to-close move classifying the preceding bars as a trend
    pub trend_threshold: f64,
    pub min_reliability: Option<Reliability>,
    pub pattern_filter: Option<Vec<PatternKind>>,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            min_bars: 10,
            scan_window: 20,
            avg_body_period: 10,
            trend_lookback: 5,
            trend_threshold: 0.02,
            min_reliability: None,
            pattern_filter: None,
        }
    }
}

impl RecognizerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_bars < 3 {
            return Err(TaError::InvalidConfig(format!(
                "min_bars must be at least 3, got {}",
                self.min_bars
            )));
        }
        if self.scan_window == 0 {
            return Err(TaError::InvalidConfig("scan_window must be positive".into()));
        }
        if self.avg_body_period == 0 {
            return Err(TaError::InvalidConfig("avg_body_period must be positive".into()));
        }
        if self.trend_lookback < 2 {
            return Err(TaError::InvalidConfig(format!(
                "trend_lookback must be at least 2, got {}",
                self.trend_lookback
            )));
        }
        check_positive("trend_threshold", self.trend_threshold)
    }

    /// Market context for every bar from `from` onwards; earlier entries are
    /// left at their default.
    pub fn compute_contexts<T: OHLCV>(&self, bars: &[T], from: usize) -> Vec<MarketContext> {
        let mut contexts = vec![MarketContext::default(); bars.len()];
        for (i, ctx) in contexts.iter_mut().enumerate().skip(from) {
            *ctx = MarketContext {
                avg_body: helpers::trailing_avg_body(bars, i, self.avg_body_period),
                trend: helpers::trend_before(bars, i, self.trend_lookback, self.trend_threshold),
            };
        }
        contexts
    }
}

/// Pattern recognizer over a fixed set of detectors
#[derive(Debug, Clone)]
pub struct PatternRecognizer {
    detectors: Vec<BuiltinDetector>,
    config: RecognizerConfig,
}

impl Default for PatternRecognizer {
    fn default() -> Self {
        Self {
            detectors: all_default_detectors(),
            config: RecognizerConfig::default(),
        }
    }
}

impl PatternRecognizer {
    pub fn builder() -> RecognizerBuilder {
        RecognizerBuilder::new()
    }

    pub fn config(&self) -> &RecognizerConfig {
        &self.config
    }

    pub fn detectors(&self) -> &[BuiltinDetector] {
        &self.detectors
    }

    /// Detect patterns ending in the scan window.
    ///
    /// Returns at most one match per ending bar, most recent first.
    pub fn detect<T: OHLCV>(&self, bars: &[T]) -> Vec<PatternMatch> {
        let n = bars.len();
        if n < self.config.min_bars {
            tracing::debug!(bars = n, min_bars = self.config.min_bars, "too few bars for pattern scan");
            return Vec::new();
        }

        let window_start = n.saturating_sub(self.config.scan_window);
        // three-bar detectors read the trend two bars before the window
        let contexts = self.config.compute_contexts(bars, window_start.saturating_sub(2));

        let mut best: BTreeMap<usize, PatternMatch> = BTreeMap::new();
        for index in window_start..n {
            for detector in &self.detectors {
                if index + 1 < detector.min_bars() {
                    continue;
                }
                let Some(m) = detector.detect(bars, index, &contexts) else {
                    continue;
                };
                if !self.should_include(&m) {
                    continue;
                }
                match best.get(&m.end_index) {
                    Some(current) if current.reliability >= m.reliability => {
                        tracing::trace!(
                            index,
                            kept = %current.kind,
                            dropped = %m.kind,
                            "pattern superseded"
                        );
                    }
                    _ => {
                        best.insert(m.end_index, m);
                    }
                }
            }
        }

        let matches: Vec<PatternMatch> = best.into_values().rev().collect();
        tracing::debug!(bars = n, patterns = matches.len(), "pattern scan finished");
        matches
    }

    fn should_include(&self, m: &PatternMatch) -> bool {
        if let Some(min) = self.config.min_reliability {
            if m.reliability < min {
                return false;
            }
        }
        if let Some(ref filter) = self.config.pattern_filter {
            if !filter.contains(&m.kind) {
                return false;
            }
        }
        true
    }

    fn validate(&self) -> Result<()> {
        self.config.validate()?;
        for detector in &self.detectors {
            detector.validate_config()?;
        }
        Ok(())
    }
}

/// Detect patterns with the default recognizer
pub fn detect_patterns<T: OHLCV>(bars: &[T]) -> Vec<PatternMatch> {
    PatternRecognizer::default().detect(bars)
}

// ============================================================
// BUILDER
// ============================================================

/// Builder for creating PatternRecognizer instances
#[derive(Debug, Clone, Default)]
pub struct RecognizerBuilder {
    detectors: Vec<BuiltinDetector>,
    config: RecognizerConfig,
}

/// Generate an array of `BuiltinDetector` variants using `Default::default()` for each inner type.
macro_rules! builtin_defaults {
  ($($variant:ident),* $(,)?) => {
    [$(BuiltinDetector::$variant(Default::default())),*]
  };
}

fn all_default_detectors() -> Vec<BuiltinDetector> {
    RecognizerBuilder::new().with_all_defaults().detectors
}

impl RecognizerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: RecognizerConfig) -> Self {
        self.config = config;
        self
    }

    /// Add all builtin patterns with default configurations
    pub fn with_all_defaults(self) -> Self {
        self.with_single_bar_defaults()
            .with_two_bar_defaults()
            .with_three_bar_defaults()
    }

    /// Add single-bar patterns with defaults (8)
    pub fn with_single_bar_defaults(mut self) -> Self {
        self.detectors.extend(builtin_defaults![
            Doji,
            Hammer,
            InvertedHammer,
            HangingMan,
            ShootingStar,
            SpinningTop,
            BullishMarubozu,
            BearishMarubozu,
        ]);
        self
    }

    /// Add two-bar patterns with defaults (8)
    pub fn with_two_bar_defaults(mut self) -> Self {
        self.detectors.extend(builtin_defaults![
            BullishEngulfing,
            BearishEngulfing,
            BullishHarami,
            BearishHarami,
            PiercingLine,
            DarkCloudCover,
            TweezerBottom,
            TweezerTop,
        ]);
        self
    }

    /// Add three-bar patterns with defaults (6)
    pub fn with_three_bar_defaults(mut self) -> Self {
        self.detectors.extend(builtin_defaults![
            MorningStar,
            EveningStar,
            ThreeWhiteSoldiers,
            ThreeBlackCrows,
            ThreeInsideUp,
            ThreeInsideDown,
        ]);
        self
    }

    /// Add a builtin detector
    #[allow(clippy::should_implement_trait)]
    pub fn add(mut self, detector: BuiltinDetector) -> Self {
        self.detectors.push(detector);
        self
    }

    /// Add with config validation
    pub fn add_checked(mut self, detector: BuiltinDetector) -> Result<Self> {
        detector.validate_config()?;
        self.detectors.push(detector);
        Ok(self)
    }

    /// Set minimum reliability filter
    pub fn min_reliability(mut self, reliability: Reliability) -> Self {
        self.config.min_reliability = Some(reliability);
        self
    }

    /// Filter to specific patterns only
    pub fn only_patterns(mut self, kinds: impl IntoIterator<Item = PatternKind>) -> Self {
        self.config.pattern_filter = Some(kinds.into_iter().collect());
        self
    }

    /// Build the recognizer
    pub fn build(self) -> Result<PatternRecognizer> {
        let recognizer = PatternRecognizer {
            detectors: self.detectors,
            config: self.config,
        };
        recognizer.validate()?;
        Ok(recognizer)
    }
}

// ============================================================
// TESTS
// ============================================================
