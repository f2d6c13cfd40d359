//! Single-bar candlestick pattern detectors
//!
//! Doji, Hammer, Inverted Hammer, Hanging Man, Shooting Star, Spinning Top
//! and the two Marubozu colours.

use super::helpers::{self, is_doji, is_hammer_shape, is_long_body, is_small_body, MarketContext};
use super::{check_positive, PatternDetector, PatternKind, PatternMatch, Reliability};
use crate::{OHLCVExt, Result, OHLCV};

impl_with_defaults!(
    DojiDetector,
    HammerDetector,
    InvertedHammerDetector,
    HangingManDetector,
    ShootingStarDetector,
    SpinningTopDetector,
    BullishMarubozuDetector,
    BearishMarubozuDetector,
);

// ============================================================
// DOJI / SPINNING TOP
// ============================================================

/// Open and close practically equal
#[derive(Debug, Clone, Copy)]
pub struct DojiDetector {
    pub doji_factor: f64,
}

impl Default for DojiDetector {
    fn default() -> Self {
        Self {
            doji_factor: helpers::DOJI_FACTOR,
        }
    }
}

impl PatternDetector for DojiDetector {
    fn kind(&self) -> PatternKind {
        PatternKind::Doji
    }

    fn detect<T: OHLCV>(
        &self,
        bars: &[T],
        index: usize,
        contexts: &[MarketContext],
    ) -> Option<PatternMatch> {
        let bar = bars.get(index)?;
        let ctx = contexts.get(index)?;

        if !is_doji(bar.body(), ctx.avg_body, bar.range(), self.doji_factor) {
            return None;
        }
        Some(PatternMatch::new(self.kind(), index, Reliability::Low))
    }

    fn validate_config(&self) -> Result<()> {
        check_positive("doji_factor", self.doji_factor)
    }
}

/// Small body with shadows longer than the body on both sides
#[derive(Debug, Clone, Copy)]
pub struct SpinningTopDetector {
    pub body_factor: f64,
    pub doji_factor: f64,
}

impl Default for SpinningTopDetector {
    fn default() -> Self {
        Self {
            body_factor: helpers::SMALL_BODY_FACTOR,
            doji_factor: helpers::DOJI_FACTOR,
        }
    }
}

impl PatternDetector for SpinningTopDetector {
    fn kind(&self) -> PatternKind {
        PatternKind::SpinningTop
    }

    fn detect<T: OHLCV>(
        &self,
        bars: &[T],
        index: usize,
        contexts: &[MarketContext],
    ) -> Option<PatternMatch> {
        let bar = bars.get(index)?;
        let ctx = contexts.get(index)?;
        let body = bar.body();
        let range = bar.range();

        // a doji is reported as such
        if is_doji(body, ctx.avg_body, range, self.doji_factor) {
            return None;
        }
        if !is_small_body(body, ctx.avg_body, range, self.body_factor) {
            return None;
        }
        if bar.upper_shadow() <= body || bar.lower_shadow() <= body {
            return None;
        }
        Some(PatternMatch::new(self.kind(), index, Reliability::Low))
    }

    fn validate_config(&self) -> Result<()> {
        check_positive("body_factor", self.body_factor)?;
        check_positive("doji_factor", self.doji_factor)
    }
}

// ============================================================
// HAMMER FAMILY
// ============================================================

/// Long lower shadow after a downtrend
#[derive(Debug, Clone, Copy)]
pub struct HammerDetector {
    pub shadow_factor: f64,
    pub strong_shadow_factor: f64,
}

impl Default for HammerDetector {
    fn default() -> Self {
        Self {
            shadow_factor: helpers::SHADOW_BODY_FACTOR,
            strong_shadow_factor: helpers::STRONG_SHADOW_FACTOR,
        }
    }
}

impl PatternDetector for HammerDetector {
    fn kind(&self) -> PatternKind {
        PatternKind::Hammer
    }

    fn detect<T: OHLCV>(
        &self,
        bars: &[T],
        index: usize,
        contexts: &[MarketContext],
    ) -> Option<PatternMatch> {
        let bar = bars.get(index)?;
        let ctx = contexts.get(index)?;
        if !ctx.trend.is_down() {
            return None;
        }

        let lower = bar.lower_shadow();
        if !is_hammer_shape(bar, lower, bar.upper_shadow(), ctx.avg_body, self.shadow_factor) {
            return None;
        }

        let reliability = if lower >= bar.body() * self.strong_shadow_factor {
            Reliability::High
        } else {
            Reliability::Medium
        };
        Some(PatternMatch::new(self.kind(), index, reliability))
    }

    fn validate_config(&self) -> Result<()> {
        check_positive("shadow_factor", self.shadow_factor)?;
        check_positive("strong_shadow_factor", self.strong_shadow_factor)
    }
}

/// Long upper shadow after a downtrend
#[derive(Debug, Clone, Copy)]
pub struct InvertedHammerDetector {
    pub shadow_factor: f64,
}

impl Default for InvertedHammerDetector {
    fn default() -> Self {
        Self {
            shadow_factor: helpers::SHADOW_BODY_FACTOR,
        }
    }
}

impl PatternDetector for InvertedHammerDetector {
    fn kind(&self) -> PatternKind {
        PatternKind::InvertedHammer
    }

    fn detect<T: OHLCV>(
        &self,
        bars: &[T],
        index: usize,
        contexts: &[MarketContext],
    ) -> Option<PatternMatch> {
        let bar = bars.get(index)?;
        let ctx = contexts.get(index)?;
        if !ctx.trend.is_down() {
            return None;
        }
        if !is_hammer_shape(
            bar,
            bar.upper_shadow(),
            bar.lower_shadow(),
            ctx.avg_body,
            self.shadow_factor,
        ) {
            return None;
        }
        Some(PatternMatch::new(self.kind(), index, Reliability::Medium))
    }

    fn validate_config(&self) -> Result<()> {
        check_positive("shadow_factor", self.shadow_factor)
    }
}

/// Hammer shape after an uptrend
#[derive(Debug, Clone, Copy)]
pub struct HangingManDetector {
    pub shadow_factor: f64,
}

impl Default for HangingManDetector {
    fn default() -> Self {
        Self {
            shadow_factor: helpers::SHADOW_BODY_FACTOR,
        }
    }
}

impl PatternDetector for HangingManDetector {
    fn kind(&self) -> PatternKind {
        PatternKind::HangingMan
    }

    fn detect<T: OHLCV>(
        &self,
        bars: &[T],
        index: usize,
        contexts: &[MarketContext],
    ) -> Option<PatternMatch> {
        let bar = bars.get(index)?;
        let ctx = contexts.get(index)?;
        if !ctx.trend.is_up() {
            return None;
        }
        if !is_hammer_shape(
            bar,
            bar.lower_shadow(),
            bar.upper_shadow(),
            ctx.avg_body,
            self.shadow_factor,
        ) {
            return None;
        }
        Some(PatternMatch::new(self.kind(), index, Reliability::Medium))
    }

    fn validate_config(&self) -> Result<()> {
        check_positive("shadow_factor", self.shadow_factor)
    }
}

/// Inverted hammer shape after an uptrend
#[derive(Debug, Clone, Copy)]
pub struct ShootingStarDetector {
    pub shadow_factor: f64,
    pub strong_shadow_factor: f64,
}

impl Default for ShootingStarDetector {
    fn default() -> Self {
        Self {
            shadow_factor: helpers::SHADOW_BODY_FACTOR,
            strong_shadow_factor: helpers::STRONG_SHADOW_FACTOR,
        }
    }
}

impl PatternDetector for ShootingStarDetector {
    fn kind(&self) -> PatternKind {
        PatternKind::ShootingStar
    }

    fn detect<T: OHLCV>(
        &self,
        bars: &[T],
        index: usize,
        contexts: &[MarketContext],
    ) -> Option<PatternMatch> {
        let bar = bars.get(index)?;
        let ctx = contexts.get(index)?;
        if !ctx.trend.is_up() {
            return None;
        }

        let upper = bar.upper_shadow();
        if !is_hammer_shape(bar, upper, bar.lower_shadow(), ctx.avg_body, self.shadow_factor) {
            return None;
        }

        let reliability = if upper >= bar.body() * self.strong_shadow_factor {
            Reliability::High
        } else {
            Reliability::Medium
        };
        Some(PatternMatch::new(self.kind(), index, reliability))
    }

    fn validate_config(&self) -> Result<()> {
        check_positive("shadow_factor", self.shadow_factor)?;
        check_positive("strong_shadow_factor", self.strong_shadow_factor)
    }
}

// ============================================================
// MARUBOZU
// ============================================================

fn is_marubozu<T: OHLCV>(bar: &T, avg_body: f64, body_factor: f64, min_body_ratio: f64) -> bool {
    let body = bar.body();
    let range = bar.range();
    range > 0.0
        && is_long_body(body, avg_body, range, body_factor)
        && body / range >= min_body_ratio
}

/// Long white body with (almost) no shadows
#[derive(Debug, Clone, Copy)]
pub struct BullishMarubozuDetector {
    pub body_factor: f64,
    pub min_body_ratio: f64,
}

impl Default for BullishMarubozuDetector {
    fn default() -> Self {
        Self {
            body_factor: helpers::LONG_BODY_FACTOR,
            min_body_ratio: helpers::MARUBOZU_BODY_RATIO,
        }
    }
}

impl PatternDetector for BullishMarubozuDetector {
    fn kind(&self) -> PatternKind {
        PatternKind::BullishMarubozu
    }

    fn detect<T: OHLCV>(
        &self,
        bars: &[T],
        index: usize,
        contexts: &[MarketContext],
    ) -> Option<PatternMatch> {
        let bar = bars.get(index)?;
        let ctx = contexts.get(index)?;
        if !bar.is_bullish()
            || !is_marubozu(bar, ctx.avg_body, self.body_factor, self.min_body_ratio)
        {
            return None;
        }
        Some(PatternMatch::new(self.kind(), index, Reliability::Medium))
    }

    fn validate_config(&self) -> Result<()> {
        check_positive("body_factor", self.body_factor)?;
        check_positive("min_body_ratio", self.min_body_ratio)
    }
}

/// Long black body with (almost) no shadows
#[derive(Debug, Clone, Copy)]
pub struct BearishMarubozuDetector {
    pub body_factor: f64,
    pub min_body_ratio: f64,
}

impl Default for BearishMarubozuDetector {
    fn default() -> Self {
        Self {
            body_factor: helpers::LONG_BODY_FACTOR,
            min_body_ratio: helpers::MARUBOZU_BODY_RATIO,
        }
    }
}

impl PatternDetector for BearishMarubozuDetector {
    fn kind(&self) -> PatternKind {
        PatternKind::BearishMarubozu
    }

    fn detect<T: OHLCV>(
        &self,
        bars: &[T],
        index: usize,
        contexts: &[MarketContext],
    ) -> Option<PatternMatch> {
        let bar = bars.get(index)?;
        let ctx = contexts.get(index)?;
        if !bar.is_bearish()
            || !is_marubozu(bar, ctx.avg_body, self.body_factor, self.min_body_ratio)
        {
            return None;
        }
        Some(PatternMatch::new(self.kind(), index, Reliability::Medium))
    }

    fn validate_config(&self) -> Result<()> {
        check_positive("body_factor", self.body_factor)?;
        check_positive("min_body_ratio", self.min_body_ratio)
    }
}
