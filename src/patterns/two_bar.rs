//! Two-bar candlestick pattern detectors
//!
//! Engulfing, Harami, Piercing Line, Dark Cloud Cover and Tweezers. The trend
//! gate is evaluated at the first of the two candles.

use super::helpers::{self, is_long_body, is_near, MarketContext};
use super::{check_positive, PatternDetector, PatternKind, PatternMatch, Reliability};
use crate::{OHLCVExt, Result, OHLCV};

impl_with_defaults!(
    BullishEngulfingDetector,
    BearishEngulfingDetector,
    BullishHaramiDetector,
    BearishHaramiDetector,
    PiercingLineDetector,
    DarkCloudCoverDetector,
    TweezerBottomDetector,
    TweezerTopDetector,
);

/// Previous bar, current bar, average body at the current bar and the trend
/// before the previous bar.
fn pair<'a, T: OHLCV>(
    bars: &'a [T],
    index: usize,
    contexts: &[MarketContext],
) -> Option<(&'a T, &'a T, f64, helpers::Trend)> {
    if index < 1 {
        return None;
    }
    let prev = bars.get(index - 1)?;
    let curr = bars.get(index)?;
    let avg_body = contexts.get(index)?.avg_body;
    let trend = contexts.get(index - 1)?.trend;
    Some((prev, curr, avg_body, trend))
}

// ============================================================
// ENGULFING
// ============================================================

/// White body engulfing the previous black body after a downtrend
#[derive(Debug, Clone, Copy, Default)]
pub struct BullishEngulfingDetector;

impl PatternDetector for BullishEngulfingDetector {
    fn kind(&self) -> PatternKind {
        PatternKind::BullishEngulfing
    }

    fn detect<T: OHLCV>(
        &self,
        bars: &[T],
        index: usize,
        contexts: &[MarketContext],
    ) -> Option<PatternMatch> {
        let (prev, curr, _, trend) = pair(bars, index, contexts)?;
        if !trend.is_down() || !prev.is_bearish() || !curr.is_bullish() {
            return None;
        }
        if curr.open() > prev.close() || curr.close() < prev.open() || curr.body() <= prev.body() {
            return None;
        }
        Some(PatternMatch::new(self.kind(), index, Reliability::High))
    }
}

/// Black body engulfing the previous white body after an uptrend
#[derive(Debug, Clone, Copy, Default)]
pub struct BearishEngulfingDetector;

impl PatternDetector for BearishEngulfingDetector {
    fn kind(&self) -> PatternKind {
        PatternKind::BearishEngulfing
    }

    fn detect<T: OHLCV>(
        &self,
        bars: &[T],
        index: usize,
        contexts: &[MarketContext],
    ) -> Option<PatternMatch> {
        let (prev, curr, _, trend) = pair(bars, index, contexts)?;
        if !trend.is_up() || !prev.is_bullish() || !curr.is_bearish() {
            return None;
        }
        if curr.open() < prev.close() || curr.close() > prev.open() || curr.body() <= prev.body() {
            return None;
        }
        Some(PatternMatch::new(self.kind(), index, Reliability::High))
    }
}

// ============================================================
// HARAMI
// ============================================================

/// Small body inside a long black body after a downtrend
#[derive(Debug, Clone, Copy)]
pub struct BullishHaramiDetector {
    pub long_body_factor: f64,
    pub max_body_ratio: f64,
}

impl Default for BullishHaramiDetector {
    fn default() -> Self {
        Self {
            long_body_factor: helpers::LONG_BODY_FACTOR,
            max_body_ratio: helpers::SMALL_BODY_FACTOR,
        }
    }
}

impl PatternDetector for BullishHaramiDetector {
    fn kind(&self) -> PatternKind {
        PatternKind::BullishHarami
    }

    fn detect<T: OHLCV>(
        &self,
        bars: &[T],
        index: usize,
        contexts: &[MarketContext],
    ) -> Option<PatternMatch> {
        let (prev, curr, avg_body, trend) = pair(bars, index, contexts)?;
        if !trend.is_down() || !prev.is_bearish() {
            return None;
        }
        if !is_long_body(prev.body(), avg_body, prev.range(), self.long_body_factor) {
            return None;
        }
        if curr.body_top() > prev.open()
            || curr.body_bottom() < prev.close()
            || curr.body() > prev.body() * self.max_body_ratio
        {
            return None;
        }
        Some(PatternMatch::new(self.kind(), index, Reliability::Medium))
    }

    fn validate_config(&self) -> Result<()> {
        check_positive("long_body_factor", self.long_body_factor)?;
        check_positive("max_body_ratio", self.max_body_ratio)
    }
}

/// Small body inside a long white body after an uptrend
#[derive(Debug, Clone, Copy)]
pub struct BearishHaramiDetector {
    pub long_body_factor: f64,
    pub max_body_ratio: f64,
}

impl Default for BearishHaramiDetector {
    fn default() -> Self {
        Self {
            long_body_factor: helpers::LONG_BODY_FACTOR,
            max_body_ratio: helpers::SMALL_BODY_FACTOR,
        }
    }
}

impl PatternDetector for BearishHaramiDetector {
    fn kind(&self) -> PatternKind {
        PatternKind::BearishHarami
    }

    fn detect<T: OHLCV>(
        &self,
        bars: &[T],
        index: usize,
        contexts: &[MarketContext],
    ) -> Option<PatternMatch> {
        let (prev, curr, avg_body, trend) = pair(bars, index, contexts)?;
        if !trend.is_up() || !prev.is_bullish() {
            return None;
        }
        if !is_long_body(prev.body(), avg_body, prev.range(), self.long_body_factor) {
            return None;
        }
        if curr.body_top() > prev.close()
            || curr.body_bottom() < prev.open()
            || curr.body() > prev.body() * self.max_body_ratio
        {
            return None;
        }
        Some(PatternMatch::new(self.kind(), index, Reliability::Medium))
    }

    fn validate_config(&self) -> Result<()> {
        check_positive("long_body_factor", self.long_body_factor)?;
        check_positive("max_body_ratio", self.max_body_ratio)
    }
}

// ============================================================
// PIERCING LINE / DARK CLOUD COVER
// ============================================================

/// White candle opening below the prior close and closing above the midpoint
/// of the prior long black body
#[derive(Debug, Clone, Copy)]
pub struct PiercingLineDetector {
    pub long_body_factor: f64,
}

impl Default for PiercingLineDetector {
    fn default() -> Self {
        Self {
            long_body_factor: helpers::LONG_BODY_FACTOR,
        }
    }
}

impl PatternDetector for PiercingLineDetector {
    fn kind(&self) -> PatternKind {
        PatternKind::PiercingLine
    }

    fn detect<T: OHLCV>(
        &self,
        bars: &[T],
        index: usize,
        contexts: &[MarketContext],
    ) -> Option<PatternMatch> {
        let (prev, curr, avg_body, trend) = pair(bars, index, contexts)?;
        if !trend.is_down() || !prev.is_bearish() || !curr.is_bullish() {
            return None;
        }
        if !is_long_body(prev.body(), avg_body, prev.range(), self.long_body_factor) {
            return None;
        }
        if curr.open() >= prev.close()
            || curr.close() <= prev.body_midpoint()
            || curr.close() >= prev.open()
        {
            return None;
        }
        Some(PatternMatch::new(self.kind(), index, Reliability::Medium))
    }

    fn validate_config(&self) -> Result<()> {
        check_positive("long_body_factor", self.long_body_factor)
    }
}

/// Black candle opening above the prior close and closing below the midpoint
/// of the prior long white body
#[derive(Debug, Clone, Copy)]
pub struct DarkCloudCoverDetector {
    pub long_body_factor: f64,
}

impl Default for DarkCloudCoverDetector {
    fn default() -> Self {
        Self {
            long_body_factor: helpers::LONG_BODY_FACTOR,
        }
    }
}

impl PatternDetector for DarkCloudCoverDetector {
    fn kind(&self) -> PatternKind {
        PatternKind::DarkCloudCover
    }

    fn detect<T: OHLCV>(
        &self,
        bars: &[T],
        index: usize,
        contexts: &[MarketContext],
    ) -> Option<PatternMatch> {
        let (prev, curr, avg_body, trend) = pair(bars, index, contexts)?;
        if !trend.is_up() || !prev.is_bullish() || !curr.is_bearish() {
            return None;
        }
        if !is_long_body(prev.body(), avg_body, prev.range(), self.long_body_factor) {
            return None;
        }
        if curr.open() <= prev.close()
            || curr.close() >= prev.body_midpoint()
            || curr.close() <= prev.open()
        {
            return None;
        }
        Some(PatternMatch::new(self.kind(), index, Reliability::Medium))
    }

    fn validate_config(&self) -> Result<()> {
        check_positive("long_body_factor", self.long_body_factor)
    }
}

// ============================================================
// TWEEZERS
// ============================================================

/// Black then white candle with matching lows after a downtrend
#[derive(Debug, Clone, Copy)]
pub struct TweezerBottomDetector {
    pub tolerance_factor: f64,
}

impl Default for TweezerBottomDetector {
    fn default() -> Self {
        Self {
            tolerance_factor: helpers::EQUAL_PRICE_FACTOR,
        }
    }
}

impl PatternDetector for TweezerBottomDetector {
    fn kind(&self) -> PatternKind {
        PatternKind::TweezerBottom
    }

    fn detect<T: OHLCV>(
        &self,
        bars: &[T],
        index: usize,
        contexts: &[MarketContext],
    ) -> Option<PatternMatch> {
        let (prev, curr, avg_body, trend) = pair(bars, index, contexts)?;
        if !trend.is_down() || !prev.is_bearish() || !curr.is_bullish() {
            return None;
        }
        if !is_near(prev.low(), curr.low(), avg_body, self.tolerance_factor) {
            return None;
        }
        Some(PatternMatch::new(self.kind(), index, Reliability::Medium))
    }

    fn validate_config(&self) -> Result<()> {
        check_positive("tolerance_factor", self.tolerance_factor)
    }
}

/// White then black candle with matching highs after an uptrend
#[derive(Debug, Clone, Copy)]
pub struct TweezerTopDetector {
    pub tolerance_factor: f64,
}

impl Default for TweezerTopDetector {
    fn default() -> Self {
        Self {
            tolerance_factor: helpers::EQUAL_PRICE_FACTOR,
        }
    }
}

impl PatternDetector for TweezerTopDetector {
    fn kind(&self) -> PatternKind {
        PatternKind::TweezerTop
    }

    fn detect<T: OHLCV>(
        &self,
        bars: &[T],
        index: usize,
        contexts: &[MarketContext],
    ) -> Option<PatternMatch> {
        let (prev, curr, avg_body, trend) = pair(bars, index, contexts)?;
        if !trend.is_up() || !prev.is_bullish() || !curr.is_bearish() {
            return None;
        }
        if !is_near(prev.high(), curr.high(), avg_body, self.tolerance_factor) {
            return None;
        }
        Some(PatternMatch::new(self.kind(), index, Reliability::Medium))
    }

    fn validate_config(&self) -> Result<()> {
        check_positive("tolerance_factor", self.tolerance_factor)
    }
}
