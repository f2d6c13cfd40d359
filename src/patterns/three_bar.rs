//! Three-bar candlestick pattern detectors
//!
//! Morning/Evening Star, Three White Soldiers, Three Black Crows and
//! Three Inside Up/Down. Reversal formations are gated on the trend before
//! the first candle; soldiers and crows carry their own direction.

use super::helpers::{self, is_long_body, is_small_body, MarketContext, Trend};
use super::{check_positive, PatternDetector, PatternKind, PatternMatch, Reliability};
use crate::{OHLCVExt, Result, OHLCV};

impl_with_defaults!(
    MorningStarDetector,
    EveningStarDetector,
    ThreeWhiteSoldiersDetector,
    ThreeBlackCrowsDetector,
    ThreeInsideUpDetector,
    ThreeInsideDownDetector,
);

/// The three candles, the average body at the last one and the trend before
/// the first one.
struct Triple<'a, T> {
    first: &'a T,
    second: &'a T,
    third: &'a T,
    avg_body: f64,
    trend: Trend,
}

fn triple<'a, T: OHLCV>(
    bars: &'a [T],
    index: usize,
    contexts: &[MarketContext],
) -> Option<Triple<'a, T>> {
    if index < 2 {
        return None;
    }
    Some(Triple {
        first: bars.get(index - 2)?,
        second: bars.get(index - 1)?,
        third: bars.get(index)?,
        avg_body: contexts.get(index)?.avg_body,
        trend: contexts.get(index - 2)?.trend,
    })
}

// ============================================================
// STARS
// ============================================================

/// Long black candle, small-bodied star, white candle closing above the
/// first candle's midpoint
#[derive(Debug, Clone, Copy)]
pub struct MorningStarDetector {
    pub long_body_factor: f64,
    pub star_body_factor: f64,
}

impl Default for MorningStarDetector {
    fn default() -> Self {
        Self {
            long_body_factor: helpers::LONG_BODY_FACTOR,
            star_body_factor: helpers::SMALL_BODY_FACTOR,
        }
    }
}

impl PatternDetector for MorningStarDetector {
    fn kind(&self) -> PatternKind {
        PatternKind::MorningStar
    }

    fn detect<T: OHLCV>(
        &self,
        bars: &[T],
        index: usize,
        contexts: &[MarketContext],
    ) -> Option<PatternMatch> {
        let t = triple(bars, index, contexts)?;
        if !t.trend.is_down() || !t.first.is_bearish() || !t.third.is_bullish() {
            return None;
        }
        if !is_long_body(t.first.body(), t.avg_body, t.first.range(), self.long_body_factor) {
            return None;
        }
        if !is_small_body(t.second.body(), t.avg_body, t.second.range(), self.star_body_factor) {
            return None;
        }
        if t.third.close() <= t.first.body_midpoint() {
            return None;
        }
        Some(PatternMatch::new(self.kind(), index, Reliability::High))
    }

    fn validate_config(&self) -> Result<()> {
        check_positive("long_body_factor", self.long_body_factor)?;
        check_positive("star_body_factor", self.star_body_factor)
    }
}

/// Long white candle, small-bodied star, black candle closing below the
/// first candle's midpoint
#[derive(Debug, Clone, Copy)]
pub struct EveningStarDetector {
    pub long_body_factor: f64,
    pub star_body_factor: f64,
}

impl Default for EveningStarDetector {
    fn default() -> Self {
        Self {
            long_body_factor: helpers::LONG_BODY_FACTOR,
            star_body_factor: helpers::SMALL_BODY_FACTOR,
        }
    }
}

impl PatternDetector for EveningStarDetector {
    fn kind(&self) -> PatternKind {
        PatternKind::EveningStar
    }

    fn detect<T: OHLCV>(
        &self,
        bars: &[T],
        index: usize,
        contexts: &[MarketContext],
    ) -> Option<PatternMatch> {
        let t = triple(bars, index, contexts)?;
        if !t.trend.is_up() || !t.first.is_bullish() || !t.third.is_bearish() {
            return None;
        }
        if !is_long_body(t.first.body(), t.avg_body, t.first.range(), self.long_body_factor) {
            return None;
        }
        if !is_small_body(t.second.body(), t.avg_body, t.second.range(), self.star_body_factor) {
            return None;
        }
        if t.third.close() >= t.first.body_midpoint() {
            return None;
        }
        Some(PatternMatch::new(self.kind(), index, Reliability::High))
    }

    fn validate_config(&self) -> Result<()> {
        check_positive("long_body_factor", self.long_body_factor)?;
        check_positive("star_body_factor", self.star_body_factor)
    }
}

// ============================================================
// SOLDIERS / CROWS
// ============================================================

/// Three rising white candles with substantial bodies and short upper shadows
#[derive(Debug, Clone, Copy)]
pub struct ThreeWhiteSoldiersDetector {
    pub min_body_factor: f64,
    pub max_shadow_ratio: f64,
}

impl Default for ThreeWhiteSoldiersDetector {
    fn default() -> Self {
        Self {
            min_body_factor: helpers::SOLDIER_BODY_FACTOR,
            max_shadow_ratio: 0.3,
        }
    }
}

impl PatternDetector for ThreeWhiteSoldiersDetector {
    fn kind(&self) -> PatternKind {
        PatternKind::ThreeWhiteSoldiers
    }

    fn detect<T: OHLCV>(
        &self,
        bars: &[T],
        index: usize,
        contexts: &[MarketContext],
    ) -> Option<PatternMatch> {
        let t = triple(bars, index, contexts)?;
        let candles = [t.first, t.second, t.third];

        for c in candles {
            if !c.is_bullish()
                || c.body() < t.avg_body * self.min_body_factor
                || c.upper_shadow() > c.body() * self.max_shadow_ratio
            {
                return None;
            }
        }
        for w in candles.windows(2) {
            if w[1].open() <= w[0].open() || w[1].close() <= w[0].close() {
                return None;
            }
        }
        Some(PatternMatch::new(self.kind(), index, Reliability::High))
    }

    fn validate_config(&self) -> Result<()> {
        check_positive("min_body_factor", self.min_body_factor)?;
        check_positive("max_shadow_ratio", self.max_shadow_ratio)
    }
}

/// Three falling black candles with substantial bodies and short lower shadows
#[derive(Debug, Clone, Copy)]
pub struct ThreeBlackCrowsDetector {
    pub min_body_factor: f64,
    pub max_shadow_ratio: f64,
}

impl Default for ThreeBlackCrowsDetector {
    fn default() -> Self {
        Self {
            min_body_factor: helpers::SOLDIER_BODY_FACTOR,
            max_shadow_ratio: 0.3,
        }
    }
}

impl PatternDetector for ThreeBlackCrowsDetector {
    fn kind(&self) -> PatternKind {
        PatternKind::ThreeBlackCrows
    }

    fn detect<T: OHLCV>(
        &self,
        bars: &[T],
        index: usize,
        contexts: &[MarketContext],
    ) -> Option<PatternMatch> {
        let t = triple(bars, index, contexts)?;
        let candles = [t.first, t.second, t.third];

        for c in candles {
            if !c.is_bearish()
                || c.body() < t.avg_body * self.min_body_factor
                || c.lower_shadow() > c.body() * self.max_shadow_ratio
            {
                return None;
            }
        }
        for w in candles.windows(2) {
            if w[1].open() >= w[0].open() || w[1].close() >= w[0].close() {
                return None;
            }
        }
        Some(PatternMatch::new(self.kind(), index, Reliability::High))
    }

    fn validate_config(&self) -> Result<()> {
        check_positive("min_body_factor", self.min_body_factor)?;
        check_positive("max_shadow_ratio", self.max_shadow_ratio)
    }
}

// ============================================================
// THREE INSIDE
// ============================================================

/// Bullish harami confirmed by a white candle closing above the first open
#[derive(Debug, Clone, Copy)]
pub struct ThreeInsideUpDetector {
    pub long_body_factor: f64,
    pub max_body_ratio: f64,
}

impl Default for ThreeInsideUpDetector {
    fn default() -> Self {
        Self {
            long_body_factor: helpers::LONG_BODY_FACTOR,
            max_body_ratio: helpers::SMALL_BODY_FACTOR,
        }
    }
}

impl PatternDetector for ThreeInsideUpDetector {
    fn kind(&self) -> PatternKind {
        PatternKind::ThreeInsideUp
    }

    fn detect<T: OHLCV>(
        &self,
        bars: &[T],
        index: usize,
        contexts: &[MarketContext],
    ) -> Option<PatternMatch> {
        let t = triple(bars, index, contexts)?;
        if !t.trend.is_down() || !t.first.is_bearish() {
            return None;
        }
        if !is_long_body(t.first.body(), t.avg_body, t.first.range(), self.long_body_factor) {
            return None;
        }
        // white harami inside the first body
        if !t.second.is_bullish()
            || t.second.close() > t.first.open()
            || t.second.open() < t.first.close()
            || t.second.body() > t.first.body() * self.max_body_ratio
        {
            return None;
        }
        if !t.third.is_bullish() || t.third.close() <= t.first.open() {
            return None;
        }
        Some(PatternMatch::new(self.kind(), index, Reliability::High))
    }

    fn validate_config(&self) -> Result<()> {
        check_positive("long_body_factor", self.long_body_factor)?;
        check_positive("max_body_ratio", self.max_body_ratio)
    }
}

/// Bearish harami confirmed by a black candle closing below the first open
#[derive(Debug, Clone, Copy)]
pub struct ThreeInsideDownDetector {
    pub long_body_factor: f64,
    pub max_body_ratio: f64,
}

impl Default for ThreeInsideDownDetector {
    fn default() -> Self {
        Self {
            long_body_factor: helpers::LONG_BODY_FACTOR,
            max_body_ratio: helpers::SMALL_BODY_FACTOR,
        }
    }
}

impl PatternDetector for ThreeInsideDownDetector {
    fn kind(&self) -> PatternKind {
        PatternKind::ThreeInsideDown
    }

    fn detect<T: OHLCV>(
        &self,
        bars: &[T],
        index: usize,
        contexts: &[MarketContext],
    ) -> Option<PatternMatch> {
        let t = triple(bars, index, contexts)?;
        if !t.trend.is_up() || !t.first.is_bullish() {
            return None;
        }
        if !is_long_body(t.first.body(), t.avg_body, t.first.range(), self.long_body_factor) {
            return None;
        }
        if !t.second.is_bearish()
            || t.second.close() < t.first.open()
            || t.second.open() > t.first.close()
            || t.second.body() > t.first.body() * self.max_body_ratio
        {
            return None;
        }
        if !t.third.is_bearish() || t.third.close() >= t.first.open() {
            return None;
        }
        Some(PatternMatch::new(self.kind(), index, Reliability::High))
    }

    fn validate_config(&self) -> Result<()> {
        check_positive("long_body_factor", self.long_body_factor)?;
        check_positive("max_body_ratio", self.max_body_ratio)
    }
}
