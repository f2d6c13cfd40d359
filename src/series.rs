//! Option-aware series arithmetic shared by the indicators.
//!
//! Every indicator works on `Vec<Option<f64>>` internally. `None` means
//! "not enough history" and must flow through every combination, so the
//! helpers here make that decision explicit instead of substituting zeros.

use crate::{HistogramPoint, Point, OHLCV};

/// Combine two optional values; `None` if either side is `None`.
#[inline]
pub fn map2(a: Option<f64>, b: Option<f64>, f: impl FnOnce(f64, f64) -> f64) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(f(a, b)),
        _ => None,
    }
}

/// Pointwise [`map2`] over two equally long series.
pub fn zip_with(
    a: &[Option<f64>],
    b: &[Option<f64>],
    f: impl Fn(f64, f64) -> f64,
) -> Vec<Option<f64>> {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(&x, &y)| map2(x, y, &f)).collect()
}

/// Attach bar times to computed values. `values` must be index-aligned with `bars`.
pub fn with_times<T: OHLCV>(bars: &[T], values: Vec<Option<f64>>) -> Vec<Point> {
    debug_assert_eq!(bars.len(), values.len());
    bars.iter()
        .zip(values)
        .map(|(bar, value)| Point::new(bar.time(), value))
        .collect()
}

/// Like [`with_times`], producing sign-tagged histogram points.
pub fn histogram_with_times<T: OHLCV>(bars: &[T], values: Vec<Option<f64>>) -> Vec<HistogramPoint> {
    debug_assert_eq!(bars.len(), values.len());
    bars.iter()
        .zip(values)
        .map(|(bar, value)| HistogramPoint::new(bar.time(), value))
        .collect()
}

/// Strip the times off a line.
pub fn values(points: &[Point]) -> Vec<Option<f64>> {
    points.iter().map(|p| p.value).collect()
}

pub fn closes<T: OHLCV>(bars: &[T]) -> Vec<f64> {
    bars.iter().map(|b| b.close()).collect()
}

/// Simple moving average of a dense series.
///
/// Each window is summed from scratch in index order, so the first value is
/// bit-identical to the seed used by [`ema_of`].
pub fn sma_of(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }
    for i in (period - 1)..values.len() {
        let window = &values[i + 1 - period..=i];
        out[i] = Some(window.iter().sum::<f64>() / period as f64);
    }
    out
}

/// Simple moving average of a sparse series: a window containing any `None`
/// produces `None`.
pub fn sma_of_options(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }
    for i in (period - 1)..values.len() {
        let window = &values[i + 1 - period..=i];
        out[i] = window
            .iter()
            .try_fold(0.0, |acc, v| v.map(|v| acc + v))
            .map(|sum| sum / period as f64);
    }
    out
}

/// Exponential moving average with multiplier `2 / (period + 1)`, seeded by
/// the SMA of the first `period` values.
pub fn ema_of(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut prev = values[..period].iter().sum::<f64>() / period as f64;
    out[period - 1] = Some(prev);

    for i in period..values.len() {
        prev = (values[i] - prev) * k + prev;
        out[i] = Some(prev);
    }
    out
}

/// EMA over the non-null suffix of a sparse series.
///
/// The recurrence starts at the first `Some` and runs over the contiguous
/// run of values that follows it; anything after a later gap stays `None`.
pub fn ema_of_options(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    let Some(start) = values.iter().position(Option::is_some) else {
        return out;
    };

    let run: Vec<f64> = values[start..].iter().map_while(|v| *v).collect();
    for (offset, value) in ema_of(&run, period).into_iter().enumerate() {
        out[start + offset] = value;
    }
    out
}

/// Highest value over `values[end + 1 - period..=end]`.
#[inline]
pub fn highest(values: &[f64], end: usize, period: usize) -> f64 {
    values[end + 1 - period..=end]
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max)
}

/// Lowest value over `values[end + 1 - period..=end]`.
#[inline]
pub fn lowest(values: &[f64], end: usize, period: usize) -> f64 {
    values[end + 1 - period..=end]
        .iter()
        .copied()
        .fold(f64::INFINITY, f64::min)
}

/// Midpoint of the highest high and lowest low over a trailing window.
pub fn donchian_midpoint<T: OHLCV>(bars: &[T], period: usize) -> Vec<Option<f64>> {
    let highs: Vec<f64> = bars.iter().map(|b| b.high()).collect();
    let lows: Vec<f64> = bars.iter().map(|b| b.low()).collect();
    (0..bars.len())
        .map(|i| {
            (period > 0 && i + 1 >= period)
                .then(|| (highest(&highs, i, period) + lowest(&lows, i, period)) / 2.0)
        })
        .collect()
}

/// True range per bar. The first bar has no previous close, so its TR is
/// simply `high - low`.
pub fn true_range<T: OHLCV>(bars: &[T]) -> Vec<f64> {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            let hl = bar.high() - bar.low();
            if i == 0 {
                return hl;
            }
            let prev_close = bars[i - 1].close();
            hl.max((bar.high() - prev_close).abs())
                .max((bar.low() - prev_close).abs())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map2_propagates_none() {
        assert_eq!(map2(Some(3.0), Some(1.0), |a, b| a - b), Some(2.0));
        assert_eq!(map2(None, Some(1.0), |a, b| a - b), None);
        assert_eq!(map2(Some(1.0), None, |a, b| a - b), None);
    }

    #[test]
    fn test_zip_with() {
        let a = [Some(1.0), None, Some(5.0)];
        let b = [Some(2.0), Some(2.0), None];
        assert_eq!(zip_with(&a, &b, |x, y| x + y), vec![Some(3.0), None, None]);
    }

    #[test]
    fn test_sma_of_reference() {
        let out = sma_of(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        assert_eq!(out, vec![None, None, Some(2.0), Some(3.0), Some(4.0)]);
    }

    #[test]
    fn test_sma_of_too_short() {
        assert_eq!(sma_of(&[1.0, 2.0], 3), vec![None, None]);
        assert!(sma_of(&[], 3).is_empty());
    }

    #[test]
    fn test_sma_of_options_skips_windows_with_gaps() {
        let values = [None, Some(2.0), Some(4.0), Some(6.0)];
        assert_eq!(sma_of_options(&values, 2), vec![None, None, Some(3.0), Some(5.0)]);
    }

    #[test]
    fn test_ema_seed_is_sma() {
        let values = [2.0, 4.0, 6.0, 8.0, 10.0];
        let ema = ema_of(&values, 3);
        assert_eq!(ema[2], Some(4.0));
        // k = 0.5: (8 - 4) * 0.5 + 4
        assert_eq!(ema[3], Some(6.0));
        assert_eq!(ema[4], Some(8.0));
    }

    #[test]
    fn test_ema_of_options_starts_at_first_value() {
        let values = [None, None, Some(1.0), Some(2.0), Some(3.0)];
        let ema = ema_of_options(&values, 2);
        assert_eq!(ema[..3], [None, None, None]);
        assert_eq!(ema[3], Some(1.5));
        assert!(ema[4].is_some());
    }

    #[test]
    fn test_ema_of_options_stops_at_gap() {
        let values = [Some(1.0), Some(2.0), None, Some(3.0)];
        let ema = ema_of_options(&values, 1);
        assert_eq!(ema, vec![Some(1.0), Some(2.0), None, None]);
    }

    #[test]
    fn test_highest_lowest() {
        let values = [3.0, 9.0, 1.0, 4.0];
        assert_eq!(highest(&values, 3, 3), 9.0);
        assert_eq!(lowest(&values, 3, 2), 1.0);
    }
}
