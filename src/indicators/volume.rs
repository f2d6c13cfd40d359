//! On-Balance Volume.

use crate::{series, Point, OHLCV};

/// On-Balance Volume, seeded with the first bar's volume.
///
/// Bars without volume contribute `0`.
pub fn obv<T: OHLCV>(bars: &[T]) -> Vec<Point> {
    series::with_times(bars, obv_of(bars))
}

pub(crate) fn obv_of<T: OHLCV>(bars: &[T]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(bars.len());
    let Some(first) = bars.first() else {
        return out;
    };

    let mut running = first.volume().unwrap_or(0.0);
    out.push(Some(running));

    for pair in bars.windows(2) {
        let volume = pair[1].volume().unwrap_or(0.0);
        if pair[1].close() > pair[0].close() {
            running += volume;
        } else if pair[1].close() < pair[0].close() {
            running -= volume;
        }
        out.push(Some(running));
    }
    out
}
