//! Trend indicators: ADX with +DI/-DI and the Ichimoku cloud.

use std::collections::HashMap;

use crate::{
    params::{get_period, ParamMeta, ParameterizedIndicator},
    series, Period, Point, Result, TaError, OHLCV,
};

// ============================================================
// ADX
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AdxParams {
    pub period: Period,
}

impl Default for AdxParams {
    fn default() -> Self {
        Self {
            period: Period::new_const(14),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AdxResult {
    pub adx: Vec<Point>,
    pub plus_di: Vec<Point>,
    pub minus_di: Vec<Point>,
}

pub(crate) struct AdxLines {
    pub adx: Vec<Option<f64>>,
    pub plus_di: Vec<Option<f64>>,
    pub minus_di: Vec<Option<f64>>,
}

/// Average Directional Index with the directional indicators.
///
/// +DI/-DI start at index `period`; ADX starts at `2 * period - 1` as the
/// plain mean of the first `period` DX values and is Wilder-smoothed after.
pub fn adx<T: OHLCV>(bars: &[T], params: &AdxParams) -> AdxResult {
    let lines = adx_lines(bars, params.period.get());
    AdxResult {
        adx: series::with_times(bars, lines.adx),
        plus_di: series::with_times(bars, lines.plus_di),
        minus_di: series::with_times(bars, lines.minus_di),
    }
}

pub(crate) fn adx_lines<T: OHLCV>(bars: &[T], period: usize) -> AdxLines {
    let n = bars.len();
    let mut lines = AdxLines {
        adx: vec![None; n],
        plus_di: vec![None; n],
        minus_di: vec![None; n],
    };
    if period == 0 || n <= period {
        return lines;
    }

    let tr = series::true_range(bars);
    let (plus_dm, minus_dm) = directional_movement(bars);
    let p = period as f64;

    let mut s_tr: f64 = tr[1..=period].iter().sum();
    let mut s_plus: f64 = plus_dm[1..=period].iter().sum();
    let mut s_minus: f64 = minus_dm[1..=period].iter().sum();
    let mut dx = vec![0.0; n];

    for i in period..n {
        if i > period {
            s_tr = s_tr - s_tr / p + tr[i];
            s_plus = s_plus - s_plus / p + plus_dm[i];
            s_minus = s_minus - s_minus / p + minus_dm[i];
        }

        let (pdi, mdi) = if s_tr == 0.0 {
            (0.0, 0.0)
        } else {
            (100.0 * s_plus / s_tr, 100.0 * s_minus / s_tr)
        };
        lines.plus_di[i] = Some(pdi);
        lines.minus_di[i] = Some(mdi);

        let sum = pdi + mdi;
        dx[i] = if sum == 0.0 {
            0.0
        } else {
            100.0 * (pdi - mdi).abs() / sum
        };
    }

    let first = 2 * period - 1;
    if n > first {
        let mut prev = dx[period..=first].iter().sum::<f64>() / p;
        lines.adx[first] = Some(prev);
        for i in (first + 1)..n {
            prev = (prev * (p - 1.0) + dx[i]) / p;
            lines.adx[i] = Some(prev);
        }
    }

    lines
}

/// +DM/-DM per bar: the larger of the up/down move, when positive; the
/// other side is zero. Index 0 has no movement.
fn directional_movement<T: OHLCV>(bars: &[T]) -> (Vec<f64>, Vec<f64>) {
    let mut plus = vec![0.0; bars.len()];
    let mut minus = vec![0.0; bars.len()];
    for i in 1..bars.len() {
        let up = bars[i].high() - bars[i - 1].high();
        let down = bars[i - 1].low() - bars[i].low();
        if up > down && up > 0.0 {
            plus[i] = up;
        }
        if down > up && down > 0.0 {
            minus[i] = down;
        }
    }
    (plus, minus)
}

// ============================================================
// ICHIMOKU
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct IchimokuParams {
    pub tenkan: Period,
    pub kijun: Period,
    pub senkou_b: Period,
}

impl Default for IchimokuParams {
    fn default() -> Self {
        Self {
            tenkan: Period::new_const(9),
            kijun: Period::new_const(26),
            senkou_b: Period::new_const(52),
        }
    }
}

impl IchimokuParams {
    pub fn validate(&self) -> Result<()> {
        if self.tenkan > self.kijun || self.kijun > self.senkou_b {
            return Err(TaError::InvalidConfig(format!(
                "Ichimoku periods must satisfy tenkan <= kijun <= senkou_b, got {}/{}/{}",
                self.tenkan, self.kijun, self.senkou_b
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct IchimokuResult {
    pub tenkan: Vec<Point>,
    pub kijun: Vec<Point>,
    pub senkou_a: Vec<Point>,
    pub senkou_b: Vec<Point>,
    pub chikou: Vec<Point>,
}

/// Ichimoku Kinko Hyo lines.
///
/// Values are kept at the bar they are computed from: senkou spans are not
/// shifted forward and chikou is not shifted back. Renderers apply the
/// displacement.
pub fn ichimoku<T: OHLCV>(bars: &[T], params: &IchimokuParams) -> IchimokuResult {
    let tenkan = series::donchian_midpoint(bars, params.tenkan.get());
    let kijun = series::donchian_midpoint(bars, params.kijun.get());
    let senkou_a = series::zip_with(&tenkan, &kijun, |t, k| (t + k) / 2.0);
    let senkou_b = series::donchian_midpoint(bars, params.senkou_b.get());
    let chikou = bars.iter().map(|b| Some(b.close())).collect();

    IchimokuResult {
        tenkan: series::with_times(bars, tenkan),
        kijun: series::with_times(bars, kijun),
        senkou_a: series::with_times(bars, senkou_a),
        senkou_b: series::with_times(bars, senkou_b),
        chikou: series::with_times(bars, chikou),
    }
}

// ============================================================
// PARAMETER METADATA
// ============================================================

static ADX_PARAMS: &[ParamMeta] = &[ParamMeta::period(
    "period",
    14.0,
    (7.0, 30.0, 1.0),
    "Directional movement smoothing length",
)];

static ICHIMOKU_PARAMS: &[ParamMeta] = &[
    ParamMeta::period("tenkan", 9.0, (5.0, 20.0, 1.0), "Conversion line window"),
    ParamMeta::period("kijun", 26.0, (20.0, 40.0, 1.0), "Base line window"),
    ParamMeta::period("senkou_b", 52.0, (40.0, 120.0, 2.0), "Leading span B window"),
];

impl ParameterizedIndicator for AdxParams {
    fn param_meta() -> &'static [ParamMeta] {
        ADX_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            period: get_period(params, "period", 14)?,
        })
    }

    fn indicator_id() -> &'static str {
        "ADX"
    }
}

impl ParameterizedIndicator for IchimokuParams {
    fn param_meta() -> &'static [ParamMeta] {
        ICHIMOKU_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        let parsed = Self {
            tenkan: get_period(params, "tenkan", 9)?,
            kijun: get_period(params, "kijun", 26)?,
            senkou_b: get_period(params, "senkou_b", 52)?,
        };
        parsed.validate()?;
        Ok(parsed)
    }

    fn indicator_id() -> &'static str {
        "ICHIMOKU"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Bar;

    fn rising_bars(n: usize) -> Vec<Bar> {
        (0..n)
            .map(|i| {
                let base = 50.0 + i as f64;
                Bar::new(i as i64, base, base + 1.0, base - 1.0, base + 0.5)
            })
            .collect()
    }

    #[test]
    fn test_adx_warmup_indices() {
        let bars = rising_bars(40);
        let out = adx(&bars, &AdxParams::default());
        assert!(out.plus_di[13].value.is_none());
        assert!(out.plus_di[14].value.is_some());
        assert!(out.adx[26].value.is_none());
        assert!(out.adx[27].value.is_some());
    }

    #[test]
    fn test_adx_steady_uptrend() {
        let bars = rising_bars(60);
        let out = adx(&bars, &AdxParams::default());
        // every bar moves +1 up with no down move: -DM is always zero
        assert_eq!(out.minus_di[59].value, Some(0.0));
        assert!(out.plus_di[59].value.unwrap() > 0.0);
        assert!((out.adx[59].value.unwrap() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_adx_flat_market_sentinels() {
        let bars: Vec<Bar> = (0..40).map(|i| Bar::new(i as i64, 5.0, 5.0, 5.0, 5.0)).collect();
        let out = adx(&bars, &AdxParams::default());
        assert_eq!(out.plus_di[20].value, Some(0.0));
        assert_eq!(out.adx[39].value, Some(0.0));
    }

    #[test]
    fn test_adx_short_history() {
        let bars = rising_bars(10);
        let out = adx(&bars, &AdxParams::default());
        assert_eq!(out.adx.len(), 10);
        assert!(out.adx.iter().all(|p| p.value.is_none()));
        assert!(out.plus_di.iter().all(|p| p.value.is_none()));
    }

    #[test]
    fn test_ichimoku_lines_are_unshifted() {
        let bars = rising_bars(60);
        let out = ichimoku(&bars, &IchimokuParams::default());

        assert!(out.tenkan[7].value.is_none());
        // window 0..=8: highest high 59, lowest low 49
        assert_eq!(out.tenkan[8].value, Some(54.0));
        assert!(out.kijun[24].value.is_none());
        assert!(out.senkou_a[25].value.is_some());
        assert!(out.senkou_b[50].value.is_none());
        assert!(out.senkou_b[51].value.is_some());
        for (p, bar) in out.chikou.iter().zip(&bars) {
            assert_eq!(p.value, Some(bar.close));
        }
    }

    #[test]
    fn test_ichimoku_senkou_a_is_mean_of_tenkan_kijun() {
        let bars = rising_bars(40);
        let out = ichimoku(&bars, &IchimokuParams::default());
        let t = out.tenkan[30].value.unwrap();
        let k = out.kijun[30].value.unwrap();
        assert_eq!(out.senkou_a[30].value, Some((t + k) / 2.0));
    }

    #[test]
    fn test_ichimoku_params_validation() {
        let params = IchimokuParams {
            tenkan: Period::new_const(30),
            ..Default::default()
        };
        assert!(params.validate().is_err());
        assert!(IchimokuParams::default().validate().is_ok());
    }
}
