//! Indicator parameter descriptions.
//!
//! Every indicator parameter struct exposes a static table of [`ParamMeta`]
//! through [`ParameterizedIndicator`]. Hosts use it to render settings
//! forms, to sweep parameter grids and to turn loosely-typed records
//! (`{"period": 21}`) into validated parameter structs.
//!
//! # Example
//!
//! ```rust
//! use std::collections::HashMap;
//!
//! use chartsense::params::ParameterizedIndicator;
//! use chartsense::prelude::*;
//!
//! for param in MacdParams::param_meta() {
//!     println!("{}: {:?} (default: {})", param.name, param.param_type, param.default);
//! }
//!
//! let mut raw = HashMap::new();
//! raw.insert("fast", 8.0);
//! let params = MacdParams::with_params(&raw).unwrap();
//! assert_eq!(params.fast.get(), 8);
//! assert_eq!(params.slow.get(), 26);
//! ```

use std::collections::HashMap;

use crate::{Period, Result, TaError};

// ============================================================
// PARAMETER TYPES
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
  /// Window length in bars
  Period,
  /// Any finite number (band multipliers, oscillator levels)
  Value,
}

#[derive(Debug, Clone)]
pub struct ParamMeta {
  /// Key used in parameter records (e.g. "period")
  pub name: &'static str,
  pub param_type: ParamType,
  pub default: f64,
  /// Sweep range: (min, max, step)
  pub range: (f64, f64, f64),
  pub description: &'static str,
}

impl ParamMeta {
  pub const fn period(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Period, default, range, description }
  }

  pub const fn value(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Value, default, range, description }
  }

  /// Values from `min` to `max` inclusive, `step` apart.
  ///
  /// Each value is computed as `min + k * step` so long sweeps do not
  /// accumulate rounding drift.
  pub fn grid(&self) -> impl Iterator<Item = f64> {
    let (min, max, step) = self.range;
    let count = if step > 0.0 && max >= min {
      ((max - min) / step + 1e-9).floor() as usize + 1
    } else {
      1
    };
    (0..count).map(move |k| min + k as f64 * step)
  }

  pub fn validate(&self, value: f64) -> Result<()> {
    if !value.is_finite() {
      return Err(TaError::InvalidValue("Parameter must be finite"));
    }
    let (min, max, _) = self.range;
    if value < min || value > max {
      return Err(TaError::OutOfRange { field: self.name, value, min, max });
    }
    if self.param_type == ParamType::Period && value.fract() != 0.0 {
      return Err(TaError::InvalidValue("Period must be a positive integer"));
    }
    Ok(())
  }
}

// ============================================================
// PARAMETERIZED INDICATOR TRAIT
// ============================================================

/// Parameter struct of one indicator.
pub trait ParameterizedIndicator: Sized {
  fn param_meta() -> &'static [ParamMeta];

  /// Build the struct from a loose record. Missing keys take their
  /// defaults; present but invalid values are rejected.
  fn with_params(params: &HashMap<&str, f64>) -> Result<Self>;

  /// Short display name, e.g. "RSI"
  fn indicator_id() -> &'static str;

  /// The record [`Self::with_params`] would fill in for an empty input.
  fn default_record() -> HashMap<&'static str, f64> {
    Self::param_meta().iter().map(|m| (m.name, m.default)).collect()
  }
}

// ============================================================
// RECORD LOOKUPS
// ============================================================

/// Read a window length, falling back to `default` when the key is absent.
pub fn get_period(params: &HashMap<&str, f64>, key: &str, default: usize) -> Result<Period> {
  let Some(&value) = params.get(key) else {
    return Period::new(default);
  };
  if !value.is_finite() || value < 1.0 || value.fract() != 0.0 {
    return Err(TaError::InvalidValue("Period must be a positive integer"));
  }
  Period::new(value as usize)
}

/// Read a finite number, falling back to `default` when the key is absent.
pub fn get_value(params: &HashMap<&str, f64>, key: &str, default: f64) -> Result<f64> {
  let value = params.get(key).copied().unwrap_or(default);
  if !value.is_finite() {
    return Err(TaError::InvalidValue("Parameter must be finite"));
  }
  Ok(value)
}
