//! Tunable detector settings
//!
//! Each window detector publishes a table of [`ParamMeta`] rows: the key a
//! settings panel or a config file uses, the accepted bounds and the slider
//! step. [`ParameterizedDetector::with_params`] builds a detector from
//! loosely-typed `key -> f64` input, checked against that table.
//!
//! ```rust
//! use std::collections::HashMap;
//! use kline_ta::params::ParameterizedDetector;
//! use kline_ta::prelude::*;
//!
//! let mut values = HashMap::new();
//! values.insert("leg_tolerance", 0.1);
//! let detector = HarmonicDetector::with_params(&values).unwrap();
//! assert_eq!(detector.leg_tolerance.get(), 0.1);
//!
//! values.insert("leg_tolerence", 0.1);
//! assert!(HarmonicDetector::with_params(&values).is_err());
//! ```

use std::collections::HashMap;

use crate::{AnalysisError, DetectorId, Period, Ratio, Result};

/// Value domain of a setting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
  /// Fraction in `0.0..=1.0`
  Ratio,
  /// Bar count, a positive integer
  Period,
}

/// One row of a detector's settings table
#[derive(Debug, Clone)]
pub struct ParamMeta {
  pub name: &'static str,
  pub param_type: ParamType,
  pub default: f64,
  pub min: f64,
  pub max: f64,
  /// Slider increment
  pub step: f64,
  pub description: &'static str,
}

impl ParamMeta {
  pub const fn ratio(
    name: &'static str,
    default: f64,
    (min, max, step): (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Ratio, default, min, max, step, description }
  }

  pub const fn period(
    name: &'static str,
    default: f64,
    (min, max, step): (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Period, default, min, max, step, description }
  }

  /// Bounds first, then the domain of the type.
  pub fn validate(&self, value: f64) -> Result<()> {
    if !(self.min..=self.max).contains(&value) {
      return Err(AnalysisError::OutOfRange {
        field: self.name,
        value,
        min: self.min,
        max: self.max,
      });
    }
    match self.param_type {
      ParamType::Ratio => Ratio::new(value).map(drop),
      ParamType::Period if value.fract() != 0.0 => {
        Err(AnalysisError::InvalidValue("Period must be a positive integer"))
      },
      ParamType::Period => Ok(()),
    }
  }
}

/// A detector that can be built from a settings table
pub trait ParameterizedDetector: Sized {
  fn param_meta() -> &'static [ParamMeta];

  /// Keys left out keep the detector's default.
  fn with_params(params: &HashMap<&str, f64>) -> Result<Self>;

  fn detector_id() -> DetectorId;

  /// Reject unknown keys and out-of-bounds values.
  fn check_params(params: &HashMap<&str, f64>) -> Result<()> {
    for (&key, &value) in params {
      let meta = Self::param_meta()
        .iter()
        .find(|m| m.name == key)
        .ok_or_else(|| AnalysisError::InvalidConfig(format!("unknown parameter `{key}`")))?;
      meta.validate(value)?;
    }
    Ok(())
  }
}

pub fn get_ratio(params: &HashMap<&str, f64>, key: &str, default: f64) -> Result<Ratio> {
  Ratio::new(params.get(key).copied().unwrap_or(default))
}

pub fn get_period(params: &HashMap<&str, f64>, key: &str, default: usize) -> Result<Period> {
  let value = params.get(key).copied().unwrap_or(default as f64);
  if value < 0.0 || value.fract() != 0.0 {
    return Err(AnalysisError::InvalidValue("Period must be a positive integer"));
  }
  Period::new(value as usize)
}
