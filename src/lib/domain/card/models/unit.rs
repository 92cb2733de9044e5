//! Small bounded-numeric newtypes used throughout the card and pipeline models.
//!
//! A fallible constructor keeps an out-of-range value from ever existing,
//! instead of asserting deep inside a computation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
#[error("value {0} is outside the closed interval [0, 1]")]
pub struct OutOfUnitInterval(pub f64);

/// A floating-point value constrained to the closed interval `[0, 1]`.
///
/// Used for every confidence, score, and ratio field in the data model.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct UnitInterval(f64);

impl UnitInterval {
    pub fn new(value: f64) -> Result<Self, OutOfUnitInterval> {
        if value.is_finite() && (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(OutOfUnitInterval(value))
        }
    }

    /// Clamps `value` into `[0, 1]`, for computed scores where the formula
    /// may overshoot slightly due to floating-point error.
    pub fn clamp(value: f64) -> Self {
        Self(value.clamp(0.0, 1.0))
    }

    pub fn get(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for UnitInterval {
    type Error = OutOfUnitInterval;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UnitInterval> for f64 {
    fn from(value: UnitInterval) -> Self {
        value.0
    }
}

#[derive(Debug, Error, PartialEq)]
#[error("value {0} is negative")]
pub struct NegativeUsd(pub f64);

/// A USD amount constrained to be non-negative and finite.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct NonNegativeUsd(f64);

impl NonNegativeUsd {
    pub fn new(value: f64) -> Result<Self, NegativeUsd> {
        if value.is_finite() && value >= 0.0 {
            Ok(Self(value))
        } else {
            Err(NegativeUsd(value))
        }
    }

    pub const ZERO: NonNegativeUsd = NonNegativeUsd(0.0);

    pub fn get(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for NonNegativeUsd {
    type Error = NegativeUsd;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<NonNegativeUsd> for f64 {
    fn from(value: NonNegativeUsd) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range() {
        assert!(UnitInterval::new(1.1).is_err());
        assert!(UnitInterval::new(-0.01).is_err());
        assert!(UnitInterval::new(f64::NAN).is_err());
    }

    #[test]
    fn accepts_boundary_values() {
        assert!(UnitInterval::new(0.0).is_ok());
        assert!(UnitInterval::new(1.0).is_ok());
    }

    #[test]
    fn clamp_never_panics_on_overshoot() {
        assert_eq!(UnitInterval::clamp(1.2).get(), 1.0);
        assert_eq!(UnitInterval::clamp(-0.2).get(), 0.0);
    }

    #[test]
    fn rejects_negative_usd() {
        assert!(NonNegativeUsd::new(-1.0).is_err());
        assert!(NonNegativeUsd::new(0.0).is_ok());
    }
}
