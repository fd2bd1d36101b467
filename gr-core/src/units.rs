//! Type-safe wrappers for replay units
//!
//! Both units serialize with 3 decimal places to keep render payloads small.

use serde::{Deserialize, Serialize};

/// Round f64 to 3 decimal places for compact JSON serialization
fn round3<S: serde::Serializer>(val: &f64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64((*val * 1000.0).round() / 1000.0)
}

/// Seconds since the start of the session
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Seconds(#[serde(serialize_with = "round3")] pub f64);

impl Seconds {
    /// Whole seconds, truncated towards zero. Negative and non-finite values
    /// collapse to zero.
    pub fn whole(&self) -> u64 {
        if self.0.is_finite() && self.0 > 0.0 {
            self.0.floor() as u64
        } else {
            0
        }
    }
}

/// Kilometers per hour
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct KilometersPerHour(#[serde(serialize_with = "round3")] pub f64);

impl KilometersPerHour {
    pub fn from_meters_per_second(ms: f64) -> Self {
        Self(ms * 3.6)
    }

    /// Speed rounded to the nearest whole km/h for display
    pub fn rounded(&self) -> i64 {
        self.0.round() as i64
    }
}
