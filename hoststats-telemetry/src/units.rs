//! Reporting units and rounding helpers.

use serde::{Deserialize, Serialize};
use std::fmt;

const BYTES_PER_GB: f64 = 1_000_000_000.0;

/// Unit in which byte quantities are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    /// Raw byte counts
    Bytes,
    /// Decimal gigabytes rounded to 2 places
    #[default]
    Gigabytes,
}

impl Unit {
    /// Pick the unit from the `asbytes` switch.
    pub fn from_as_bytes(as_bytes: bool) -> Self {
        if as_bytes {
            Unit::Bytes
        } else {
            Unit::Gigabytes
        }
    }

    /// Convert a byte count into this unit.
    pub fn convert(self, bytes: f64) -> f64 {
        match self {
            Unit::Bytes => bytes,
            Unit::Gigabytes => to_gb(bytes),
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unit::Bytes => write!(f, "bytes"),
            Unit::Gigabytes => write!(f, "GB"),
        }
    }
}

/// Turn bytes into GB and round to 2 decimal places.
pub fn to_gb(bytes: f64) -> f64 {
    round_to(bytes / BYTES_PER_GB, 2)
}

/// Round `value` to `decimals` decimal places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// `part / total * 100`, rounded, or 0 when `total` is zero.
pub fn percent_of(part: f64, total: f64, decimals: i32) -> f64 {
    if total > 0.0 {
        round_to(part / total * 100.0, decimals)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_gb_rounds_to_two_places() {
        assert_eq!(to_gb(0.0), 0.0);
        assert_eq!(to_gb(100_000_000_000.0), 100.0);
        assert_eq!(to_gb(1_234_567_890.0), 1.23);
        assert_eq!(to_gb(4_999_999.0), 0.0);
    }

    #[test]
    fn test_to_gb_is_monotonic() {
        let samples = [0.0, 1e6, 5e9, 5.004e9, 5.006e9, 1e12, 3.3e13];
        for pair in samples.windows(2) {
            assert!(to_gb(pair[0]) <= to_gb(pair[1]));
        }
    }

    #[test]
    fn test_unit_convert() {
        assert_eq!(Unit::Bytes.convert(1_500_000_000.0), 1_500_000_000.0);
        assert_eq!(Unit::Gigabytes.convert(1_500_000_000.0), 1.5);
        assert_eq!(Unit::from_as_bytes(true), Unit::Bytes);
        assert_eq!(Unit::from_as_bytes(false), Unit::Gigabytes);
    }

    #[test]
    fn test_percent_of() {
        assert_eq!(percent_of(50.0, 100.0, 2), 50.0);
        assert_eq!(percent_of(1.0, 3.0, 2), 33.33);
        assert_eq!(percent_of(1.0, 3.0, 1), 33.3);
        assert_eq!(percent_of(5.0, 0.0, 2), 0.0);
    }
}
