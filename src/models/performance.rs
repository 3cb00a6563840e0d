// Fixed-point percentage with two fractional digits, stored as hundredths.
// Serialized as a JSON number (e.g. 87.25).

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

const SCALE: i64 = 100;

/// Aggregate performance (or any share) in percent, exact to 0.01.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Performance(i64);

impl Performance {
    pub const ZERO: Performance = Performance(0);
    /// 100.00
    pub const MAX: Performance = Performance(100 * SCALE);

    pub const fn from_hundredths(hundredths: i64) -> Self {
        Self(hundredths)
    }

    pub const fn from_whole(percent: i64) -> Self {
        Self(percent * SCALE)
    }

    /// Nearest hundredth; `None` for NaN or infinities.
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        Some(Self((value * SCALE as f64).round() as i64))
    }

    pub const fn hundredths(self) -> i64 {
        self.0
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64 / SCALE as f64
    }

    pub fn is_within_percent_range(self) -> bool {
        (0..=Self::MAX.0).contains(&self.0)
    }

    pub fn clamp_to_percent_range(self) -> Self {
        Self(self.0.clamp(0, Self::MAX.0))
    }

    /// `self - other` in whole percentage points, truncated toward zero.
    pub fn whole_delta(self, other: Performance) -> i64 {
        (self.0 - other.0) / SCALE
    }

    /// `count / total * 100`, rounded half-up to two digits. Zero when `total` is not positive.
    pub fn share(count: u64, total: u64) -> Self {
        if total == 0 {
            return Self::ZERO;
        }
        Self(div_half_up(count as i128 * 100 * SCALE as i128, total as i128))
    }

    /// Percentage change from `previous` to `current`, rounded half-up to two digits.
    /// Zero when `previous` is zero.
    pub fn change_rate(current: u64, previous: u64) -> Self {
        if previous == 0 {
            return Self::ZERO;
        }
        let delta = current as i128 - previous as i128;
        Self(div_half_up(delta * 100 * SCALE as i128, previous as i128))
    }

    /// Arithmetic mean, rounded half-up to two digits. Zero for an empty input.
    pub fn mean(values: impl IntoIterator<Item = Performance>) -> Self {
        let (sum, n) = values
            .into_iter()
            .fold((0i128, 0i128), |(sum, n), p| (sum + p.0 as i128, n + 1));
        if n == 0 {
            return Self::ZERO;
        }
        Self(div_half_up(sum, n))
    }
}

/// `numerator / denominator` rounded half away from zero, saturating at the i64 bounds.
/// `denominator` must be positive.
fn div_half_up(numerator: i128, denominator: i128) -> i64 {
    let magnitude = (2 * numerator.abs() + denominator) / (2 * denominator);
    let rounded = if numerator < 0 { -magnitude } else { magnitude };
    i64::try_from(rounded).unwrap_or(if rounded < 0 { i64::MIN } else { i64::MAX })
}

impl fmt::Display for Performance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(
            f,
            "{}{}.{:02}",
            sign,
            abs / SCALE as u64,
            abs % SCALE as u64
        )
    }
}

impl Serialize for Performance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

impl<'de> Deserialize<'de> for Performance {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Performance::from_f64(value)
            .ok_or_else(|| serde::de::Error::custom("performance must be a finite number"))
    }
}
