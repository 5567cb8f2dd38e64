use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, Sub};

/// Logical step counter of the editor reactor. One tick per `Editor::step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Tick {
    pub frame: u64,
}

impl Tick {
    pub fn new() -> Self {
        Tick { frame: 0 }
    }

    pub fn next(&self) -> Self {
        Tick { frame: self.frame + 1 }
    }

    pub fn since(&self, earlier: Tick) -> u64 {
        self.frame.saturating_sub(earlier.frame)
    }
}

/// Micro-units per server time unit.
pub const MICROS_PER_UNIT: i64 = 1_000_000;

/// Fixed-point instant on the signal timeline.
///
/// The server emits plain JSON numbers (seconds, sometimes fractional, sometimes
/// discrete sample-like units). They are rounded to the nearest micro-unit on the
/// way in so that adjacency checks are integer comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TimePoint(i64);

impl TimePoint {
    pub const ZERO: TimePoint = TimePoint(0);

    pub fn from_micros(micros: i64) -> Self {
        TimePoint(micros)
    }

    pub fn from_units(units: f64) -> Self {
        TimePoint((units * MICROS_PER_UNIT as f64).round() as i64)
    }

    pub fn micros(&self) -> i64 {
        self.0
    }

    pub fn as_units(&self) -> f64 {
        self.0 as f64 / MICROS_PER_UNIT as f64
    }

    pub fn abs_diff(&self, other: TimePoint) -> TimePoint {
        TimePoint(self.0.abs_diff(other.0).min(i64::MAX as u64) as i64)
    }
}

impl Add for TimePoint {
    type Output = TimePoint;
    fn add(self, rhs: TimePoint) -> TimePoint {
        TimePoint(self.0.saturating_add(rhs.0))
    }
}

impl Sub for TimePoint {
    type Output = TimePoint;
    fn sub(self, rhs: TimePoint) -> TimePoint {
        TimePoint(self.0.saturating_sub(rhs.0))
    }
}

impl fmt::Display for TimePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_units())
    }
}

impl Serialize for TimePoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // Whole values go out as integers so `10` stays `10` on the wire
        if self.0 % MICROS_PER_UNIT == 0 {
            serializer.serialize_i64(self.0 / MICROS_PER_UNIT)
        } else {
            serializer.serialize_f64(self.as_units())
        }
    }
}

impl<'de> Deserialize<'de> for TimePoint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let units = f64::deserialize(deserializer)?;
        if !units.is_finite() {
            return Err(serde::de::Error::custom("time value must be finite"));
        }
        Ok(TimePoint::from_units(units))
    }
}

/// Adjacency rule between consecutive segments: `next.start == prev.end + step`,
/// give or take `tolerance`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contiguity {
    pub step: TimePoint,
    pub tolerance: TimePoint,
}

impl Default for Contiguity {
    fn default() -> Self {
        Self {
            step: TimePoint::from_units(1.0),
            tolerance: TimePoint::ZERO,
        }
    }
}

impl Contiguity {
    pub fn new(step: f64, tolerance: f64) -> Self {
        Self {
            step: TimePoint::from_units(step),
            tolerance: TimePoint::from_units(tolerance.abs()),
        }
    }

    pub fn is_adjacent(&self, prev_end: TimePoint, next_start: TimePoint) -> bool {
        next_start.abs_diff(prev_end + self.step) <= self.tolerance
    }
}
