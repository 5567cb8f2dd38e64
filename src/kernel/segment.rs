use super::time::TimePoint;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Server-assigned segment identifier. Unique and monotonically increasing
/// within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentId(pub u64);

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Correlates a client with the authoritative stored timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DbId(pub u64);

impl fmt::Display for DbId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseType {
    Inhalation,
    Exhalation,
    Apnea,
}

impl PhaseType {
    pub fn is_apnea(&self) -> bool {
        matches!(self, PhaseType::Apnea)
    }

    /// Breathing counterpart. Apnea has none and maps to itself.
    pub fn opposite(&self) -> PhaseType {
        match self {
            PhaseType::Inhalation => PhaseType::Exhalation,
            PhaseType::Exhalation => PhaseType::Inhalation,
            PhaseType::Apnea => PhaseType::Apnea,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseType::Inhalation => "inhalation",
            PhaseType::Exhalation => "exhalation",
            PhaseType::Apnea => "apnea",
        }
    }
}

impl fmt::Display for PhaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One labeled phase interval. `start` and `end` are both inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub id: SegmentId,
    pub start: TimePoint,
    pub end: TimePoint,
    #[serde(rename = "type")]
    pub phase: PhaseType,
}

impl Segment {
    pub fn new(id: u64, start: f64, end: f64, phase: PhaseType) -> Self {
        Self {
            id: SegmentId(id),
            start: TimePoint::from_units(start),
            end: TimePoint::from_units(end),
            phase,
        }
    }

    /// Open-interval membership, used for split points.
    pub fn strictly_contains(&self, t: TimePoint) -> bool {
        self.start < t && t < self.end
    }

    pub fn duration(&self) -> TimePoint {
        self.end - self.start
    }
}

/// Derived inhalation+exhalation pairing, computed server-side. Read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cycle {
    pub id: u64,
    pub start: TimePoint,
    pub label: String,
}
