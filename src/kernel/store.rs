use super::segment::{PhaseType, Segment, SegmentId};
use super::time::Contiguity;
use std::collections::HashMap;

/// Ordered segment list for one session. The only writer is `replace_all`,
/// fed from confirmed server responses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentStore {
    segments: Vec<Segment>,
    index: HashMap<SegmentId, usize>,
}

/// Something `check_invariants` found wrong with a list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    DuplicateId(SegmentId),
    InvertedInterval(SegmentId),
    Overlap { first: SegmentId, second: SegmentId },
    RepeatedPhase { first: SegmentId, second: SegmentId, phase: PhaseType },
}

impl SegmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_segments(segments: Vec<Segment>) -> Self {
        let mut store = Self::new();
        store.replace_all(segments);
        store
    }

    /// Atomically swaps the whole list. Input order does not matter; the
    /// stored order is by `start`.
    pub fn replace_all(&mut self, mut segments: Vec<Segment>) {
        segments.sort_by_key(|s| (s.start, s.id));
        self.segments = segments;
        self.rebuild_index();
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        for (i, seg) in self.segments.iter().enumerate() {
            self.index.insert(seg.id, i);
        }
    }

    pub fn find(&self, id: SegmentId) -> Option<&Segment> {
        self.index.get(&id).and_then(|&i| self.segments.get(i))
    }

    pub fn index_of(&self, id: SegmentId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub fn contains(&self, id: SegmentId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn get(&self, index: usize) -> Option<&Segment> {
        self.segments.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter()
    }

    pub fn as_slice(&self) -> &[Segment] {
        &self.segments
    }

    pub fn to_vec(&self) -> Vec<Segment> {
        self.segments.clone()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn max_id(&self) -> Option<SegmentId> {
        self.segments.iter().map(|s| s.id).max()
    }

    /// Diagnostic scan. Gaps are allowed (the server may leave one before the
    /// first inhalation); overlaps and repeated breathing phases are not.
    pub fn check_invariants(&self, contiguity: &Contiguity) -> Vec<InvariantViolation> {
        let mut violations = Vec::new();

        if self.index.len() != self.segments.len() {
            let mut seen = std::collections::HashSet::new();
            for seg in &self.segments {
                if !seen.insert(seg.id) {
                    violations.push(InvariantViolation::DuplicateId(seg.id));
                }
            }
        }

        for seg in &self.segments {
            if seg.end < seg.start {
                violations.push(InvariantViolation::InvertedInterval(seg.id));
            }
        }

        for pair in self.segments.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            // Anything starting before prev.end + step - tolerance overlaps
            if b.start + contiguity.tolerance < a.end + contiguity.step {
                violations.push(InvariantViolation::Overlap { first: a.id, second: b.id });
            }
        }

        let mut previous: Option<&Segment> = None;
        for seg in self.segments.iter().filter(|s| !s.phase.is_apnea()) {
            if let Some(prev) = previous {
                if prev.phase == seg.phase {
                    violations.push(InvariantViolation::RepeatedPhase {
                        first: prev.id,
                        second: seg.id,
                        phase: seg.phase,
                    });
                }
            }
            previous = Some(seg);
        }

        violations
    }
}
