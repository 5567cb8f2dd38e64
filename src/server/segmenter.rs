use crate::kernel::relabel::relabel_from;
use crate::kernel::segment::Segment;
use crate::kernel::time::TimePoint;

/// Produces a segmentation for a recording. Ids in the output are ignored;
/// the timeline assigns fresh ones.
pub trait Segmenter: Send {
    fn segment(&self, duration: TimePoint, apnea_threshold: Option<f64>) -> Vec<Segment>;
}

/// Replays a stored segmentation. With a threshold, non-apnea segments lasting
/// at least that long are reclassified as apnea and the rest realigned.
#[derive(Debug, Clone)]
pub struct FixedSegmentation {
    segments: Vec<Segment>,
}

impl FixedSegmentation {
    pub fn new(mut segments: Vec<Segment>) -> Self {
        segments.sort_by_key(|s| (s.start, s.id));
        Self { segments }
    }
}

impl Segmenter for FixedSegmentation {
    fn segment(&self, duration: TimePoint, apnea_threshold: Option<f64>) -> Vec<Segment> {
        let mut out: Vec<Segment> = self
            .segments
            .iter()
            .filter(|s| s.start <= duration)
            .copied()
            .collect();

        if let Some(threshold) = apnea_threshold {
            let limit = TimePoint::from_units(threshold);
            for seg in out.iter_mut() {
                if !seg.phase.is_apnea() && seg.duration() >= limit {
                    seg.phase = crate::kernel::segment::PhaseType::Apnea;
                }
            }
            relabel_from(&mut out, 0);
        }
        out
    }
}
