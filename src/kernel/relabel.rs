use super::segment::{PhaseType, Segment};

/// Restores inhalation/exhalation alternation from `start_index` onward.
///
/// The first label is seeded from the nearest non-apnea segment before
/// `start_index` (its opposite), or `Inhalation` if there is none. Apnea
/// segments keep their type and do not advance the alternation.
pub fn relabel_from(segments: &mut [Segment], start_index: usize) {
    if start_index >= segments.len() {
        return;
    }

    let mut next = segments[..start_index]
        .iter()
        .rev()
        .find(|s| !s.phase.is_apnea())
        .map(|s| s.phase.opposite())
        .unwrap_or(PhaseType::Inhalation);

    for seg in segments[start_index..].iter_mut() {
        if seg.phase.is_apnea() {
            continue;
        }
        seg.phase = next;
        next = next.opposite();
    }
}

/// True when the non-apnea subsequence never repeats a phase.
pub fn alternates(segments: &[Segment]) -> bool {
    let breathing: Vec<PhaseType> = segments
        .iter()
        .filter(|s| !s.phase.is_apnea())
        .map(|s| s.phase)
        .collect();
    breathing.windows(2).all(|w| w[0] != w[1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::segment::PhaseType::*;

    #[test]
    fn seeds_from_nearest_breathing_phase_behind_apnea() {
        let mut segs = vec![
            Segment::new(1, 0.0, 10.0, Exhalation),
            Segment::new(3, 21.0, 25.0, Apnea),
            Segment::new(4, 26.0, 35.0, Exhalation),
            Segment::new(5, 36.0, 40.0, Exhalation),
        ];
        relabel_from(&mut segs, 1);
        let phases: Vec<_> = segs.iter().map(|s| s.phase).collect();
        assert_eq!(phases, vec![Exhalation, Apnea, Inhalation, Exhalation]);
    }

    #[test]
    fn empty_prefix_starts_at_inhalation() {
        let mut segs = vec![
            Segment::new(1, 0.0, 1.0, Apnea),
            Segment::new(2, 2.0, 3.0, Exhalation),
        ];
        relabel_from(&mut segs, 0);
        assert_eq!(segs[0].phase, Apnea);
        assert_eq!(segs[1].phase, Inhalation);
    }

    #[test]
    fn index_past_end_is_a_no_op() {
        let mut segs = vec![Segment::new(1, 0.0, 1.0, Exhalation)];
        relabel_from(&mut segs, 5);
        assert_eq!(segs[0].phase, Exhalation);
    }
}
